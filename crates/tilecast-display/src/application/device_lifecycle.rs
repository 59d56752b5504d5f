//! DeviceLifecycleManager: owns the graphics device and everything bound to
//! it.
//!
//! # States
//!
//! ```text
//!  Uninitialized ──create_device──▶ DeviceReady ──resources──▶ ResourcesReady
//!        ▲                                                        │     ▲
//!        │ shutdown                              present / resize │     │ reset_device
//!        │                                        reports loss    ▼     │
//!        └──────────────────────────────────────────────────────  Lost ─┘
//! ```
//!
//! Bring-up runs three groups in order: the device itself, device resources
//! (shaders, fonts, samplers, placeholder textures, video receivers) and
//! window resources (presentation surface and per-eye output attachments).
//! Each group is pushed onto a [`ResourceRegistry`] *before* it is created,
//! so a group that fails half-way is still torn down.  Teardown pops the
//! registry, which always releases newest first.
//!
//! # Device loss
//!
//! Loss is an expected event, not an error.  Whoever notices it (present,
//! surface resize, or a tile whose producer moved to another accelerator)
//! marks the manager [`LifecycleState::Lost`] and stops.  [`reset_device`]
//! then tears everything down and runs the full bring-up again.
//!
//! The device never leaves this struct.  Dependents get it as
//! `&mut dyn GraphicsDevice` for the duration of one call.
//!
//! [`reset_device`]: DeviceLifecycleManager::reset_device

use thiserror::Error;
use tilecast_core::{AcceleratorId, Size};
use tracing::{debug, info, warn};

use super::resources::{ResourceGroup, ResourceRegistry};
use crate::infrastructure::graphics::{
    GraphicsBackend, GraphicsDevice, GraphicsError, PresentStatus, ResourceHandle, SurfaceStatus,
};

/// Something that owns resources bound to the device.
pub trait DeviceDependent {
    /// Creates resources that live as long as the device.
    fn create_device_resources(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GraphicsError>;

    /// Releases everything [`create_device_resources`](Self::create_device_resources)
    /// created.  Must be safe to call when nothing was created.
    fn release_device_resources(&mut self, device: &mut dyn GraphicsDevice);

    /// Creates resources whose size follows the output.
    fn create_window_resources(&mut self, device: &mut dyn GraphicsDevice, size: Size) -> Result<(), GraphicsError>;

    fn release_window_resources(&mut self, device: &mut dyn GraphicsDevice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    DeviceReady,
    ResourcesReady,
    Lost,
}

/// Error type for lifecycle operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("failed to create graphics device: {0}")]
    Device(GraphicsError),

    #[error("failed to create device resources: {0}")]
    Resources(GraphicsError),

    #[error("graphics device is not available (state {0:?})")]
    NotReady(LifecycleState),
}

/// Owns the graphics device and drives bring-up, teardown and recovery.
pub struct DeviceLifecycleManager<B: GraphicsBackend> {
    backend: B,
    device: Option<Box<dyn GraphicsDevice>>,
    surface: Option<ResourceHandle>,
    registry: ResourceRegistry,
    state: LifecycleState,
    output_size: Size,
    stereo: bool,
    resets: u32,
    /// Accelerator the next device should be created on.
    preferred_accelerator: Option<AcceleratorId>,
}

impl<B: GraphicsBackend> DeviceLifecycleManager<B> {
    pub fn new(backend: B, output_size: Size, stereo: bool) -> Self {
        Self {
            backend,
            device: None,
            surface: None,
            registry: ResourceRegistry::new(),
            state: LifecycleState::Uninitialized,
            output_size,
            stereo,
            resets: 0,
            preferred_accelerator: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn output_size(&self) -> Size {
        self.output_size
    }

    pub fn preferred_accelerator(&self) -> Option<AcceleratorId> {
        self.preferred_accelerator
    }

    /// Asks every later device creation to use `accelerator`, e.g. the one a
    /// video producer publishes on.
    pub fn prefer_accelerator(&mut self, accelerator: AcceleratorId) {
        if self.preferred_accelerator != Some(accelerator) {
            info!(%accelerator, "next device will follow the producer's accelerator");
            self.preferred_accelerator = Some(accelerator);
        }
    }

    /// Completed device resets since start-up.
    pub fn reset_count(&self) -> u32 {
        self.resets
    }

    /// The live device.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotReady`] if there is no device.
    pub fn device_mut(&mut self) -> Result<&mut dyn GraphicsDevice, LifecycleError> {
        let state = self.state;
        match self.device.as_deref_mut() {
            Some(device) => Ok(device),
            None => Err(LifecycleError::NotReady(state)),
        }
    }

    // ── Bring-up ──────────────────────────────────────────────────────────────

    /// `Uninitialized → DeviceReady`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Device`] if the backend has no usable device
    /// and [`LifecycleError::NotReady`] if a device already exists.
    pub fn create_device(&mut self) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::NotReady(self.state));
        }
        let device = self
            .backend
            .create_device(self.preferred_accelerator)
            .map_err(LifecycleError::Device)?;
        info!(accelerator = %device.accelerator(), "graphics device created");
        self.device = Some(device);
        self.registry.push(ResourceGroup::Device);
        self.state = LifecycleState::DeviceReady;
        Ok(())
    }

    /// Runs the device-resource pass of `dep`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Resources`] if any creation fails.
    pub fn create_device_resources(&mut self, dep: &mut dyn DeviceDependent) -> Result<(), LifecycleError> {
        let state = self.state;
        let device = self.device.as_deref_mut().ok_or(LifecycleError::NotReady(state))?;
        self.registry.push(ResourceGroup::DeviceResources);
        dep.create_device_resources(device).map_err(LifecycleError::Resources)
    }

    /// Creates the surface if needed, then runs the window-resource pass of
    /// `dep`.  `DeviceReady → ResourcesReady`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Resources`] if any creation fails.
    pub fn create_window_resources(&mut self, dep: &mut dyn DeviceDependent) -> Result<(), LifecycleError> {
        let state = self.state;
        let device = self.device.as_deref_mut().ok_or(LifecycleError::NotReady(state))?;
        self.registry.push(ResourceGroup::WindowResources);
        if self.surface.is_none() {
            let surface = device
                .create_surface(self.output_size, self.stereo)
                .map_err(LifecycleError::Resources)?;
            self.surface = Some(surface);
        }
        dep.create_window_resources(device, self.output_size)
            .map_err(LifecycleError::Resources)?;
        self.state = LifecycleState::ResourcesReady;
        debug!(size = %self.output_size, "window resources ready");
        Ok(())
    }

    /// Full bring-up: device, device resources, window resources.  On
    /// failure everything created so far is released again.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step.
    pub fn bring_up(&mut self, dep: &mut dyn DeviceDependent) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::NotReady(self.state));
        }
        let result = self.run_bring_up(dep);
        if result.is_err() {
            self.teardown(dep);
        }
        result
    }

    fn run_bring_up(&mut self, dep: &mut dyn DeviceDependent) -> Result<(), LifecycleError> {
        self.create_device()?;
        self.create_device_resources(dep)?;
        self.create_window_resources(dep)
    }

    // ── Teardown and recovery ─────────────────────────────────────────────────

    fn teardown(&mut self, dep: &mut dyn DeviceDependent) {
        while let Some(group) = self.registry.pop() {
            debug!("releasing {group}");
            match group {
                ResourceGroup::WindowResources => {
                    if let Some(device) = self.device.as_deref_mut() {
                        dep.release_window_resources(device);
                    }
                }
                ResourceGroup::DeviceResources => {
                    if let Some(device) = self.device.as_deref_mut() {
                        dep.release_device_resources(device);
                    }
                }
                ResourceGroup::Device => {
                    if let (Some(device), Some(surface)) = (self.device.as_deref_mut(), self.surface.take()) {
                        device.release(surface);
                    }
                    self.device = None;
                }
            }
        }
        self.surface = None;
        self.device = None;
        self.state = LifecycleState::Uninitialized;
    }

    /// Records that the device is gone.  Nothing is released until
    /// [`reset_device`](Self::reset_device).
    pub fn mark_lost(&mut self) {
        if self.state != LifecycleState::Uninitialized {
            self.state = LifecycleState::Lost;
        }
    }

    /// Tears everything down and runs the full bring-up again.
    ///
    /// # Errors
    ///
    /// Returns the bring-up error if the rebuild fails; that is fatal.
    pub fn reset_device(&mut self, dep: &mut dyn DeviceDependent) -> Result<(), LifecycleError> {
        warn!("graphics device lost; rebuilding all device resources");
        self.teardown(dep);
        self.resets += 1;
        self.bring_up(dep)?;
        info!(resets = self.resets, "graphics device restored");
        Ok(())
    }

    /// Changes the output size.  Device resources keep their identity; only
    /// window resources are recreated.  If the surface resize loses the
    /// device, the resize completes as part of the full rebuild.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Resources`] if recreation fails.
    pub fn resize(&mut self, dep: &mut dyn DeviceDependent, size: Size) -> Result<(), LifecycleError> {
        self.output_size = size;
        if self.state != LifecycleState::ResourcesReady {
            // Picked up by the next bring-up.
            return Ok(());
        }
        let Some(device) = self.device.as_deref_mut() else {
            return Ok(());
        };

        if self.registry.top() == Some(ResourceGroup::WindowResources) {
            self.registry.pop();
            dep.release_window_resources(device);
        }

        if device.resize_surface(size) == SurfaceStatus::DeviceLost {
            self.state = LifecycleState::Lost;
            return self.reset_device(dep);
        }

        self.registry.push(ResourceGroup::WindowResources);
        dep.create_window_resources(device, size).map_err(LifecycleError::Resources)?;
        debug!(%size, "output resized");
        Ok(())
    }

    /// Presents the frame.  A lost device moves the manager to
    /// [`LifecycleState::Lost`].
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotReady`] if there is no device.
    pub fn present(&mut self) -> Result<PresentStatus, LifecycleError> {
        let state = self.state;
        let device = self.device.as_deref_mut().ok_or(LifecycleError::NotReady(state))?;
        let status = device.present();
        if status == PresentStatus::DeviceLost {
            warn!("device lost during present");
            self.state = LifecycleState::Lost;
        }
        Ok(status)
    }

    /// Releases window resources, device resources and the device.  Safe to
    /// call any number of times.
    pub fn shutdown(&mut self, dep: &mut dyn DeviceDependent) {
        if self.registry.is_empty() && self.device.is_none() {
            return;
        }
        self.teardown(dep);
        info!("graphics device released");
    }
}
