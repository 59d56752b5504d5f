//! DisplayApp: the per-tick orchestration of the display binary.
//!
//! One tick is:
//!
//! 1. rebuild the device if it was lost last tick,
//! 2. update the compositor (tiles, stream edges, input, event server),
//! 3. draw,
//! 4. present.
//!
//! Device loss detected in step 2 or 4 aborts the tick and triggers an
//! immediate rebuild; the tick then reports [`TickResult::Resynced`].  A
//! producer on another accelerator makes the rebuild follow it, so the next
//! tick presents again.

use tracing::debug;
use tilecast_core::Size;

use super::compositor::{Compositor, TickOutcome, UpdateReport};
use super::device_lifecycle::{DeviceLifecycleManager, LifecycleError, LifecycleState};
use crate::infrastructure::graphics::{GraphicsBackend, PresentStatus};

/// Result of one [`DisplayApp::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    Presented(UpdateReport),
    /// The device was rebuilt; nothing was presented.
    Resynced,
}

/// Owns the device lifecycle and the compositor.
pub struct DisplayApp<B: GraphicsBackend> {
    lifecycle: DeviceLifecycleManager<B>,
    compositor: Compositor,
}

impl<B: GraphicsBackend> DisplayApp<B> {
    pub fn new(backend: B, output_size: Size, compositor: Compositor) -> Self {
        let stereo = compositor.stereo();
        Self {
            lifecycle: DeviceLifecycleManager::new(backend, output_size, stereo),
            compositor,
        }
    }

    pub fn lifecycle(&self) -> &DeviceLifecycleManager<B> {
        &self.lifecycle
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// Creates the device and every resource.
    ///
    /// # Errors
    ///
    /// Any bring-up failure; the caller should treat it as fatal.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle.bring_up(&mut self.compositor)
    }

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Only a failed rebuild after device loss is an error.
    pub async fn tick(&mut self) -> Result<TickResult, LifecycleError> {
        if self.lifecycle.state() == LifecycleState::Lost {
            self.lifecycle.reset_device(&mut self.compositor)?;
        }

        let device = self.lifecycle.device_mut()?;
        let report = match self.compositor.update(device).await {
            TickOutcome::Continue(report) => report,
            TickOutcome::DeviceResetRequired { producer } => {
                self.lifecycle.prefer_accelerator(producer);
                return self.resync();
            }
        };

        let device = self.lifecycle.device_mut()?;
        self.compositor.draw(device);

        match self.lifecycle.present()? {
            PresentStatus::Presented => Ok(TickResult::Presented(report)),
            PresentStatus::DeviceLost => self.resync(),
        }
    }

    fn resync(&mut self) -> Result<TickResult, LifecycleError> {
        self.lifecycle.mark_lost();
        self.lifecycle.reset_device(&mut self.compositor)?;
        Ok(TickResult::Resynced)
    }

    /// Resizes the output.  Sizes below 1 clamp to 1.
    ///
    /// # Errors
    ///
    /// A failed rebuild of window (or, after loss, all) resources.
    pub fn resize(&mut self, width: i64, height: i64) -> Result<(), LifecycleError> {
        let size = Size::from_signed(width, height);
        debug!(%size, "resize requested");
        self.lifecycle.resize(&mut self.compositor, size)
    }

    /// Releases all graphics resources, then closes the event server.
    pub async fn shutdown(&mut self) {
        self.lifecycle.shutdown(&mut self.compositor);
        self.compositor.shutdown_server().await;
    }
}
