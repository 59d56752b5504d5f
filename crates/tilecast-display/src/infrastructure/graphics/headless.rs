//! In-memory graphics backend.
//!
//! `HeadlessBackend` creates [`HeadlessDevice`]s that keep a ledger of every
//! live resource and every draw command instead of touching a GPU.  The
//! display binary runs on it when no hardware backend is linked, and the
//! tests use the attached [`HeadlessInspector`] to see what was drawn and
//! to inject faults:
//!
//! - device loss on the next present or surface resize,
//! - failure of the next creation of a given resource kind,
//! - failure of device creation itself,
//! - a change of the accelerator new devices are created on.
//!
//! Releasing a handle twice, or drawing with a released handle, is counted so
//! tests can assert that teardown and rebuild never double-free or use stale
//! resources.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tilecast_core::{AcceleratorId, Eye, PixelFormat, Rect, Size};
use tracing::debug;

use super::{
    Color, GraphicsBackend, GraphicsDevice, GraphicsError, PresentStatus, QuadDraw, ResourceHandle,
    ResourceKind, SamplerDesc, SurfaceStatus, TextDraw, TextureDesc,
};

/// Glyph advance as a fraction of the font size.
const GLYPH_ADVANCE: f32 = 0.6;

/// One recorded draw-side call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear { target: ResourceHandle, color: Color },
    Viewport(Rect),
    Quad { target: ResourceHandle, texture: ResourceHandle },
    Text { target: ResourceHandle, text: String, x: f32, y: f32 },
}

#[derive(Debug, Clone)]
struct LiveResource {
    kind: ResourceKind,
    size: Option<Size>,
    font_size: Option<f32>,
}

#[derive(Debug)]
struct HeadlessState {
    accelerator: AcceleratorId,
    next_id: u64,
    devices_created: u32,
    live: BTreeMap<u64, LiveResource>,
    created_total: u64,
    double_releases: u64,
    stale_uses: u64,
    commands: Vec<DrawCommand>,
    presents: u64,
    lose_on_present: bool,
    lose_on_resize: bool,
    fail_kinds: HashMap<ResourceKind, String>,
    fail_device: Option<String>,
}

impl HeadlessState {
    fn new(accelerator: AcceleratorId) -> Self {
        Self {
            accelerator,
            next_id: 1,
            devices_created: 0,
            live: BTreeMap::new(),
            created_total: 0,
            double_releases: 0,
            stale_uses: 0,
            commands: Vec::new(),
            presents: 0,
            lose_on_present: false,
            lose_on_resize: false,
            fail_kinds: HashMap::new(),
            fail_device: None,
        }
    }

    fn create(&mut self, kind: ResourceKind, size: Option<Size>) -> Result<ResourceHandle, GraphicsError> {
        if let Some(reason) = self.fail_kinds.remove(&kind) {
            return Err(GraphicsError::ResourceCreation { what: kind, reason });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.created_total += 1;
        self.live.insert(
            id,
            LiveResource {
                kind,
                size,
                font_size: None,
            },
        );
        Ok(ResourceHandle::new(id, kind))
    }

    fn check_live(&mut self, handle: ResourceHandle) {
        if !self.live.contains_key(&handle.id()) {
            self.stale_uses += 1;
        }
    }
}

fn lock(state: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Backend ───────────────────────────────────────────────────────────────────

/// Creates [`HeadlessDevice`]s sharing one resource ledger.
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessBackend {
    /// Creates a backend whose devices run on `accelerator`.
    pub fn new(accelerator: AcceleratorId) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState::new(accelerator))),
        }
    }

    /// Returns a handle for inspecting the ledger and injecting faults.
    pub fn inspector(&self) -> HeadlessInspector {
        HeadlessInspector {
            state: Arc::clone(&self.state),
        }
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_device(&mut self, preferred: Option<AcceleratorId>) -> Result<Box<dyn GraphicsDevice>, GraphicsError> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.fail_device.take() {
            return Err(GraphicsError::NoCompatibleDevice(reason));
        }
        state.devices_created += 1;
        let accelerator = preferred.unwrap_or(state.accelerator);
        debug!(%accelerator, generation = state.devices_created, "headless device created");
        Ok(Box::new(HeadlessDevice {
            state: Arc::clone(&self.state),
            accelerator,
        }))
    }
}

// ── Device ────────────────────────────────────────────────────────────────────

/// In-memory [`GraphicsDevice`].
pub struct HeadlessDevice {
    state: Arc<Mutex<HeadlessState>>,
    accelerator: AcceleratorId,
}

impl GraphicsDevice for HeadlessDevice {
    fn accelerator(&self) -> AcceleratorId {
        self.accelerator
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<ResourceHandle, GraphicsError> {
        let expected = desc.size.area() * desc.format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(GraphicsError::ResourceCreation {
                what: ResourceKind::Texture,
                reason: format!("expected {expected} bytes of pixel data, got {}", pixels.len()),
            });
        }
        lock(&self.state).create(ResourceKind::Texture, Some(desc.size))
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::Sampler, None)
    }

    fn create_vertex_shader(&mut self, _name: &str) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::VertexShader, None)
    }

    fn create_pixel_shader(&mut self, _name: &str) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::PixelShader, None)
    }

    fn create_font(&mut self, _name: &str, size: f32) -> Result<ResourceHandle, GraphicsError> {
        let mut state = lock(&self.state);
        let handle = state.create(ResourceKind::Font, None)?;
        if let Some(entry) = state.live.get_mut(&handle.id()) {
            entry.font_size = Some(size);
        }
        Ok(handle)
    }

    fn create_text_batch(&mut self) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::TextBatch, None)
    }

    fn create_frame_view(&mut self, _shared_handle: u64, _format: PixelFormat) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::FrameView, None)
    }

    fn create_surface(&mut self, size: Size, _stereo: bool) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::Surface, Some(size))
    }

    fn resize_surface(&mut self, size: Size) -> SurfaceStatus {
        let mut state = lock(&self.state);
        if std::mem::take(&mut state.lose_on_resize) {
            return SurfaceStatus::DeviceLost;
        }
        for entry in state.live.values_mut() {
            if entry.kind == ResourceKind::Surface {
                entry.size = Some(size);
            }
        }
        SurfaceStatus::Resized
    }

    fn create_output_attachment(&mut self, _eye: Eye, size: Size) -> Result<ResourceHandle, GraphicsError> {
        lock(&self.state).create(ResourceKind::OutputAttachment, Some(size))
    }

    fn release(&mut self, handle: ResourceHandle) {
        let mut state = lock(&self.state);
        if state.live.remove(&handle.id()).is_none() {
            state.double_releases += 1;
        }
    }

    fn clear(&mut self, target: ResourceHandle, color: Color) {
        let mut state = lock(&self.state);
        state.check_live(target);
        state.commands.push(DrawCommand::Clear { target, color });
    }

    fn set_viewport(&mut self, viewport: Rect) {
        lock(&self.state).commands.push(DrawCommand::Viewport(viewport));
    }

    fn draw_quad(&mut self, quad: &QuadDraw) {
        let mut state = lock(&self.state);
        for handle in [quad.target, quad.texture, quad.sampler, quad.vertex_shader, quad.pixel_shader] {
            state.check_live(handle);
        }
        state.commands.push(DrawCommand::Quad {
            target: quad.target,
            texture: quad.texture,
        });
    }

    fn measure_text(&self, font: ResourceHandle, text: &str) -> (f32, f32) {
        let state = lock(&self.state);
        let size = state
            .live
            .get(&font.id())
            .and_then(|r| r.font_size)
            .unwrap_or(0.0);
        (GLYPH_ADVANCE * size * text.chars().count() as f32, size)
    }

    fn draw_text(&mut self, text: &TextDraw<'_>) {
        let mut state = lock(&self.state);
        for handle in [text.target, text.font, text.batch] {
            state.check_live(handle);
        }
        state.commands.push(DrawCommand::Text {
            target: text.target,
            text: text.text.to_string(),
            x: text.x,
            y: text.y,
        });
    }

    fn present(&mut self) -> PresentStatus {
        let mut state = lock(&self.state);
        if std::mem::take(&mut state.lose_on_present) {
            return PresentStatus::DeviceLost;
        }
        state.presents += 1;
        PresentStatus::Presented
    }
}

// ── Inspector ─────────────────────────────────────────────────────────────────

/// Inspection and fault-injection handle shared with a [`HeadlessBackend`].
#[derive(Clone)]
pub struct HeadlessInspector {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessInspector {
    /// Number of devices the backend has created so far.
    pub fn devices_created(&self) -> u32 {
        lock(&self.state).devices_created
    }

    pub fn live_count(&self) -> usize {
        lock(&self.state).live.len()
    }

    /// Live handles of one kind, in creation order.
    pub fn live_of_kind(&self, kind: ResourceKind) -> Vec<ResourceHandle> {
        lock(&self.state)
            .live
            .iter()
            .filter(|(_, r)| r.kind == kind)
            .map(|(id, r)| ResourceHandle::new(*id, r.kind))
            .collect()
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        lock(&self.state).live.contains_key(&handle.id())
    }

    /// Size recorded for a live texture, surface or output attachment.
    pub fn size_of(&self, handle: ResourceHandle) -> Option<Size> {
        lock(&self.state).live.get(&handle.id()).and_then(|r| r.size)
    }

    pub fn created_total(&self) -> u64 {
        lock(&self.state).created_total
    }

    /// Releases of handles that were not live.
    pub fn double_releases(&self) -> u64 {
        lock(&self.state).double_releases
    }

    /// Draw calls that referenced a handle that was not live.
    pub fn stale_uses(&self) -> u64 {
        lock(&self.state).stale_uses
    }

    pub fn presents(&self) -> u64 {
        lock(&self.state).presents
    }

    /// Removes and returns every recorded draw command.
    pub fn take_commands(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut lock(&self.state).commands)
    }

    /// The next present reports [`PresentStatus::DeviceLost`].
    pub fn lose_device_on_next_present(&self) {
        lock(&self.state).lose_on_present = true;
    }

    /// The next surface resize reports [`SurfaceStatus::DeviceLost`].
    pub fn lose_device_on_next_resize(&self) {
        lock(&self.state).lose_on_resize = true;
    }

    /// The next creation of `kind` fails with `reason`.
    pub fn fail_next_creation(&self, kind: ResourceKind, reason: &str) {
        lock(&self.state).fail_kinds.insert(kind, reason.to_string());
    }

    /// The next device creation fails with `reason`.
    pub fn fail_next_device(&self, reason: &str) {
        lock(&self.state).fail_device = Some(reason.to_string());
    }

    /// Devices created from now on without a preference run on
    /// `accelerator`.
    pub fn set_accelerator(&self, accelerator: AcceleratorId) {
        lock(&self.state).accelerator = accelerator;
    }
}
