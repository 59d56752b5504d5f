//! Graphics device capability.
//!
//! The compositor never talks to a concrete graphics API.  It sees a
//! [`GraphicsBackend`] that can produce a [`GraphicsDevice`], and the device
//! hands out opaque [`ResourceHandle`]s for everything it creates.  The
//! device reports loss through [`PresentStatus`] and [`SurfaceStatus`] values
//! rather than errors, because losing the device is an expected event that
//! the lifecycle manager recovers from.
//!
//! # Testability
//!
//! [`headless::HeadlessBackend`] implements the traits in memory, records
//! every draw call, tracks live resources, and can inject device loss or
//! creation failures on demand.

use std::fmt;

use thiserror::Error;
use tilecast_core::{AcceleratorId, Eye, PixelFormat, Rect, Size};

pub mod headless;

// ── Handles ───────────────────────────────────────────────────────────────────

/// What a [`ResourceHandle`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Sampler,
    VertexShader,
    PixelShader,
    Font,
    TextBatch,
    FrameView,
    Surface,
    OutputAttachment,
}

/// Opaque reference to a device-owned resource.
///
/// Handles are only meaningful for the device that created them and only
/// until they are passed to [`GraphicsDevice::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: u64,
    kind: ResourceKind,
}

impl ResourceHandle {
    pub fn new(id: u64, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.id)
    }
}

// ── Descriptors ───────────────────────────────────────────────────────────────

/// Linear RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }
}

/// Immutable texture description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub size: Size,
    pub format: PixelFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Point,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Clamp,
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address: AddressMode,
    pub border: Color,
}

impl SamplerDesc {
    /// Nearest-texel sampling with a white border outside `[0, 1]`.
    pub fn point_white_border() -> Self {
        Self {
            filter: Filter::Point,
            address: AddressMode::Border,
            border: Color::WHITE,
        }
    }
}

/// A textured fullscreen quad drawn into the current viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadDraw {
    pub target: ResourceHandle,
    pub texture: ResourceHandle,
    pub sampler: ResourceHandle,
    pub vertex_shader: ResourceHandle,
    pub pixel_shader: ResourceHandle,
}

/// A run of text drawn with the top-left corner at `(x, y)` in viewport
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDraw<'a> {
    pub target: ResourceHandle,
    pub font: ResourceHandle,
    pub batch: ResourceHandle,
    pub text: &'a str,
    pub x: f32,
    pub y: f32,
    pub color: Color,
}

// ── Status values ─────────────────────────────────────────────────────────────

/// Result of presenting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    /// The device was removed or reset; every resource is now invalid.
    DeviceLost,
}

/// Result of resizing the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Resized,
    /// The device was removed or reset during the resize.
    DeviceLost,
}

/// Error type for device acquisition and resource creation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphicsError {
    #[error("no compatible graphics device: {0}")]
    NoCompatibleDevice(String),

    #[error("failed to create {what:?}: {reason}")]
    ResourceCreation { what: ResourceKind, reason: String },
}

// ── Capability traits ─────────────────────────────────────────────────────────

/// Produces graphics devices.  Called once at start-up and again after every
/// device loss.
pub trait GraphicsBackend {
    /// Creates a device on `preferred` when given (the accelerator a video
    /// producer was seen on), otherwise on the backend's default.
    fn create_device(&mut self, preferred: Option<AcceleratorId>) -> Result<Box<dyn GraphicsDevice>, GraphicsError>;
}

/// A live graphics device and its immediate context.
pub trait GraphicsDevice {
    /// The physical processor this device runs on.
    fn accelerator(&self) -> AcceleratorId;

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> Result<ResourceHandle, GraphicsError>;
    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<ResourceHandle, GraphicsError>;
    fn create_vertex_shader(&mut self, name: &str) -> Result<ResourceHandle, GraphicsError>;
    fn create_pixel_shader(&mut self, name: &str) -> Result<ResourceHandle, GraphicsError>;
    fn create_font(&mut self, name: &str, size: f32) -> Result<ResourceHandle, GraphicsError>;
    fn create_text_batch(&mut self) -> Result<ResourceHandle, GraphicsError>;

    /// Wraps a shared frame published by a video producer in a view the
    /// pixel shader can sample.
    fn create_frame_view(&mut self, shared_handle: u64, format: PixelFormat) -> Result<ResourceHandle, GraphicsError>;

    fn create_surface(&mut self, size: Size, stereo: bool) -> Result<ResourceHandle, GraphicsError>;
    fn resize_surface(&mut self, size: Size) -> SurfaceStatus;
    fn create_output_attachment(&mut self, eye: Eye, size: Size) -> Result<ResourceHandle, GraphicsError>;

    /// Releases a resource.  Releasing an unknown handle is a no-op.
    fn release(&mut self, handle: ResourceHandle);

    fn clear(&mut self, target: ResourceHandle, color: Color);
    fn set_viewport(&mut self, viewport: Rect);
    fn draw_quad(&mut self, quad: &QuadDraw);
    /// Returns `(width, height)` of `text` in pixels.
    fn measure_text(&self, font: ResourceHandle, text: &str) -> (f32, f32);
    fn draw_text(&mut self, text: &TextDraw<'_>);

    fn present(&mut self) -> PresentStatus;
}
