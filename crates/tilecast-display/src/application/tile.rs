//! Tile: one screen region showing a mono or stereo video channel.
//!
//! Each eye of a tile is either `Disconnected` (no producer; the placeholder
//! gradient and channel name are shown unless suppressed) or `Connected` to
//! a frame view built from the producer's latest frame.
//!
//! Per tick, [`Tile::update`] polls every source in eye order:
//!
//! | Poll result                     | Effect                                   |
//! |---------------------------------|------------------------------------------|
//! | frame on another accelerator    | stop, ask for a device reset             |
//! | frame, eye was disconnected     | build view, eye becomes Connected        |
//! | new frame, eye connected        | rebuild view                             |
//! | same frame, eye connected       | nothing                                  |
//! | no frame                        | release view, eye becomes Disconnected   |

use tilecast_core::{AcceleratorId, Eye, PixelFormat, Rect, Size};
use tracing::{debug, info, warn};

use super::resources::ResourceSet;
use crate::infrastructure::graphics::{
    Color, GraphicsDevice, GraphicsError, QuadDraw, ResourceHandle, SamplerDesc, TextDraw, TextureDesc,
};
use crate::infrastructure::storage::TileSettings;
use crate::infrastructure::video::{VideoSource, VideoSourceFactory};

/// Vertical distance between the left and right labels, in text heights.
const RIGHT_LABEL_OFFSET: f32 = 1.5;

/// Connection state of one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeState {
    Disconnected,
    Connected { view: ResourceHandle, format: PixelFormat },
}

/// Result of [`Tile::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileUpdate {
    Ok,
    /// A producer renders on a different accelerator than the device.
    DeviceResetRequired {
        channel: String,
        producer: AcceleratorId,
        device: AcceleratorId,
    },
}

/// Shared primitives the compositor lends to tiles while drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawContext {
    /// Output attachments indexed by [`Eye::output_index`].
    pub outputs: [Option<ResourceHandle>; 2],
    pub vertex_shader: ResourceHandle,
    pub pixel_shader: ResourceHandle,
    pub font: ResourceHandle,
    pub text_batch: ResourceHandle,
}

impl DrawContext {
    pub fn target(&self, eye: Eye) -> Option<ResourceHandle> {
        self.outputs[eye.output_index()]
    }
}

struct EyeChannel {
    eye: Eye,
    channel: String,
    source: Option<Box<dyn VideoSource>>,
    state: EyeState,
    placeholder: Option<ResourceHandle>,
    last_format: Option<PixelFormat>,
    last_accelerator: Option<AcceleratorId>,
}

impl EyeChannel {
    fn release_view(&mut self, device: &mut dyn GraphicsDevice) -> bool {
        match std::mem::replace(&mut self.state, EyeState::Disconnected) {
            EyeState::Connected { view, .. } => {
                device.release(view);
                true
            }
            EyeState::Disconnected => false,
        }
    }
}

/// One screen region and its video sources.
pub struct Tile {
    settings: TileSettings,
    eyes: Vec<EyeChannel>,
    sampler: Option<ResourceHandle>,
    resources: ResourceSet,
    show_placeholder: bool,
}

impl Tile {
    pub fn new(settings: TileSettings) -> Self {
        let eyes = settings
            .channels
            .iter()
            .map(|c| EyeChannel {
                eye: c.eye,
                channel: c.channel.clone(),
                source: None,
                state: EyeState::Disconnected,
                placeholder: None,
                last_format: None,
                last_accelerator: None,
            })
            .collect();
        Self {
            settings,
            eyes,
            sampler: None,
            resources: ResourceSet::new(),
            show_placeholder: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn viewport(&self) -> Rect {
        self.settings.viewport
    }

    /// Channel names in eye order.
    pub fn channels(&self) -> Vec<&str> {
        self.eyes.iter().map(|e| e.channel.as_str()).collect()
    }

    pub fn eye_state(&self, eye: Eye) -> Option<EyeState> {
        self.eyes.iter().find(|e| e.eye == eye).map(|e| e.state)
    }

    /// Placeholder texture of `eye`, while device resources exist.
    pub fn placeholder(&self, eye: Eye) -> Option<ResourceHandle> {
        self.eyes.iter().find(|e| e.eye == eye).and_then(|e| e.placeholder)
    }

    /// Format and accelerator of the last frame `eye` received.
    pub fn last_frame_info(&self, eye: Eye) -> Option<(PixelFormat, AcceleratorId)> {
        let e = self.eyes.iter().find(|e| e.eye == eye)?;
        e.last_format.zip(e.last_accelerator)
    }

    pub fn sampler(&self) -> Option<ResourceHandle> {
        self.sampler
    }

    /// `true` if any eye is connected to a producer.
    pub fn receiving_any(&self) -> bool {
        self.eyes
            .iter()
            .any(|e| matches!(e.state, EyeState::Connected { .. }))
    }

    pub fn show_placeholder(&self) -> bool {
        self.show_placeholder
    }

    pub fn set_show_placeholder(&mut self, show: bool) {
        self.show_placeholder = show;
    }

    // ── Device resources ──────────────────────────────────────────────────────

    /// Opens and connects the video sources, then creates the sampler and
    /// one placeholder texture per eye.
    ///
    /// A source that fails to connect is kept; it simply polls nothing.
    ///
    /// # Errors
    ///
    /// Returns the first [`GraphicsError`] from resource creation.
    pub fn create_device_resources(
        &mut self,
        device: &mut dyn GraphicsDevice,
        video: &dyn VideoSourceFactory,
    ) -> Result<(), GraphicsError> {
        let accelerator = device.accelerator();
        for eye in &mut self.eyes {
            let mut source = video.open(&eye.channel, eye.eye);
            if let Err(e) = source.connect(accelerator) {
                warn!(tile = %self.settings.name, "{e}");
            }
            eye.source = Some(source);
        }

        self.sampler = Some(
            self.resources
                .track(device.create_sampler(&SamplerDesc::point_white_border())?),
        );

        let size = self.settings.viewport.size();
        for eye in &mut self.eyes {
            let desc = TextureDesc {
                size,
                format: PixelFormat::Rgba8Unorm,
            };
            let texture = device.create_texture(&desc, &placeholder_pixels(eye.eye, size))?;
            eye.placeholder = Some(self.resources.track(texture));
        }
        debug!(tile = %self.settings.name, %size, "tile device resources created");
        Ok(())
    }

    /// Disconnects every source and releases every view, placeholder and the
    /// sampler.  Every eye ends up Disconnected.
    pub fn release_device_resources(&mut self, device: &mut dyn GraphicsDevice) {
        for eye in &mut self.eyes {
            if let Some(mut source) = eye.source.take() {
                source.disconnect();
            }
            eye.release_view(device);
            eye.placeholder = None;
        }
        self.sampler = None;
        self.resources.release_all(device);
    }

    // ── Per tick ──────────────────────────────────────────────────────────────

    /// Polls every source once, in eye order.
    pub fn update(&mut self, device: &mut dyn GraphicsDevice) -> TileUpdate {
        let device_accelerator = device.accelerator();
        for eye in &mut self.eyes {
            let Some(source) = eye.source.as_mut() else {
                continue;
            };

            let Some(frame) = source.poll() else {
                if eye.release_view(device) {
                    info!(tile = %self.settings.name, channel = %eye.channel, "producer gone");
                }
                continue;
            };

            if frame.accelerator != device_accelerator {
                return TileUpdate::DeviceResetRequired {
                    channel: eye.channel.clone(),
                    producer: frame.accelerator,
                    device: device_accelerator,
                };
            }

            eye.last_format = Some(frame.format);
            eye.last_accelerator = Some(frame.accelerator);

            let was_disconnected = eye.state == EyeState::Disconnected;
            if !(frame.is_new || was_disconnected) {
                continue;
            }

            eye.release_view(device);
            match device.create_frame_view(frame.shared_handle, frame.format) {
                Ok(view) => {
                    eye.state = EyeState::Connected {
                        view,
                        format: frame.format,
                    };
                    if was_disconnected {
                        info!(tile = %self.settings.name, channel = %eye.channel, format = ?frame.format, "receiving");
                    }
                }
                Err(e) => warn!(tile = %self.settings.name, channel = %eye.channel, "{e}"),
            }
        }
        TileUpdate::Ok
    }

    /// Draws each eye into its output: the frame if connected, otherwise the
    /// placeholder and channel name unless suppressed.
    pub fn draw(&self, device: &mut dyn GraphicsDevice, ctx: &DrawContext) {
        let Some(sampler) = self.sampler else {
            return;
        };
        device.set_viewport(self.settings.viewport);

        for eye in &self.eyes {
            let Some(target) = ctx.target(eye.eye) else {
                continue;
            };
            let quad = |texture| QuadDraw {
                target,
                texture,
                sampler,
                vertex_shader: ctx.vertex_shader,
                pixel_shader: ctx.pixel_shader,
            };

            if let EyeState::Connected { view, .. } = eye.state {
                device.draw_quad(&quad(view));
                continue;
            }
            if self.settings.never_show_placeholder || !self.show_placeholder {
                continue;
            }
            if let Some(placeholder) = eye.placeholder {
                device.draw_quad(&quad(placeholder));
            }

            let (_, text_height) = device.measure_text(ctx.font, &eye.channel);
            let y_offset = if eye.eye == Eye::Right {
                RIGHT_LABEL_OFFSET * text_height
            } else {
                0.0
            };
            device.draw_text(&TextDraw {
                target,
                font: ctx.font,
                batch: ctx.text_batch,
                text: &eye.channel,
                x: self.settings.label_x,
                y: self.settings.label_y + y_offset,
                color: Color::WHITE,
            });
        }
    }
}

/// RGBA8 placeholder image for `eye`.
///
/// Pixels run row-major with `a = i / (n - 1)`.  Left and mono fade from
/// gray to red; right fades from blue to gray.
pub fn placeholder_pixels(eye: Eye, size: Size) -> Vec<u8> {
    let n = size.area();
    let denom = n.saturating_sub(1).max(1) as f32;
    let mut pixels = Vec::with_capacity(n * 4);
    for i in 0..n {
        let a = if n == 1 { 0.0 } else { i as f32 / denom };
        let px = match eye {
            Eye::Left | Eye::Mono => [128 + (127.0 * a).round() as u8, 128, 128, 255],
            Eye::Right => [128, 128, 128 + (127.0 * (1.0 - a)).round() as u8, 255],
        };
        pixels.extend_from_slice(&px);
    }
    pixels
}
