//! Compositor: the window-level owner of tiles, outputs and input.
//!
//! The compositor ties the per-tick work together:
//!
//! - it updates every [`Tile`] and watches the aggregate "any tile
//!   receiving" flag.  The rising edge restores the window and hides the
//!   placeholders; the falling edge minimizes it and shows them again;
//! - it samples the window's keyboard and mouse once and feeds the
//!   [`InputPoller`];
//! - it hands the resulting events to the [`EventServer`];
//! - it draws the tiles into one (mono) or two (stereo) output attachments.
//!
//! It is a [`DeviceDependent`]: the [`DeviceLifecycleManager`] creates and
//! releases its resources, and through it the resources of every tile.
//!
//! [`DeviceLifecycleManager`]: super::device_lifecycle::DeviceLifecycleManager

use tilecast_core::{AcceleratorId, Edge, EdgeDetector, Eye, Key, Size};
use tracing::{debug, info, warn};

use super::device_lifecycle::DeviceDependent;
use super::poll_input::InputPoller;
use super::resources::ResourceSet;
use super::tile::{DrawContext, Tile, TileUpdate};
use crate::infrastructure::graphics::{Color, GraphicsDevice, GraphicsError, ResourceHandle};
use crate::infrastructure::network::{EventServer, ServerTick};
use crate::infrastructure::storage::DisplaySettings;
use crate::infrastructure::video::VideoSourceFactory;
use crate::infrastructure::window::WindowHost;

const VERTEX_SHADER: &str = "fullscreen_quad";
const PIXEL_SHADER: &str = "textured";
const LABEL_FONT: &str = "label";
const LABEL_FONT_SIZE: f32 = 32.0;

/// Result of [`Compositor::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Continue(UpdateReport),
    /// A tile saw a producer on another accelerator.  The rest of the tick
    /// was skipped; the device should be rebuilt on `producer`.
    DeviceResetRequired { producer: AcceleratorId },
}

/// What happened during one successful update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Edge of the aggregate receiving flag, if it changed.
    pub stream: Option<Edge>,
    /// Input events produced this tick.
    pub input_events: usize,
    pub minimize_hotkey: bool,
    pub server: ServerTick,
}

#[derive(Debug, Clone, Copy)]
struct SharedPrimitives {
    vertex_shader: ResourceHandle,
    pixel_shader: ResourceHandle,
    font: ResourceHandle,
    text_batch: ResourceHandle,
}

/// Owner of the tiles, the output attachments and the input pipeline.
pub struct Compositor {
    tiles: Vec<Tile>,
    stereo: bool,
    window: Box<dyn WindowHost>,
    video: Box<dyn VideoSourceFactory>,
    input: InputPoller,
    server: EventServer,
    receiving: EdgeDetector,
    minimize_key: Key,
    minimize_edge: EdgeDetector,
    shared: ResourceSet,
    primitives: Option<SharedPrimitives>,
    outputs: [Option<ResourceHandle>; 2],
    window_resources: ResourceSet,
}

impl Compositor {
    pub fn new(
        settings: &DisplaySettings,
        window: Box<dyn WindowHost>,
        video: Box<dyn VideoSourceFactory>,
        server: EventServer,
    ) -> Self {
        let tiles = settings.tiles.iter().cloned().map(Tile::new).collect::<Vec<_>>();
        info!(
            tiles = tiles.len(),
            stereo = settings.stereo,
            "compositor configured"
        );
        Self {
            tiles,
            stereo: settings.stereo,
            window,
            video,
            input: InputPoller::new(),
            server,
            receiving: EdgeDetector::new(),
            minimize_key: settings.minimize_key,
            minimize_edge: EdgeDetector::new(),
            shared: ResourceSet::new(),
            primitives: None,
            outputs: [None; 2],
            window_resources: ResourceSet::new(),
        }
    }

    pub fn stereo(&self) -> bool {
        self.stereo
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, name: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.name() == name)
    }

    /// Output attachment of `eye`, while window resources exist.
    pub fn output(&self, eye: Eye) -> Option<ResourceHandle> {
        self.outputs[eye.output_index()]
    }

    pub fn server(&self) -> &EventServer {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut EventServer {
        &mut self.server
    }

    /// `true` if any tile has a connected eye.
    pub fn any_tile_receiving(&self) -> bool {
        self.tiles.iter().any(Tile::receiving_any)
    }

    /// Forgets previous input snapshots, e.g. after the window regains focus.
    pub fn reset_input(&mut self) {
        self.input.reset();
        self.minimize_edge.reset();
    }

    // ── Per tick ──────────────────────────────────────────────────────────────

    /// Updates tiles, stream notifications, input and the event server.
    ///
    /// Stops at the first tile that needs a device reset; nothing else runs
    /// in that tick.
    pub async fn update(&mut self, device: &mut dyn GraphicsDevice) -> TickOutcome {
        for tile in &mut self.tiles {
            if let TileUpdate::DeviceResetRequired {
                channel,
                producer,
                device: current,
            } = tile.update(device)
            {
                warn!(
                    tile = tile.name(),
                    %channel,
                    %producer,
                    %current,
                    "producer is on a different accelerator; device reset required"
                );
                return TickOutcome::DeviceResetRequired { producer };
            }
        }

        let receiving = self.any_tile_receiving();
        let stream = self.receiving.update(receiving);
        match stream {
            Some(Edge::Rising) => self.on_stream_opened(),
            Some(Edge::Falling) => self.on_stream_closed(),
            None => {}
        }

        let keyboard = self.window.keyboard_state();
        let mouse = self.window.mouse_state();
        let events = self.input.poll(&keyboard, &mouse);

        let minimize_hotkey =
            self.minimize_edge.update(keyboard.is_pressed(self.minimize_key)) == Some(Edge::Rising);
        if minimize_hotkey {
            info!(key = %self.minimize_key, "minimize hotkey pressed");
            self.window.minimize();
        }

        let server = self.server.tick(&events).await;
        TickOutcome::Continue(UpdateReport {
            stream,
            input_events: events.len(),
            minimize_hotkey,
            server,
        })
    }

    fn on_stream_opened(&mut self) {
        info!("stream opened");
        self.window.restore();
        for tile in &mut self.tiles {
            tile.set_show_placeholder(false);
        }
    }

    fn on_stream_closed(&mut self) {
        info!("stream closed");
        self.window.minimize();
        for tile in &mut self.tiles {
            tile.set_show_placeholder(true);
        }
    }

    /// Clears the outputs (left red, right blue) and draws every tile.
    pub fn draw(&self, device: &mut dyn GraphicsDevice) {
        let Some(shared) = self.primitives else {
            return;
        };
        if let Some(left) = self.outputs[0] {
            device.clear(left, Color::RED);
        }
        if self.stereo {
            if let Some(right) = self.outputs[1] {
                device.clear(right, Color::BLUE);
            }
        }

        let ctx = DrawContext {
            outputs: self.outputs,
            vertex_shader: shared.vertex_shader,
            pixel_shader: shared.pixel_shader,
            font: shared.font,
            text_batch: shared.text_batch,
        };
        for tile in &self.tiles {
            tile.draw(device, &ctx);
        }
    }

    /// Closes every event client and the listener.
    pub async fn shutdown_server(&mut self) {
        self.server.shutdown().await;
    }
}

impl DeviceDependent for Compositor {
    fn create_device_resources(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GraphicsError> {
        let vertex_shader = self.shared.track(device.create_vertex_shader(VERTEX_SHADER)?);
        let pixel_shader = self.shared.track(device.create_pixel_shader(PIXEL_SHADER)?);
        let font = self.shared.track(device.create_font(LABEL_FONT, LABEL_FONT_SIZE)?);
        let text_batch = self.shared.track(device.create_text_batch()?);
        self.primitives = Some(SharedPrimitives {
            vertex_shader,
            pixel_shader,
            font,
            text_batch,
        });

        for tile in &mut self.tiles {
            tile.create_device_resources(device, self.video.as_ref())?;
        }
        debug!(tiles = self.tiles.len(), "device resources created");
        Ok(())
    }

    fn release_device_resources(&mut self, device: &mut dyn GraphicsDevice) {
        for tile in self.tiles.iter_mut().rev() {
            tile.release_device_resources(device);
        }
        self.primitives = None;
        self.shared.release_all(device);
    }

    fn create_window_resources(&mut self, device: &mut dyn GraphicsDevice, size: Size) -> Result<(), GraphicsError> {
        for &eye in Eye::for_window(self.stereo) {
            let output = self.window_resources.track(device.create_output_attachment(eye, size)?);
            self.outputs[eye.output_index()] = Some(output);
        }
        Ok(())
    }

    fn release_window_resources(&mut self, device: &mut dyn GraphicsDevice) {
        self.outputs = [None; 2];
        self.window_resources.release_all(device);
    }
}
