//! Flat key/value configuration for the display application.
//!
//! Configuration comes from any number of TOML files given with `-f`, merged
//! in order, and then from `-c KEY=VALUE` overrides.  Keys are flat strings
//! such as `STEREO` or `Main_VIEWPORT_WIDTH`; later sources win.
//!
//! ```toml
//! TILES = ["Main", "Inset"]
//! STEREO = true
//! Main_VIEWPORT_WIDTH = 1920
//! Inset_CHANNEL_LEFT = "InsetCam"
//! ```
//!
//! # Why a flat store? (for beginners)
//!
//! Per-tile keys are built at runtime from the tile names (`<T>_CHANNEL`,
//! `<T>_LABEL_X`, ...), so they cannot be fields of a fixed `serde` struct.
//! [`ConfigStore`] therefore keeps raw [`toml::Value`]s and offers typed
//! getters with defaults.  [`DisplaySettings::from_store`] then reads every
//! key once and produces a plain struct the rest of the program uses.
//!
//! A nested TOML table is accepted too: `[Main]` followed by `CHANNEL = "x"`
//! is the same as `Main_CHANNEL = "x"`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tilecast_core::{Eye, Key, Rect, Size};
use tracing::warn;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `-c` override was not of the form `KEY=VALUE`.
    #[error("malformed override {0:?}: expected KEY=VALUE")]
    MalformedOverride(String),

    /// A value parsed but is not usable for its key.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Flat, string-keyed configuration values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    values: BTreeMap<String, toml::Value>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a TOML file and merges its keys over the current ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML.
    pub fn load_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_str(&content)
    }

    /// Parses TOML text and merges its keys over the current ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML.
    pub fn merge_str(&mut self, content: &str) -> Result<(), ConfigError> {
        let table: toml::Table = content.parse()?;
        self.merge_table("", table);
        Ok(())
    }

    fn merge_table(&mut self, prefix: &str, table: toml::Table) {
        for (key, value) in table {
            let full_key = format!("{prefix}{key}");
            match value {
                toml::Value::Table(nested) => {
                    let nested_prefix = format!("{}_", full_key.trim_end_matches('_'));
                    self.merge_table(&nested_prefix, nested);
                }
                other => {
                    self.values.insert(full_key, other);
                }
            }
        }
    }

    /// Applies one `KEY=VALUE` override.  `VALUE` is read as a TOML value
    /// (`42`, `true`, `"text"`, `[1, 2]`); anything that does not parse is
    /// kept as a bare string.
    pub fn apply_override(&mut self, key: &str, value: &str) {
        let parsed = format!("v = {value}")
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));
        self.values.insert(key.to_string(), parsed);
    }

    pub fn set(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            None => default,
            Some(toml::Value::Integer(v)) => *v,
            Some(toml::Value::String(s)) => s.trim().parse().unwrap_or_else(|_| {
                warn!("config key {key} is not an integer ({s:?}); using {default}");
                default
            }),
            Some(other) => {
                warn!("config key {key} is not an integer ({other}); using {default}");
                default
            }
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            None => default,
            Some(toml::Value::Boolean(v)) => *v,
            Some(toml::Value::Integer(v)) => *v != 0,
            Some(toml::Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => {
                    warn!("config key {key} is not a boolean ({s:?}); using {default}");
                    default
                }
            },
            Some(other) => {
                warn!("config key {key} is not a boolean ({other}); using {default}");
                default
            }
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            None => default.to_string(),
            Some(toml::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Reads a list from a TOML array or a comma-separated string.  Empty
    /// items are skipped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            None => Vec::new(),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(toml::Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(other) => vec![other.to_string()],
        }
    }
}

/// Splits a `-c` argument into key and value at the first `=`.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedOverride`] if there is no `=` or the key
/// is empty.
pub fn split_override(arg: &str) -> Result<(String, String), ConfigError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => Err(ConfigError::MalformedOverride(arg.to_string())),
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

const DEFAULT_WINDOW_WIDTH: i64 = 800;
const DEFAULT_WINDOW_HEIGHT: i64 = 600;
const DEFAULT_VIEWPORT_EXTENT: i64 = 1280;
/// Largest tile width or height; bigger values are rejected, not clamped.
pub const MAX_VIEWPORT_EXTENT: u32 = 16384;
const DEFAULT_EVENT_PORT: i64 = 9030;
const DEFAULT_IO_TIMEOUT_MS: i64 = 500;
const DEFAULT_TICK_INTERVAL_MS: i64 = 16;

/// Event server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventServerSettings {
    pub enabled: bool,
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    pub bind: String,
    pub port: u16,
    /// Upper bound on one client write.
    pub io_timeout_ms: u64,
}

impl Default for EventServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_EVENT_PORT as u16,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS as u64,
        }
    }
}

/// One video channel bound to an eye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSettings {
    pub eye: Eye,
    pub channel: String,
}

/// Per-tile settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileSettings {
    pub name: String,
    pub viewport: Rect,
    /// One entry (mono) or two entries, left then right (stereo).
    pub channels: Vec<ChannelSettings>,
    pub label_x: f32,
    pub label_y: f32,
    pub never_show_placeholder: bool,
}

impl TileSettings {
    /// Reads the settings of tile `name` from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the viewport width or height
    /// exceeds [`MAX_VIEWPORT_EXTENT`].
    pub fn from_store(store: &ConfigStore, name: &str, stereo: bool) -> Result<Self, ConfigError> {
        let prefix = key_prefix(name);
        let key = |suffix: &str| format!("{prefix}{suffix}");

        let viewport = Rect::new(
            clamp_i32(store.get_int(&key("VIEWPORT_X"), 0)),
            clamp_i32(store.get_int(&key("VIEWPORT_Y"), 0)),
            viewport_extent(store, &key("VIEWPORT_WIDTH"))?,
            viewport_extent(store, &key("VIEWPORT_HEIGHT"))?,
        );

        let left_default = format!("{prefix}LeftEye");
        let channels = if stereo {
            vec![
                ChannelSettings {
                    eye: Eye::Left,
                    channel: store.get_string(&key("CHANNEL_LEFT"), &left_default),
                },
                ChannelSettings {
                    eye: Eye::Right,
                    channel: store.get_string(&key("CHANNEL_RIGHT"), &format!("{prefix}RightEye")),
                },
            ]
        } else {
            let channel = if store.contains(&key("CHANNEL")) {
                store.get_string(&key("CHANNEL"), name)
            } else {
                store.get_string(&key("CHANNEL_LEFT"), &left_default)
            };
            vec![ChannelSettings { eye: Eye::Mono, channel }]
        };

        Ok(Self {
            name: name.to_string(),
            viewport,
            channels,
            label_x: store.get_int(&key("LABEL_X"), 0) as f32,
            label_y: store.get_int(&key("LABEL_Y"), 0) as f32,
            never_show_placeholder: store.get_bool(&key("NEVER_SHOW_PLACEHOLDER"), false),
        })
    }
}

/// Everything the display application reads from configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySettings {
    pub tiles: Vec<TileSettings>,
    pub stereo: bool,
    pub window_size: Size,
    pub event_server: EventServerSettings,
    pub minimize_key: Key,
    pub tick_interval_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            tiles: Vec::new(),
            stereo: false,
            window_size: Size::from_signed(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
            event_server: EventServerSettings::default(),
            minimize_key: Key::Slash,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS as u64,
            log_level: "info".to_string(),
        }
    }
}

impl DisplaySettings {
    /// Reads every setting from `store`, applying defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an out-of-range port, an
    /// unknown minimize key name or an oversized tile viewport.
    pub fn from_store(store: &ConfigStore) -> Result<Self, ConfigError> {
        let stereo = store.get_bool("STEREO", false);

        let port = store.get_int("EVENT_SERVER_PORT", DEFAULT_EVENT_PORT);
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidValue {
            key: "EVENT_SERVER_PORT".to_string(),
            reason: format!("{port} is not a valid TCP port"),
        })?;

        let minimize_key = store
            .get_string("MINIMIZE_KEY", Key::Slash.name())
            .parse::<Key>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "MINIMIZE_KEY".to_string(),
                reason: e.to_string(),
            })?;

        let tiles = store
            .get_list("TILES")
            .iter()
            .map(|name| TileSettings::from_store(store, name, stereo))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tiles,
            stereo,
            window_size: Size::from_signed(
                store.get_int("WINDOW_WIDTH", DEFAULT_WINDOW_WIDTH),
                store.get_int("WINDOW_HEIGHT", DEFAULT_WINDOW_HEIGHT),
            ),
            event_server: EventServerSettings {
                enabled: store.get_bool("EVENT_SERVER_ENABLED", true),
                bind: store.get_string("EVENT_SERVER_BIND", "0.0.0.0"),
                port,
                io_timeout_ms: store.get_int("EVENT_SERVER_IO_TIMEOUT_MS", DEFAULT_IO_TIMEOUT_MS).max(1) as u64,
            },
            minimize_key,
            tick_interval_ms: store.get_int("TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS).max(1) as u64,
            log_level: store.get_string("LOG_LEVEL", "info"),
        })
    }
}

/// `"Main"` → `"Main_"`; a name that already ends in `_` is kept as is.
fn key_prefix(name: &str) -> String {
    if name.ends_with('_') {
        name.to_string()
    } else {
        format!("{name}_")
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Viewport width or height at `key`: at least 1, at most
/// [`MAX_VIEWPORT_EXTENT`].
fn viewport_extent(store: &ConfigStore, key: &str) -> Result<u32, ConfigError> {
    let v = store.get_int(key, DEFAULT_VIEWPORT_EXTENT);
    if v > i64::from(MAX_VIEWPORT_EXTENT) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: format!("{v} exceeds the maximum viewport extent of {MAX_VIEWPORT_EXTENT}"),
        });
    }
    Ok(v.max(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(toml: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store.merge_str(toml).expect("valid toml");
        store
    }

    #[test]
    fn test_defaults_when_store_is_empty() {
        // Arrange / Act
        let settings = DisplaySettings::from_store(&ConfigStore::new()).unwrap();

        // Assert
        assert_eq!(settings, DisplaySettings::default());
        assert_eq!(settings.window_size, Size::new(800, 600));
        assert_eq!(settings.event_server.port, 9030);
        assert_eq!(settings.minimize_key, Key::Slash);
    }

    #[test]
    fn test_stereo_tile_gets_default_eye_channels() {
        // Arrange
        let store = store("TILES = [\"Main\"]\nSTEREO = true\n");

        // Act
        let settings = DisplaySettings::from_store(&store).unwrap();

        // Assert
        let tile = &settings.tiles[0];
        assert_eq!(tile.viewport, Rect::new(0, 0, 1280, 1280));
        assert_eq!(
            tile.channels,
            vec![
                ChannelSettings {
                    eye: Eye::Left,
                    channel: "Main_LeftEye".to_string()
                },
                ChannelSettings {
                    eye: Eye::Right,
                    channel: "Main_RightEye".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_mono_channel_prefers_channel_then_left_then_name() {
        let explicit = store("Main_CHANNEL = \"cam\"\nMain_CHANNEL_LEFT = \"left\"\n");
        let left_only = store("Main_CHANNEL_LEFT = \"left\"\n");
        let neither = ConfigStore::new();

        let channel = |s: &ConfigStore| TileSettings::from_store(s, "Main", false).unwrap().channels[0].channel.clone();

        assert_eq!(channel(&explicit), "cam");
        assert_eq!(channel(&left_only), "left");
        assert_eq!(channel(&neither), "Main_LeftEye");
    }

    #[test]
    fn test_trailing_underscore_name_is_not_doubled() {
        let store = store("Cam_VIEWPORT_WIDTH = 640\nCam_LABEL_Y = 12\n");

        let tile = TileSettings::from_store(&store, "Cam_", true).unwrap();

        assert_eq!(tile.viewport.width, 640);
        assert_eq!(tile.label_y, 12.0);
        assert_eq!(tile.channels[0].channel, "Cam_LeftEye");
    }

    #[test]
    fn test_nested_table_flattens_to_prefixed_keys() {
        let store = store("[Main]\nVIEWPORT_X = 100\nNEVER_SHOW_PLACEHOLDER = true\n");

        let tile = TileSettings::from_store(&store, "Main", false).unwrap();

        assert_eq!(tile.viewport.x, 100);
        assert!(tile.never_show_placeholder);
    }

    #[test]
    fn test_override_value_is_typed_or_bare_string() {
        let mut store = ConfigStore::new();

        store.apply_override("STEREO", "true");
        store.apply_override("WINDOW_WIDTH", "1024");
        store.apply_override("TILES", "Main, Inset");
        store.apply_override("LOG_LEVEL", "debug");

        assert!(store.get_bool("STEREO", false));
        assert_eq!(store.get_int("WINDOW_WIDTH", 0), 1024);
        assert_eq!(store.get_list("TILES"), vec!["Main", "Inset"]);
        assert_eq!(store.get_string("LOG_LEVEL", "info"), "debug");
    }

    #[test]
    fn test_later_sources_override_earlier_ones() {
        let mut store = store("EVENT_SERVER_PORT = 9100\n");
        store.merge_str("EVENT_SERVER_PORT = 9200\n").unwrap();
        store.apply_override("EVENT_SERVER_PORT", "9300");

        assert_eq!(store.get_int("EVENT_SERVER_PORT", 0), 9300);
    }

    #[test]
    fn test_split_override_requires_equals_and_key() {
        assert_eq!(
            split_override("STEREO=true").unwrap(),
            ("STEREO".to_string(), "true".to_string())
        );
        assert_eq!(
            split_override("TILES=a=b").unwrap(),
            ("TILES".to_string(), "a=b".to_string())
        );
        assert!(matches!(split_override("STEREO"), Err(ConfigError::MalformedOverride(_))));
        assert!(matches!(split_override("=1"), Err(ConfigError::MalformedOverride(_))));
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let store = store("WINDOW_WIDTH = \"wide\"\nSTEREO = 3.5\n");

        assert_eq!(store.get_int("WINDOW_WIDTH", 800), 800);
        assert!(!store.get_bool("STEREO", false));
    }

    #[test]
    fn test_invalid_port_and_key_are_rejected() {
        let bad_port = store("EVENT_SERVER_PORT = 70000\n");
        let bad_key = store("MINIMIZE_KEY = \"F13\"\n");

        assert!(matches!(
            DisplaySettings::from_store(&bad_port),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            DisplaySettings::from_store(&bad_key),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_oversized_viewport_is_rejected_with_its_key() {
        // Arrange
        let at_cap = store("TILES = [\"Main\"]\nMain_VIEWPORT_WIDTH = 16384\nMain_VIEWPORT_HEIGHT = 16384\n");
        let too_tall = store("TILES = [\"Main\"]\nMain_VIEWPORT_HEIGHT = 4000000000\n");

        // Act
        let ok = DisplaySettings::from_store(&at_cap).expect("the cap itself is allowed");
        let err = DisplaySettings::from_store(&too_tall).unwrap_err();

        // Assert
        assert_eq!(ok.tiles[0].viewport.width, MAX_VIEWPORT_EXTENT);
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "Main_VIEWPORT_HEIGHT"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut store = ConfigStore::new();
        let result = store.load_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_window_size_clamps_to_one() {
        let store = store("WINDOW_WIDTH = 0\nWINDOW_HEIGHT = -5\n");
        let settings = DisplaySettings::from_store(&store).unwrap();
        assert_eq!(settings.window_size, Size::new(1, 1));
    }
}
