//! Storage infrastructure: configuration files and command-line overrides.

pub mod config;

pub use config::{
    split_override, ChannelSettings, ConfigError, ConfigStore, DisplaySettings, EventServerSettings, TileSettings,
};
