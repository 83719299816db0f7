//! Config module - TOML settings with environment overrides

pub mod toml_config;

pub use toml_config::{
    apply_overrides, get_config_path, load_from_path, load_toml_config, GuardConfig, LedgerConfig,
    TomlConfig, TrackerConfig,
};
