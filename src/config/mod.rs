// src/config/mod.rs

//! Settings resolution: CLI flags merged over an optional `Watchrun.toml`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_from_path, load_settings};
pub use model::{DEFAULT_EXTENSIONS, RawConfigFile, Settings, SettingsSources};
