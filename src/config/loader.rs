// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{DEFAULT_CONFIG_FILE, RawConfigFile, Settings, SettingsSources};
use crate::config::validate::config_root_dir;
use crate::errors::{Result, WatchrunError};

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; merging with the CLI and
/// validation happen in [`load_settings`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| WatchrunError::Path {
        path: path.to_path_buf(),
        source,
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Resolve the final [`Settings`] for this process.
///
/// - An explicit `--config` must exist.
/// - Otherwise `Watchrun.toml` in `cwd` is used when present.
/// - CLI flags override file values.
pub fn load_settings(cli: &CliArgs, cwd: &Path) -> Result<Settings> {
    let file = match &cli.config {
        Some(path) => Some((load_from_path(cwd.join(path))?, config_root_dir(path, cwd))),
        None => {
            let candidate = default_config_path(cwd);
            if candidate.is_file() {
                debug!(path = ?candidate, "using default config file");
                Some((load_from_path(&candidate)?, cwd.to_path_buf()))
            } else {
                None
            }
        }
    };

    Settings::try_from(SettingsSources {
        cli,
        file,
        cwd: cwd.to_path_buf(),
    })
}

/// `Watchrun.toml` inside `cwd`.
pub fn default_config_path(cwd: &Path) -> PathBuf {
    cwd.join(DEFAULT_CONFIG_FILE)
}
