// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Extensions watched when neither the CLI nor the config file names any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".go", ".mod"];

/// Config file name picked up from the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Watchrun.toml";

/// On-disk representation of `Watchrun.toml`.
///
/// Every key is optional; the CLI fills in (and overrides) whatever the file
/// leaves out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub init_cmd: Option<String>,
    #[serde(default)]
    pub prep_cmd: Option<String>,
    #[serde(default)]
    pub run_cmd: Option<String>,
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,
    /// Roots to watch. Relative entries are resolved against the directory
    /// containing the config file.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Fully resolved and validated settings for one `watchrun` process.
///
/// Constructed via `Settings::try_from(SettingsSources)` (see
/// `config::validate`), never directly from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub init_cmd: Option<String>,
    pub prep_cmd: Option<String>,
    pub run_cmd: String,
    /// Extension allow-list (e.g. `.go`). Empty means "allow everything".
    pub extensions: Vec<String>,
    /// Roots handed to the path registry, in the order given.
    pub paths: Vec<PathBuf>,
}

/// Inputs that get merged into [`Settings`].
///
/// `file` is the parsed config file together with the directory it was read
/// from; `cwd` is the fallback watch root.
#[derive(Debug, Clone)]
pub struct SettingsSources<'a> {
    pub cli: &'a crate::cli::CliArgs,
    pub file: Option<(RawConfigFile, PathBuf)>,
    pub cwd: PathBuf,
}
