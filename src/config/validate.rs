// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{DEFAULT_EXTENSIONS, Settings, SettingsSources};
use crate::errors::{Result, WatchrunError};

impl TryFrom<SettingsSources<'_>> for Settings {
    type Error = crate::errors::WatchrunError;

    fn try_from(sources: SettingsSources<'_>) -> std::result::Result<Self, Self::Error> {
        let SettingsSources { cli, file, cwd } = sources;
        let (file, config_dir) = match file {
            Some((raw, dir)) => (raw, Some(dir)),
            None => (Default::default(), None),
        };

        let init_cmd = pick_command(cli.init_cmd.as_deref(), file.init_cmd.as_deref());
        let prep_cmd = pick_command(cli.prep_cmd.as_deref(), file.prep_cmd.as_deref());
        let run_cmd = pick_command(cli.run_cmd.as_deref(), file.run_cmd.as_deref());
        let run_cmd = ensure_run_command(run_cmd)?;

        let extensions = match cli.file_extensions.as_ref().or(file.file_extensions.as_ref()) {
            Some(list) => normalize_extensions(list),
            None => DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        };

        let paths = if !cli.paths.is_empty() {
            cli.paths.clone()
        } else if !file.paths.is_empty() {
            let base = config_dir.unwrap_or_else(|| cwd.clone());
            file.paths.iter().map(|p| base.join(p)).collect()
        } else {
            vec![cwd]
        };

        Ok(Settings {
            init_cmd,
            prep_cmd,
            run_cmd,
            extensions,
            paths,
        })
    }
}

/// CLI wins over the file; blank strings count as "not configured".
fn pick_command(cli: Option<&str>, file: Option<&str>) -> Option<String> {
    let non_blank = |s: &&str| !s.trim().is_empty();
    cli.filter(non_blank)
        .or_else(|| file.filter(non_blank))
        .map(|s| s.to_string())
}

fn ensure_run_command(run_cmd: Option<String>) -> Result<String> {
    run_cmd.ok_or_else(|| {
        WatchrunError::Config(
            "--run-cmd is required (or set `run_cmd` in the config file)".to_string(),
        )
    })
}

/// Trim entries and drop empty ones. Matching stays case-sensitive, so the
/// values are otherwise kept as given.
pub fn normalize_extensions(list: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(list.len());
    for ext in list {
        let ext = ext.trim();
        if ext.is_empty() || out.iter().any(|e| e == ext) {
            continue;
        }
        out.push(ext.to_string());
    }
    out
}

/// Directory used to resolve relative `paths` from a config file.
///
/// A bare file name like `Watchrun.toml` has an empty parent, in which case
/// `cwd` is used instead.
pub fn config_root_dir(config_path: &std::path::Path, cwd: &std::path::Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd.to_path_buf(),
    }
}
