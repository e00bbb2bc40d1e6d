#![allow(dead_code)]

use std::path::PathBuf;

use watchrun::cli::CliArgs;

/// Builder for `CliArgs` to simplify settings tests.
pub struct CliArgsBuilder {
    args: CliArgs,
}

impl CliArgsBuilder {
    pub fn new() -> Self {
        Self {
            args: CliArgs::default(),
        }
    }

    pub fn init_cmd(mut self, cmd: &str) -> Self {
        self.args.init_cmd = Some(cmd.to_string());
        self
    }

    pub fn prep_cmd(mut self, cmd: &str) -> Self {
        self.args.prep_cmd = Some(cmd.to_string());
        self
    }

    pub fn run_cmd(mut self, cmd: &str) -> Self {
        self.args.run_cmd = Some(cmd.to_string());
        self
    }

    pub fn extensions(mut self, exts: &[&str]) -> Self {
        self.args.file_extensions = Some(exts.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.config = Some(path.into());
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.args.paths.push(path.into());
        self
    }

    pub fn build(self) -> CliArgs {
        self.args
    }
}

impl Default for CliArgsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
