use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use watchrun::watch::DirWatcher;

/// A `DirWatcher` that records every registration instead of talking to the
/// OS. Paths passed to `fail_on` are refused.
#[derive(Debug, Clone, Default)]
pub struct RecordingWatcher {
    watched: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl RecordingWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, path: impl AsRef<Path>) {
        self.failing
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf());
    }

    /// Registrations in call order.
    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }
}

impl DirWatcher for RecordingWatcher {
    fn watch_path(&mut self, path: &Path) -> notify::Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(notify::Error::generic("watch refused").add_path(path.to_path_buf()));
        }
        self.watched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
