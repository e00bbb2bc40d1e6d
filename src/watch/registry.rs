// src/watch/registry.rs

//! Set of directories registered with the notification primitive.

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::errors::{Result, WatchrunError};
use crate::fs::{EntryKind, FileSystem};
use crate::watch::filter::is_hidden;

/// The notification primitive as seen by the registry: something that can be
/// told to watch one more path (non-recursively).
pub trait DirWatcher: Send {
    fn watch_path(&mut self, path: &Path) -> notify::Result<()>;
}

impl DirWatcher for RecommendedWatcher {
    fn watch_path(&mut self, path: &Path) -> notify::Result<()> {
        self.watch(path, RecursiveMode::NonRecursive)
    }
}

/// Tracks every registered absolute path. Only grows.
pub struct PathRegistry<W: DirWatcher> {
    watcher: W,
    fs: Arc<dyn FileSystem>,
    paths: HashSet<PathBuf>,
}

impl<W: DirWatcher> std::fmt::Debug for PathRegistry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRegistry")
            .field("paths", &self.paths.len())
            .finish_non_exhaustive()
    }
}

impl<W: DirWatcher> PathRegistry<W> {
    pub fn new(watcher: W, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            watcher,
            fs,
            paths: HashSet::new(),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Register `path` and, if it is a directory, every visible directory
    /// below it.
    ///
    /// - Missing / un-stat-able path: [`WatchrunError::Path`].
    /// - Already registered: no-op.
    /// - Hidden (any component starts with `.`): skipped with a warning.
    /// - Registration refused: [`WatchrunError::Watch`].
    /// - A failure while walking aborts the whole call.
    pub fn add_path(&mut self, path: &Path) -> Result<()> {
        let kind = self.fs.entry_kind(path).map_err(|source| WatchrunError::Path {
            path: path.to_path_buf(),
            source,
        })?;

        let abs = absolute_path(path).map_err(|source| WatchrunError::Path {
            path: path.to_path_buf(),
            source,
        })?;

        if self.paths.contains(&abs) {
            debug!(path = ?abs, "path already registered");
            return Ok(());
        }

        if is_hidden(&abs) {
            warn!(path = ?abs, "path is hidden; not watching it");
            return Ok(());
        }

        self.register(&abs)?;

        if kind == EntryKind::Dir {
            self.add_descendants(&abs)?;
        }

        Ok(())
    }

    /// Register a directory that appeared after startup. Files and vanished
    /// paths are ignored.
    pub fn add_new_directory(&mut self, path: &Path) -> Result<bool> {
        match scan_new_directory(self.fs.as_ref(), path)? {
            Some(scan) => self.apply_scan(scan),
            None => Ok(false),
        }
    }

    /// Register the directories found by [`scan_new_directory`]. Returns
    /// `false` when the scanned root was already registered.
    pub fn apply_scan(&mut self, scan: DirectoryScan) -> Result<bool> {
        if self.paths.contains(&scan.root) {
            debug!(path = ?scan.root, "path already registered");
            return Ok(false);
        }
        self.register(&scan.root)?;
        for dir in scan.descendants {
            if !self.paths.contains(&dir) {
                self.register(&dir)?;
            }
        }
        Ok(true)
    }

    /// Shared handle to the file system the registry walks.
    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    fn register(&mut self, path: &Path) -> Result<()> {
        self.watcher
            .watch_path(path)
            .map_err(|source| WatchrunError::Watch {
                path: path.to_path_buf(),
                source,
            })?;
        self.paths.insert(path.to_path_buf());
        trace!(?path, "registered watch");
        Ok(())
    }

    /// Already registered directories are skipped but still descended into,
    /// so that new children get picked up.
    fn add_descendants(&mut self, root: &Path) -> Result<()> {
        for dir in visible_subdirectories(self.fs.as_ref(), root)? {
            if !self.paths.contains(&dir) {
                self.register(&dir)?;
            }
        }
        Ok(())
    }
}

/// A created directory and the visible directories below it, listed without
/// touching any registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryScan {
    root: PathBuf,
    descendants: Vec<PathBuf>,
}

impl DirectoryScan {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subdirectories in walk order.
    pub fn descendants(&self) -> &[PathBuf] {
        &self.descendants
    }
}

/// Walk a directory that appeared after startup.
///
/// This is the blocking half of [`PathRegistry::add_new_directory`]; the
/// event loop runs it on the blocking pool and applies the result with
/// [`PathRegistry::apply_scan`]. `None` when `path` is not a visible
/// directory (any more).
pub fn scan_new_directory(fs: &dyn FileSystem, path: &Path) -> Result<Option<DirectoryScan>> {
    match fs.entry_kind(path) {
        Ok(EntryKind::Dir) => {}
        _ => return Ok(None),
    }

    let root = absolute_path(path).map_err(|source| WatchrunError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    if is_hidden(&root) {
        return Ok(None);
    }

    let descendants = visible_subdirectories(fs, &root)?;
    Ok(Some(DirectoryScan { root, descendants }))
}

/// Depth-first walk below `root`. Hidden directories are pruned with their
/// whole subtree.
fn visible_subdirectories(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = fs.read_dir(&dir).map_err(|source| WatchrunError::Path {
            path: dir.clone(),
            source,
        })?;

        for entry in entries {
            if entry.kind != EntryKind::Dir {
                continue;
            }
            let path = normalize_lexically(&entry.path);
            if is_hidden(&path) {
                trace!(?path, "pruning hidden directory");
                continue;
            }
            found.push(path.clone());
            stack.push(path);
        }
    }

    Ok(found)
}

/// Make `path` absolute against the working directory and clean it
/// lexically. Symlinks are not resolved.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    let abs = std::path::absolute(path)?;
    Ok(normalize_lexically(&abs))
}

/// Drop `.` components and fold `..` into its parent, without touching the
/// file system.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
