// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Registering watched directories (recursively, hidden ones pruned).
//! - Wiring up the platform filesystem watcher (`notify`).
//! - Filtering events by extension and hidden paths.
//! - Debouncing bursts into single change signals for the engine.
//!
//! It does **not** know about prep / run commands; it only turns
//! filesystem changes into [`crate::engine::ChangeSignal`]s.

pub mod debounce;
pub mod filter;
pub mod registry;
pub mod watcher;

pub use debounce::{DEBOUNCE_WINDOW, Debouncer};
pub use filter::{EventFilter, extension_of, is_hidden};
pub use registry::{DirWatcher, DirectoryScan, PathRegistry, absolute_path, scan_new_directory};
pub use watcher::{RawEvent, RawEventKind, Watcher, WatcherHandle, run_event_loop};
