// src/watch/debounce.rs

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::engine::ChangeSignal;
use crate::watch::filter::EventFilter;

/// Raw events closer than this to the last accepted change are dropped.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Collapses bursts of raw events (write + chmod + rename from one editor
/// save) into a single [`ChangeSignal`].
///
/// The window check runs *before* the filter: an event inside the window is
/// dropped outright, and only an event that passes the filter moves the
/// window forward.
#[derive(Debug, Clone)]
pub struct Debouncer {
    filter: EventFilter,
    window: Duration,
    last_change: Instant,
}

impl Debouncer {
    /// `started_at` seeds the clock, so events within the first window after
    /// startup are dropped too.
    pub fn new(filter: EventFilter, started_at: Instant) -> Self {
        Self {
            filter,
            window: DEBOUNCE_WINDOW,
            last_change: started_at,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn last_change(&self) -> Instant {
        self.last_change
    }

    /// Feed one raw event observed at `now`.
    pub fn offer(&mut self, path: &Path, now: Instant) -> Option<ChangeSignal> {
        if now.saturating_duration_since(self.last_change) < self.window {
            trace!(?path, "event inside debounce window; dropped");
            return None;
        }

        if !self.filter.should_handle(path) {
            trace!(?path, "event filtered out");
            return None;
        }

        self.last_change = now;
        Some(ChangeSignal::new(path))
    }
}
