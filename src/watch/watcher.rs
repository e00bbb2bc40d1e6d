// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, Watcher as _};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::engine::ChangeSender;
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::watch::debounce::Debouncer;
use crate::watch::filter::{EventFilter, is_hidden};
use crate::watch::registry::{DirWatcher, PathRegistry, scan_new_directory};

/// Kind of a raw change, as delivered by the notification source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

/// One `(path, kind)` pair from the notification source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: RawEventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: RawEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Flatten a notify event into raw events, one per path.
    ///
    /// Access events (open / read / close) are not changes and yield nothing.
    pub fn from_notify(event: &Event) -> Vec<RawEvent> {
        let Some(kind) = classify(&event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .iter()
            .map(|path| RawEvent::new(path.clone(), kind))
            .collect()
    }
}

fn classify(kind: &EventKind) -> Option<RawEventKind> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) => Some(RawEventKind::Create),
        EventKind::Remove(_) => Some(RawEventKind::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(RawEventKind::Chmod),
        EventKind::Modify(ModifyKind::Name(_)) => Some(RawEventKind::Rename),
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(RawEventKind::Write),
    }
}

/// Path registry plus the stream of raw events it produces.
///
/// Paths are added while the watcher is still idle (startup); [`Watcher::spawn`]
/// then moves everything into the event loop task, which keeps registering
/// directories created later on.
pub struct Watcher<W: DirWatcher = RecommendedWatcher> {
    registry: PathRegistry<W>,
    events: mpsc::UnboundedReceiver<RawEvent>,
    filter: EventFilter,
}

impl<W: DirWatcher> std::fmt::Debug for Watcher<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("registry", &self.registry)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Watcher<RecommendedWatcher> {
    /// Create a watcher backed by the platform's notify implementation and
    /// the real file system.
    pub fn new(filter: EventFilter) -> Result<Self> {
        let (event_tx, events) = mpsc::unbounded_channel::<RawEvent>();

        // Called synchronously by notify on its own thread.
        let notify_watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for raw in RawEvent::from_notify(&event) {
                        if event_tx.send(raw).is_err() {
                            // Event loop is gone; nothing left to notify.
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )
        .map_err(anyhow::Error::from)?;

        let registry = PathRegistry::new(notify_watcher, Arc::new(RealFileSystem));
        Ok(Self::with_parts(registry, events, filter))
    }
}

impl<W: DirWatcher + 'static> Watcher<W> {
    /// Assemble a watcher from an existing registry and event stream.
    pub fn with_parts(
        registry: PathRegistry<W>,
        events: mpsc::UnboundedReceiver<RawEvent>,
        filter: EventFilter,
    ) -> Self {
        Self {
            registry,
            events,
            filter,
        }
    }

    pub fn add_path(&mut self, path: &Path) -> Result<()> {
        self.registry.add_path(path)
    }

    pub fn registry(&self) -> &PathRegistry<W> {
        &self.registry
    }

    /// Start the event loop. The debounce clock starts now.
    pub fn spawn(self, queue: ChangeSender, shutdown: CancellationToken) -> WatcherHandle {
        let Watcher {
            registry,
            events,
            filter,
        } = self;
        let debouncer = Debouncer::new(filter, Instant::now());
        let task = tokio::spawn(async move {
            // Dropping the registry at the end also drops the notify watcher.
            let _registry = run_event_loop(events, registry, debouncer, queue, shutdown).await;
        });
        WatcherHandle { task }
    }
}

/// Handle for the running event loop.
///
/// The loop stops on shutdown; dropping this handle does not stop it.
pub struct WatcherHandle {
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl WatcherHandle {
    /// Wait for the event loop to finish (after shutdown).
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "watch event loop task failed");
        }
    }
}

/// Consume raw events until shutdown:
/// - `Create` of a visible directory registers it (and its subtree);
/// - every event goes through the debouncer, and accepted changes are sent
///   onto the change queue, waiting for capacity when it is full.
///
/// Returns the registry so callers can inspect what ended up watched.
pub async fn run_event_loop<W: DirWatcher>(
    mut events: mpsc::UnboundedReceiver<RawEvent>,
    mut registry: PathRegistry<W>,
    mut debouncer: Debouncer,
    queue: ChangeSender,
    shutdown: CancellationToken,
) -> PathRegistry<W> {
    info!(watched = registry.len(), "watch event loop started");

    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = events.recv() => match next {
                Some(event) => event,
                None => break,
            },
        };

        trace!(?event, "raw event");

        if event.kind == RawEventKind::Create && !is_hidden(&event.path) {
            watch_new_directory(&mut registry, &event.path).await;
        }

        let Some(change) = debouncer.offer(&event.path, Instant::now()) else {
            continue;
        };

        debug!(path = ?change.path, "queueing change");
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            sent = queue.send(change) => {
                if sent.is_err() {
                    debug!("change queue closed");
                    break;
                }
            }
        }
    }

    debug!("watch event loop finished");
    registry
}

/// Walk a created directory on the blocking pool, then register what the
/// walk found. A large new tree does not stall the event loop.
async fn watch_new_directory<W: DirWatcher>(registry: &mut PathRegistry<W>, path: &Path) {
    let fs = registry.file_system();
    let target = path.to_path_buf();
    let scan = match tokio::task::spawn_blocking(move || scan_new_directory(fs.as_ref(), &target))
        .await
    {
        Ok(scan) => scan,
        Err(err) => {
            warn!(?path, error = %err, "directory scan task failed");
            return;
        }
    };

    let added = scan.and_then(|found| match found {
        Some(scan) => registry.apply_scan(scan),
        None => Ok(false),
    });
    match added {
        Ok(true) => info!(?path, "watching new directory"),
        Ok(false) => {}
        Err(err) => warn!(?path, error = %err, "could not watch new directory"),
    }
}
