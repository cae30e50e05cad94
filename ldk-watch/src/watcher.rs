//! `FileWatcher`: wraps a `notify::RecommendedWatcher`, coalescing bursts
//! within a debounce window into one callback per changed path (spec §4.15).
//! Uses the same `CancellationToken`-gated background task idiom as the
//! scheduler's tick task.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::filter::GlobFilter;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

struct RunningState {
    // held only to keep the OS watch alive; never read directly.
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
}

pub struct FileWatcher {
    root: PathBuf,
    filter: GlobFilter,
    debounce: Duration,
    state: Mutex<Option<RunningState>>,
}

impl FileWatcher {
    pub fn new(root: impl Into<PathBuf>, filter: GlobFilter) -> Self {
        FileWatcher { root: root.into(), filter, debounce: DEFAULT_DEBOUNCE, state: Mutex::new(None) }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Starts watching; a second call while already running is a no-op
    /// (spec §4.15).
    pub fn start(&self, on_change: impl Fn(PathBuf) + Send + Sync + 'static) {
        let mut state = self.state.lock().expect("watcher state lock poisoned");
        if state.is_some() {
            return;
        }

        let (raw_tx, raw_rx) = tokio::sync::mpsc::unbounded_channel::<PathBuf>();
        let filter = self.filter.clone();
        let mut watcher = match notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in event.paths {
                    if filter.matches(&path) {
                        let _ = raw_tx.send(path);
                    }
                }
            }
            Err(err) => warn!(error = %err, "filesystem watch error"),
        }) {
            Ok(w) => w,
            Err(err) => {
                warn!(error = %err, "failed to construct filesystem watcher");
                return;
            }
        };
        if let Err(err) = watcher.watch(&self.root, RecursiveMode::Recursive) {
            warn!(error = %err, root = %self.root.display(), "failed to watch root");
            return;
        }

        let cancel = CancellationToken::new();
        *state = Some(RunningState { _watcher: watcher, cancel: cancel.clone() });
        drop(state);

        spawn_notifier_task(raw_rx, cancel, self.debounce, Arc::new(on_change));
    }

    /// Stops watching; calling this before `start()` (or twice) is a no-op
    /// (spec §4.15).
    pub fn stop(&self) {
        let mut state = self.state.lock().expect("watcher state lock poisoned");
        if let Some(running) = state.take() {
            running.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().expect("watcher state lock poisoned").is_some()
    }
}

fn spawn_notifier_task(
    mut raw_rx: tokio::sync::mpsc::UnboundedReceiver<PathBuf>,
    cancel: CancellationToken,
    debounce: Duration,
    on_change: Arc<dyn Fn(PathBuf) + Send + Sync>,
) {
    tokio::spawn(async move {
        let mut deadlines: HashMap<PathBuf, Instant> = HashMap::new();
        loop {
            let poll_interval = tokio::time::sleep(Duration::from_millis(20));
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = raw_rx.recv() => {
                    match received {
                        Some(path) => { deadlines.insert(path, Instant::now() + debounce); }
                        None => break,
                    }
                }
                _ = poll_interval => {}
            }
            let now = Instant::now();
            let due: Vec<PathBuf> = deadlines.iter().filter(|(_, &t)| t <= now).map(|(p, _)| p.clone()).collect();
            for path in due {
                deadlines.remove(&path);
                on_change(path.clone());
            }
        }
    });
}
