// Oxygen - app/tail.rs
//
// Live tail of the newest client log file, following rotation and
// truncation.
//
// Architecture:
//   - `LogWatcher` lives on the caller's thread; `run_log_watcher` runs on a
//     background thread that owns all offset state (`TailState`).
//   - Two triggers feed that thread through ONE command channel: the
//     `notify` change callback enqueues `Command::Changed`, and the rescan
//     timer is the channel's receive deadline. A rotation switch and an
//     incremental read therefore never interleave.
//   - An `Arc<AtomicBool>` cancel flag plus `Command::Stop` let the caller
//     stop the thread; `stop` joins it, so the old watch is fully torn down
//     before a new one starts. Lines read after cancellation are discarded.
//   - Log lines are sent as `LogWatchEvent::Line` over an mpsc channel that
//     the caller drains with `poll_events` (same pattern as the directory
//     watcher this grew out of).
//
// Error policy:
//   - Failure to locate any log file at start, including a log directory
//     that does not exist yet, is `LogWatchError::NoLogFound` and the
//     watcher stays idle.
//   - Every I/O or notify error during an active watch is logged at WARN and
//     counted in `transient_error_count`; the watch continues and the next
//     tick or change notification simply tries again.
//   - A file that shrinks below the tracked offset is re-read from 0.
//   - Each timer tick with an unchanged path performs a catch-up read, so a
//     missed change notification never stalls the stream.

use crate::core::lines::{self, LineBuffer};
use crate::core::model::{LogLine, LogWatchEvent};
use crate::platform::fs as pfs;
use crate::util::error::LogWatchError;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

// =============================================================================
// Watch configuration
// =============================================================================

/// Where to look for log files and how often to re-resolve the newest one.
#[derive(Debug, Clone)]
pub struct LogWatchConfig {
    /// Directory the client writes its logs to.
    pub directory: PathBuf,
    /// File name globs recognised as log files.
    pub patterns: Vec<String>,
    /// Rescan cadence (ms).
    pub rescan_interval_ms: u64,
}

impl LogWatchConfig {
    pub fn new(directory: PathBuf) -> Self {
        use crate::util::constants;
        Self {
            directory,
            patterns: constants::DEFAULT_LOG_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            rescan_interval_ms: constants::DEFAULT_LOG_RESCAN_INTERVAL_MS,
        }
    }
}

// =============================================================================
// TailState
// =============================================================================

/// Read position within the watched file.
///
/// Invariant: `offset` never exceeds the file size observed at the last read;
/// a smaller file resets it to 0 before reading.
#[derive(Debug, Default)]
pub struct TailState {
    path: Option<PathBuf>,
    /// Bytes of the current file already consumed.
    offset: u64,
    lines: LineBuffer,
}

impl TailState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Make `path` the watched file and return its whole current content.
    ///
    /// The offset is reset to 0 first; if the read fails it stays there so
    /// the next incremental read delivers the content instead.
    pub fn switch_to(&mut self, path: PathBuf) -> io::Result<Vec<LogLine>> {
        self.path = Some(path);
        self.offset = 0;
        self.lines.clear();

        let Some(path) = self.path.as_deref() else {
            return Ok(Vec::new());
        };
        let bytes = std::fs::read(path)?;
        self.offset = bytes.len() as u64;
        Ok(lines::split_all(&bytes))
    }

    /// Return lines appended since the last read.
    pub fn read_new(&mut self) -> io::Result<Vec<LogLine>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(Vec::new());
        };

        let size = std::fs::metadata(path)?.len();

        if size < self.offset {
            tracing::info!(
                file = %path.display(),
                old_offset = self.offset,
                new_size = size,
                "Tail: file truncated or replaced, resetting offset to 0"
            );
            self.offset = 0;
            self.lines.clear();
        }

        if size == self.offset {
            return Ok(Vec::new());
        }

        let bytes = pfs::read_range(path, self.offset, size)?;
        self.offset += bytes.len() as u64;
        Ok(self.lines.feed(&bytes))
    }
}

// =============================================================================
// LogWatcher
// =============================================================================

enum Command {
    /// The watched file reported a change.
    Changed,
    Stop,
}

/// Handles to a running watch thread.
struct ActiveWatch {
    cancel: Arc<AtomicBool>,
    command_tx: mpsc::Sender<Command>,
    events_rx: mpsc::Receiver<LogWatchEvent>,
    worker: JoinHandle<()>,
}

/// State machine over {Idle, Watching}. `Watching` holds exactly one
/// background thread and at most one file watch.
pub struct LogWatcher {
    config: LogWatchConfig,
    active: Option<ActiveWatch>,
    current_path: Arc<Mutex<Option<PathBuf>>>,
    transient_errors: Arc<AtomicU64>,
}

impl LogWatcher {
    /// Create an idle watcher. No thread is started until `start`.
    pub fn new(config: LogWatchConfig) -> Self {
        Self {
            config,
            active: None,
            current_path: Arc::new(Mutex::new(None)),
            transient_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start watching the newest log file, returning its path.
    ///
    /// A running watch is stopped first. With no log file present the
    /// watcher stays idle and `NoLogFound` is returned; calling `start`
    /// again later is fine.
    pub fn start(&mut self) -> Result<PathBuf, LogWatchError> {
        self.stop();

        let patterns = pfs::compile_patterns(&self.config.patterns);
        let path = pfs::find_latest_log_file(&self.config.directory, &patterns)
            .map_err(|source| LogWatchError::Io {
                path: self.config.directory.clone(),
                source,
            })?
            .ok_or_else(|| LogWatchError::NoLogFound {
                directory: self.config.directory.clone(),
            })?;

        *self.current_path.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());

        let cancel = Arc::new(AtomicBool::new(false));
        let (command_tx, command_rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();

        let worker = WorkerContext {
            directory: self.config.directory.clone(),
            patterns,
            rescan_interval: Duration::from_millis(self.config.rescan_interval_ms),
            cancel: Arc::clone(&cancel),
            command_tx: command_tx.clone(),
            command_rx,
            events_tx,
            current_path: Arc::clone(&self.current_path),
            transient_errors: Arc::clone(&self.transient_errors),
        };
        let initial = path.clone();
        let worker = std::thread::spawn(move || run_log_watcher(initial, worker));

        self.active = Some(ActiveWatch {
            cancel,
            command_tx,
            events_rx,
            worker,
        });

        tracing::info!(file = %path.display(), "Log watch started");
        Ok(path)
    }

    /// Stop the watch and join its thread. A no-op when already idle.
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.store(true, Ordering::SeqCst);
        // The thread may already have exited; nothing to do then.
        let _ = active.command_tx.send(Command::Stop);
        if active.worker.join().is_err() {
            tracing::error!("Log watch thread panicked");
        }
        *self.current_path.lock().unwrap_or_else(PoisonError::into_inner) = None;
        tracing::info!("Log watch stopped");
    }

    /// Returns `true` while a watch thread is running.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Path of the file currently being tailed.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.current_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of I/O or notify errors absorbed since this watcher was created.
    pub fn transient_error_count(&self) -> u64 {
        self.transient_errors.load(Ordering::Relaxed)
    }

    /// Drain at most `max` pending events without blocking.
    pub fn poll_events(&self, max: usize) -> Vec<LogWatchEvent> {
        let Some(active) = &self.active else {
            return Vec::new();
        };
        active.events_rx.try_iter().take(max).collect()
    }

    /// Block up to `timeout` for the next event.
    pub fn recv_event(&self, timeout: Duration) -> Option<LogWatchEvent> {
        self.active
            .as_ref()
            .and_then(|a| a.events_rx.recv_timeout(timeout).ok())
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Background thread
// =============================================================================

struct WorkerContext {
    directory: PathBuf,
    patterns: Vec<glob::Pattern>,
    rescan_interval: Duration,
    cancel: Arc<AtomicBool>,
    /// Cloned into each file watch callback.
    command_tx: mpsc::Sender<Command>,
    command_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::Sender<LogWatchEvent>,
    current_path: Arc<Mutex<Option<PathBuf>>>,
    transient_errors: Arc<AtomicU64>,
}

impl WorkerContext {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn transient(&self, what: &'static str, path: &Path, error: &dyn std::fmt::Display) {
        self.transient_errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(file = %path.display(), error = %error, "Tail: {what} failed, will retry");
    }

    /// Send lines in order. Returns `false` when the thread should exit
    /// (cancelled or receiver gone); remaining lines are discarded.
    fn emit(&self, lines: Vec<LogLine>) -> bool {
        for line in lines {
            if self.cancelled() || self.events_tx.send(LogWatchEvent::Line(line)).is_err() {
                return false;
            }
        }
        true
    }
}

/// Entry point of the watch thread. Performs the initial switch to
/// `initial`, then serves change notifications and rescan deadlines until
/// stopped.
fn run_log_watcher(initial: PathBuf, ctx: WorkerContext) {
    let mut state = TailState::new();
    let mut watch: Option<RecommendedWatcher> = None;

    if switch_file(&mut state, &mut watch, initial, &ctx) {
        let mut next_rescan = Instant::now() + ctx.rescan_interval;

        loop {
            let wait = next_rescan.saturating_duration_since(Instant::now());
            match ctx.command_rx.recv_timeout(wait) {
                Ok(Command::Stop) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Ok(Command::Changed) => {
                    if !read_incremental(&mut state, &ctx) {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }

            if ctx.cancelled() {
                break;
            }

            if Instant::now() >= next_rescan {
                if !rescan(&mut state, &mut watch, &ctx) {
                    break;
                }
                next_rescan = Instant::now() + ctx.rescan_interval;
            }
        }
    }

    drop(watch);
    tracing::debug!("Log watch thread exiting");
    let _ = ctx.events_tx.send(LogWatchEvent::Stopped);
}

/// Re-resolve the newest log file; switch if it changed, otherwise catch up
/// on the current one.
fn rescan(state: &mut TailState, watch: &mut Option<RecommendedWatcher>, ctx: &WorkerContext) -> bool {
    match pfs::find_latest_log_file(&ctx.directory, &ctx.patterns) {
        Ok(Some(newest)) if state.path() != Some(newest.as_path()) => {
            switch_file(state, watch, newest, ctx)
        }
        Ok(_) => read_incremental(state, ctx),
        Err(e) => {
            ctx.transient("directory scan", &ctx.directory, &e);
            true
        }
    }
}

/// Rotation switch: tear down the old watch, bulk-read the new file, then
/// watch it for changes.
fn switch_file(
    state: &mut TailState,
    watch: &mut Option<RecommendedWatcher>,
    path: PathBuf,
    ctx: &WorkerContext,
) -> bool {
    if let Some(old) = watch.take() {
        drop(old);
        tracing::debug!("Tail: previous file watch closed");
    }

    tracing::info!(file = %path.display(), "Tail: switching to log file");
    *ctx.current_path.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.clone());

    if ctx.cancelled()
        || ctx
            .events_tx
            .send(LogWatchEvent::Switched { path: path.clone() })
            .is_err()
    {
        return false;
    }

    let bulk = match state.switch_to(path.clone()) {
        Ok(lines) => lines,
        Err(e) => {
            ctx.transient("initial read", &path, &e);
            Vec::new()
        }
    };
    tracing::debug!(file = %path.display(), lines = bulk.len(), offset = state.offset(), "Tail: bulk read");
    if !ctx.emit(bulk) {
        return false;
    }

    *watch = watch_file(&path, ctx);
    true
}

fn read_incremental(state: &mut TailState, ctx: &WorkerContext) -> bool {
    match state.read_new() {
        Ok(lines) => {
            if !lines.is_empty() {
                tracing::trace!(count = lines.len(), offset = state.offset(), "Tail: new lines");
            }
            ctx.emit(lines)
        }
        Err(e) => {
            let path = state.path().map(Path::to_path_buf).unwrap_or_default();
            ctx.transient("read", &path, &e);
            true
        }
    }
}

/// Register a change watch on `path`. On failure the watch runs on the rescan
/// timer alone.
fn watch_file(path: &Path, ctx: &WorkerContext) -> Option<RecommendedWatcher> {
    let tx = ctx.command_tx.clone();
    let errors = Arc::clone(&ctx.transient_errors);
    let handler = move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            if matches!(
                event.kind,
                EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
            ) {
                let _ = tx.send(Command::Changed);
            }
        }
        Err(e) => {
            errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "Tail: file watch error");
        }
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(w) => w,
        Err(e) => {
            ctx.transient("watch setup", path, &e);
            return None;
        }
    };
    if let Err(e) = watcher.watch(path, RecursiveMode::NonRecursive) {
        ctx.transient("watch", path, &e);
        return None;
    }
    Some(watcher)
}
