// Oxygen - tests/e2e_log_watch.rs
//
// End-to-end tests for the live log watcher.
//
// These run the real background thread against real temp directories with
// a short rescan interval: bulk read on start, appends, rotation to a newer
// file, truncation, and stop. Timing-sensitive waits use generous deadlines
// so the tests stay reliable on slow CI machines.

use oxygen::app::tail::{LogWatchConfig, LogWatcher};
use oxygen::core::model::LogWatchEvent;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

const DEADLINE: Duration = Duration::from_secs(10);

fn config(dir: &Path) -> LogWatchConfig {
    LogWatchConfig {
        directory: dir.to_path_buf(),
        patterns: vec!["*.log".to_string()],
        rescan_interval_ms: 100,
    }
}

fn write_with_age(path: &Path, content: &str, age_secs: u64) {
    fs::write(path, content).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

fn append(path: &Path, text: &str) {
    let mut f = OpenOptions::new().append(true).open(path).unwrap();
    f.write_all(text.as_bytes()).unwrap();
}

/// Collect events until `n` lines have arrived or the deadline passes.
/// Returns every event seen, in order.
fn collect_lines(watcher: &LogWatcher, n: usize) -> Vec<LogWatchEvent> {
    let start = Instant::now();
    let mut events = Vec::new();
    let mut lines = 0;
    while lines < n && start.elapsed() < DEADLINE {
        if let Some(event) = watcher.recv_event(Duration::from_millis(50)) {
            if matches!(event, LogWatchEvent::Line(_)) {
                lines += 1;
            }
            events.push(event);
        }
    }
    events
}

fn line_texts(events: &[LogWatchEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            LogWatchEvent::Line(l) => Some(l.text.clone()),
            _ => None,
        })
        .collect()
}

fn switched_paths(events: &[LogWatchEvent]) -> Vec<PathBuf> {
    events
        .iter()
        .filter_map(|e| match e {
            LogWatchEvent::Switched { path } => Some(path.clone()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn e2e_start_emits_existing_lines_then_appends() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("client.log");
    fs::write(&log, "boot\n\nready\n").unwrap();

    let mut watcher = LogWatcher::new(config(dir.path()));
    assert_eq!(watcher.start().unwrap(), log);
    assert_eq!(watcher.current_path(), Some(log.clone()));

    let events = collect_lines(&watcher, 2);
    assert_eq!(switched_paths(&events), vec![log.clone()]);
    assert_eq!(line_texts(&events), vec!["boot", "ready"]);

    append(&log, "third\nfou");
    let events = collect_lines(&watcher, 1);
    assert_eq!(line_texts(&events), vec!["third"]);

    append(&log, "rth\n");
    let events = collect_lines(&watcher, 1);
    assert_eq!(line_texts(&events), vec!["fourth"]);

    watcher.stop();
    assert!(!watcher.is_active());
}

#[test]
fn e2e_rotation_switches_to_newer_file_without_reemitting() {
    let dir = TempDir::new().unwrap();
    let old = dir.path().join("old.log");
    write_with_age(&old, "o1\no2\n", 60);

    let mut watcher = LogWatcher::new(config(dir.path()));
    watcher.start().unwrap();
    assert_eq!(line_texts(&collect_lines(&watcher, 2)), vec!["o1", "o2"]);

    let new = dir.path().join("new.log");
    fs::write(&new, "n1\n").unwrap();

    let events = collect_lines(&watcher, 1);
    assert_eq!(switched_paths(&events), vec![new.clone()]);
    assert_eq!(line_texts(&events), vec!["n1"]);
    assert_eq!(watcher.current_path(), Some(new.clone()));

    append(&new, "n2\n");
    let events = collect_lines(&watcher, 1);
    assert_eq!(line_texts(&events), vec!["n2"]);

    // Further rescans of the same newest file repeat nothing.
    std::thread::sleep(Duration::from_millis(300));
    assert!(watcher.poll_events(100).is_empty());
}

#[test]
fn e2e_truncation_rereads_from_start() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("client.log");
    fs::write(&log, "a fairly long line one\na fairly long line two\n").unwrap();

    let mut watcher = LogWatcher::new(config(dir.path()));
    watcher.start().unwrap();
    assert_eq!(collect_lines(&watcher, 2).len(), 3);

    fs::write(&log, "fresh\n").unwrap();
    let events = collect_lines(&watcher, 1);
    assert_eq!(line_texts(&events), vec!["fresh"]);
}

#[test]
fn e2e_stop_discards_later_writes_and_restart_works() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("client.log");
    fs::write(&log, "one\n").unwrap();

    let mut watcher = LogWatcher::new(config(dir.path()));
    watcher.start().unwrap();
    assert_eq!(line_texts(&collect_lines(&watcher, 1)), vec!["one"]);

    watcher.stop();
    watcher.stop();
    append(&log, "two\n");
    std::thread::sleep(Duration::from_millis(300));
    assert!(watcher.poll_events(100).is_empty());
    assert_eq!(watcher.current_path(), None);

    // A new watch starts with a fresh bulk read.
    watcher.start().unwrap();
    assert_eq!(line_texts(&collect_lines(&watcher, 2)), vec!["one", "two"]);
}

#[test]
fn e2e_deleted_file_counts_transient_errors_and_keeps_running() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("client.log");
    fs::write(&log, "x\n").unwrap();

    let mut watcher = LogWatcher::new(config(dir.path()));
    watcher.start().unwrap();
    collect_lines(&watcher, 1);

    fs::remove_file(&log).unwrap();
    let start = Instant::now();
    while watcher.transient_error_count() == 0 && start.elapsed() < DEADLINE {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(watcher.transient_error_count() > 0);
    assert!(watcher.is_active());

    let next = dir.path().join("next.log");
    fs::write(&next, "back\n").unwrap();
    let events = collect_lines(&watcher, 1);
    assert_eq!(switched_paths(&events), vec![next]);
    assert_eq!(line_texts(&events), vec!["back"]);
}
