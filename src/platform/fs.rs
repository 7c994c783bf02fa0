// Oxygen - platform/fs.rs
//
// Filesystem helpers for the log watcher: newest-log resolution and
// offset-based reads.

use glob::Pattern;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Compile glob patterns, skipping (and logging) invalid ones.
pub fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pat) => Some(pat),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "Ignoring invalid log file pattern");
                None
            }
        })
        .collect()
}

/// Return the most recently modified regular file directly inside `dir`
/// whose name matches one of `patterns`.
///
/// `Ok(None)` means no matching file, including when `dir` does not exist
/// (yet). Ties on mtime are broken by path so the choice is stable between
/// polls. Entries whose metadata cannot be read are skipped.
pub fn find_latest_log_file(dir: &Path, patterns: &[Pattern]) -> io::Result<Option<PathBuf>> {
    // An unreadable directory is an error; walkdir alone would report it as
    // an empty listing.
    match std::fs::read_dir(dir) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "Log directory does not exist");
            return Ok(None);
        }
        Err(e) => return Err(e),
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;

    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry in walker.into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !patterns.iter().any(|p| p.matches(&name)) {
            continue;
        }
        let Some(mtime) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
            tracing::trace!(file = %entry.path().display(), "Skipping log file with unreadable mtime");
            continue;
        };

        let candidate = (mtime, entry.into_path());
        let replace = match &newest {
            None => true,
            Some(best) => candidate > *best,
        };
        if replace {
            newest = Some(candidate);
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Read from byte `offset` up to `end` (exclusive).
///
/// Returns fewer bytes if the file is shorter than `end` by the time it is
/// read.
pub fn read_range(path: &Path, offset: u64, end: u64) -> io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.take(end.saturating_sub(offset)).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.is_dir() {
        std::fs::create_dir_all(dir)?;
        tracing::debug!(dir = %dir.display(), "Created directory");
    }
    Ok(())
}
