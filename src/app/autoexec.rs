// Oxygen - app/autoexec.rs
//
// Auto-execute folder management. Scripts copied into the folder are run
// by the executor on attach; this module only manages the files.
//
// Script names are bare file names. Anything containing a path separator
// or `..` is rejected so every operation stays inside the folder.

use crate::platform::fs as pfs;
use crate::util::constants::AUTOEXEC_EXTENSIONS;
use crate::util::error::AutoExecError;
use std::path::{Path, PathBuf};

/// One script in the auto-execute folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoExecScript {
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

/// Handle to the auto-execute folder.
#[derive(Debug, Clone)]
pub struct AutoExec {
    dir: PathBuf,
}

impl AutoExec {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every `.lua`/`.txt` script in the folder, sorted by name.
    ///
    /// A missing folder is an empty list. Unreadable files are skipped with
    /// a warning.
    pub fn list(&self) -> Result<Vec<AutoExecScript>, AutoExecError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(AutoExecError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut scripts: Vec<AutoExecScript> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_script_extension(path))
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                match std::fs::read_to_string(&path) {
                    Ok(content) => Some(AutoExecScript {
                        name,
                        path,
                        content,
                    }),
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable auto-execute script");
                        None
                    }
                }
            })
            .collect();

        scripts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scripts)
    }

    /// Write `content` as `name`, creating the folder if needed. An existing
    /// script of the same name is replaced.
    pub fn add(&self, name: &str, content: &str) -> Result<PathBuf, AutoExecError> {
        let path = self.script_path(name)?;
        pfs::ensure_dir(&self.dir).map_err(|source| AutoExecError::Io {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, content).map_err(|source| AutoExecError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(script = name, "Added auto-execute script");
        Ok(path)
    }

    /// Delete `name`. Returns whether a file was removed.
    pub fn remove(&self, name: &str) -> Result<bool, AutoExecError> {
        let path = self.script_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(script = name, "Removed auto-execute script");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AutoExecError::Io { path, source }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.script_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn script_path(&self, name: &str) -> Result<PathBuf, AutoExecError> {
        if !is_valid_name(name) {
            return Err(AutoExecError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(self.dir.join(name))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

fn has_script_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| AUTOEXEC_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_list_remove() {
        let tmp = TempDir::new().unwrap();
        let auto = AutoExec::new(tmp.path().join("AutoExec"));

        assert!(auto.list().unwrap().is_empty(), "missing folder lists empty");

        auto.add("b.lua", "print('b')").unwrap();
        auto.add("a.txt", "print('a')").unwrap();
        std::fs::write(auto.dir().join("notes.md"), "ignored").unwrap();

        let names: Vec<_> = auto.list().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a.txt", "b.lua"]);
        assert!(auto.contains("b.lua"));

        assert!(auto.remove("b.lua").unwrap());
        assert!(!auto.remove("b.lua").unwrap(), "second remove is a no-op");
        assert!(!auto.contains("b.lua"));
    }

    #[test]
    fn test_add_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let auto = AutoExec::new(tmp.path().to_path_buf());
        auto.add("x.lua", "old").unwrap();
        auto.add("x.lua", "new").unwrap();
        let scripts = auto.list().unwrap();
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].content, "new");
    }

    #[test]
    fn test_rejects_escaping_names() {
        let tmp = TempDir::new().unwrap();
        let auto = AutoExec::new(tmp.path().to_path_buf());
        for bad in ["../x.lua", "a/b.lua", "a\\b.lua", "", "  "] {
            assert!(
                matches!(auto.add(bad, "x"), Err(AutoExecError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
            assert!(!auto.contains(bad));
        }
    }
}
