//! Removal of local raw grid artifacts.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const RAW_PREFIX: &str = "grib_";
const RAW_SUFFIXES: [&str; 3] = [".grib2", ".idx", ".partial"];

/// True for files the downloader or decoder may leave in the work directory.
pub fn is_raw_artifact(name: &str) -> bool {
    name.starts_with(RAW_PREFIX) && RAW_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Sweeps raw grid artifacts from a directory when dropped.
///
/// Held for the duration of a pipeline run so that every exit path, including
/// early returns on error, leaves the work directory free of raw files.
/// Removal failures are logged and never propagated.
pub struct LocalArtifactGuard {
    dir: PathBuf,
}

impl LocalArtifactGuard {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove every raw artifact now. Returns the number of files removed.
    pub fn sweep(&self) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cannot list work directory");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_raw_artifact(name) {
                continue;
            }

            let path = entry.path();
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed local artifact");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove local artifact"),
            }
        }
        removed
    }
}

impl Drop for LocalArtifactGuard {
    fn drop(&mut self) {
        let removed = self.sweep();
        if removed > 0 {
            debug!(dir = %self.dir.display(), removed, "Local artifacts cleaned up");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_patterns() {
        assert!(is_raw_artifact("grib_20240101_00_0p25_0.grib2"));
        assert!(is_raw_artifact("grib_20240101_00_0p25_0.grib2.5b7e6.idx"));
        assert!(is_raw_artifact("grib_20240101_00_0p25_0.grib2.partial"));
        assert!(!is_raw_artifact("20240101_00_000.parquet"));
        assert!(!is_raw_artifact("notes.grib2"));
        assert!(!is_raw_artifact("grib_readme.txt"));
    }

    #[test]
    fn test_drop_removes_only_raw_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "grib_a.grib2",
            "grib_a.grib2.idx",
            "grib_b.grib2.partial",
            "keep.parquet",
            "keep.txt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        {
            let _guard = LocalArtifactGuard::new(dir.path());
        }

        let mut left: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["keep.parquet", "keep.txt"]);
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let guard = LocalArtifactGuard::new(dir.path().join("does-not-exist"));
        assert_eq!(guard.sweep(), 0);
    }
}
