//! Per-notebook scratch directory.
//!
//! The working directory lives under the application temp root, named after
//! the archive file with a randomized suffix. The name is fixed for the
//! notebook's lifetime (Save-As changes the archive path, never the working
//! directory), and the whole tree is removed when the notebook is closed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{info, warn};
use uuid::Uuid;

use crate::fnx;

pub struct WorkingDir {
    path: PathBuf,
}

impl WorkingDir {
    /// Create `<temp_root>/<archive_file_name>~<suffix>` with a fresh
    /// random suffix.
    pub fn create(temp_root: &Path, archive_file_name: &str) -> io::Result<Self> {
        fs::create_dir_all(temp_root)?;

        // Collisions are practically impossible, but retry a few times
        // rather than clobbering an existing notebook's scratch tree.
        for _ in 0..16 {
            let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_string();
            let path = temp_root.join(format!("{archive_file_name}~{suffix}"));

            match fs::create_dir(&path) {
                Ok(()) => {
                    info!("working directory created at {}", path.display());
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find a free working directory name",
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(fnx::MANIFEST_FILE_NAME)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.path.join(fnx::CONTENT_DIR_NAME)
    }

    /// Absolute path of the content file backing a manifest file node.
    pub fn content_file(&self, uuid: &str, extension: &str) -> PathBuf {
        self.path.join(fnx::content_rel_path(uuid, extension))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.path.join("Settings.ini")
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(
                "failed to remove working directory {}: {e}",
                self.path.display()
            );
        }
    }
}

/// Remove working directories left behind by abnormal terminations.
///
/// Only entries carrying the `~` suffix marker and older than `max_age` are
/// touched.
pub fn sweep_stale(temp_root: &Path, max_age: Duration) {
    let Ok(entries) = fs::read_dir(temp_root) else {
        return;
    };

    let now = SystemTime::now();

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains('~') {
            continue;
        }

        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| now.duration_since(mtime).ok())
            .is_some_and(|age| age >= max_age);

        if stale {
            info!("sweeping stale working directory {}", path.display());
            if let Err(e) = fs::remove_dir_all(&path) {
                warn!("failed to sweep {}: {e}", path.display());
            }
        }
    }
}
