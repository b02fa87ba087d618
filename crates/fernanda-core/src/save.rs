//! Save pipeline primitives shared by Notepad and Notebook.

use std::fs;
use std::io;
use std::path::Path;

use log::warn;

use crate::files::FileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Success,
    NoOp,
    Failure,
}

/// Write to a sibling file, then rename over the target, so a partial write
/// never leaves a half-overwritten file. Where rename-based replace isn't
/// available the write degrades to truncate-then-write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let Some(file_name) = path.file_name() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "save target has no file name",
        ));
    };

    let sibling = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&sibling, bytes)?;

    match fs::rename(&sibling, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(
                "atomic rename to {} failed ({e}), degrading to direct write",
                path.display()
            );
            let _ = fs::remove_file(&sibling);
            fs::write(path, bytes)
        }
    }
}

/// Result of flushing a batch of modified models; failures are collected,
/// never short-circuited, so one bad file doesn't block the rest.
#[derive(Debug, Default)]
pub struct MultiSaveResult {
    pub failed: Vec<FileId>,
}

impl MultiSaveResult {
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }
}
