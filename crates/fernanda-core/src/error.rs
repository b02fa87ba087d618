use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Engine-level failures. Fatal variants abort the affected notebook only;
/// save-time variants are collected and reported without mutating state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("working directory ({0}) doesn't exist")]
    WorkingDirMissing(PathBuf),

    #[error("archive file ({0}) doesn't exist")]
    ArchiveMissing(PathBuf),

    #[error("archive operation failed on {path}: {detail}")]
    Archive { path: PathBuf, detail: String },

    #[error("failed to parse {path}: {detail}")]
    ManifestParse { path: PathBuf, detail: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}
