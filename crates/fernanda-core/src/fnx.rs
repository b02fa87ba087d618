//! `.fnx` file format utilities: archive and working directory operations.
//!
//! A notebook archive is a standard 7zip file containing `Manifest.xml`, a
//! `content/` directory with one file per manifest file node, and optionally
//! a per-notebook `Settings.ini`.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{error, info};
use walkdir::WalkDir;

use crate::error::EngineError;
use crate::manifest::dom::Dom;
use crate::manifest::xml;

pub const EXT: &str = "fnx";
pub const MANIFEST_FILE_NAME: &str = "Manifest.xml";
pub const CONTENT_DIR_NAME: &str = "content";

/// 7zip header signature.
const SEVEN_ZIP_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Path extension is `.fnx` AND the header magic identifies a 7zip archive.
pub fn is_fnx_file(path: &Path) -> bool {
    if path.extension().map_or(true, |ext| ext != EXT) {
        return false;
    }

    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };

    let mut magic = [0u8; 6];
    if file.read_exact(&mut magic).is_err() {
        return false;
    }

    magic == SEVEN_ZIP_MAGIC
}

/// Initialize a brand-new notebook layout: `content/` plus a minimal
/// manifest (`<fnx version="1.0"><notebook/><trash/></fnx>`).
pub fn make_new_working_dir(working_dir: &Path) -> Result<(), EngineError> {
    fs::create_dir_all(working_dir.join(CONTENT_DIR_NAME))?;
    xml::write_manifest(working_dir, &Dom::new_minimal())
}

/// Decompress the archive into `working_dir`.
///
/// `working_dir` must already exist. On failure the working directory is in
/// a defined but possibly partial state and the error is fatal for the open.
pub fn extract(archive_path: &Path, working_dir: &Path) -> Result<(), EngineError> {
    info!(
        "extracting archive {} to {}",
        archive_path.display(),
        working_dir.display()
    );

    if !archive_path.exists() {
        return Err(EngineError::ArchiveMissing(archive_path.to_path_buf()));
    }

    if !working_dir.exists() {
        return Err(EngineError::WorkingDirMissing(working_dir.to_path_buf()));
    }

    sevenz_rust::decompress_file(archive_path, working_dir).map_err(|e| {
        error!("fnx archive extraction failed: {e:?}");
        EngineError::Archive {
            path: archive_path.to_path_buf(),
            detail: format!("{e:?}"),
        }
    })
}

/// Compress every entry under `working_dir` into a new archive at
/// `archive_path`, overwriting any existing file there.
///
/// The working directory is left untouched either way, so a failed save can
/// be retried.
pub fn compress(archive_path: &Path, working_dir: &Path) -> Result<(), EngineError> {
    if !working_dir.exists() {
        return Err(EngineError::WorkingDirMissing(working_dir.to_path_buf()));
    }

    let entries = WalkDir::new(working_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .count();

    info!(
        "compressing {} entries from {} to {}",
        entries,
        working_dir.display(),
        archive_path.display()
    );

    if archive_path.exists() {
        fs::remove_file(archive_path)?;
    }

    sevenz_rust::compress_to_path(working_dir, archive_path).map_err(|e| {
        error!("fnx archive compression failed: {e:?}");
        EngineError::Archive {
            path: archive_path.to_path_buf(),
            detail: format!("{e:?}"),
        }
    })
}

/// The uuid of a content file is its stem (`content/<uuid><extension>`).
pub fn uuid_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Relative content path for a uuid + extension pair.
pub fn content_rel_path(uuid: &str, extension: &str) -> PathBuf {
    PathBuf::from(CONTENT_DIR_NAME).join(format!("{uuid}{extension}"))
}
