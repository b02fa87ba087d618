//! Identity and labeling record shared by every file model.

use std::path::{Path, PathBuf};

pub const DEFAULT_TITLE: &str = "Untitled";

/// Current absolute path, on-disk flag, and an optional title override for
/// files whose on-disk name would read poorly (notebook uuids, unsaved
/// drafts).
#[derive(Debug, Clone, Default)]
pub struct FileMeta {
    path: Option<PathBuf>,
    on_disk: bool,
    title_override: Option<String>,
}

impl FileMeta {
    pub fn on_disk(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            on_disk: true,
            title_override: None,
        }
    }

    pub fn off_disk() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_on_disk(&self) -> bool {
        self.on_disk
    }

    /// Save-as landed: record the new path and drop any override so the
    /// title tracks the new file name.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
        self.on_disk = true;
        self.title_override = None;
    }

    pub fn title_override(&self) -> Option<&str> {
        self.title_override.as_deref()
    }

    pub fn set_title_override(&mut self, title: &str) {
        self.title_override = Some(title.to_string());
    }

    pub fn clear_title_override(&mut self) {
        self.title_override = None;
    }

    /// Override, else file stem, else the default.
    pub fn title(&self) -> String {
        if let Some(title) = &self.title_override {
            return title.clone();
        }

        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    /// Full path for on-disk files, title otherwise.
    pub fn tool_tip(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => self.title(),
        }
    }
}
