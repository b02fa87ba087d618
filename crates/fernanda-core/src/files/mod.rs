//! Path-keyed registry of open file models.
//!
//! One model exists per path currently referenced by any open view. The
//! registry owns every model; views hold handles. Reference counting is the
//! view service's job. The registry itself keeps no count and destroys
//! models only when told to.

pub mod meta;
pub mod model;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{error, info};

use crate::bus::{Bus, BusEvent};
use crate::save::{write_atomic, SaveOutcome};
use crate::text::TextFileModel;

pub use meta::FileMeta;
pub use model::{FileModel, NoOpFileModel};

/// Stable handle of an open file model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

pub struct FileService {
    bus: Rc<Bus>,
    models: HashMap<FileId, Box<dyn FileModel>>,
    by_path: HashMap<PathBuf, FileId>,
    next_id: u64,
}

impl FileService {
    pub fn new(bus: Rc<Bus>) -> Self {
        Self {
            bus,
            models: HashMap::new(),
            by_path: HashMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, model: Box<dyn FileModel>) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;

        if let Some(path) = model.meta().path() {
            self.by_path.insert(path.to_path_buf(), id);
        }

        self.models.insert(id, model);
        self.bus.emit(BusEvent::FileReadied(id));
        id
    }

    /// Resolve or create the model for `path`. Existing models are returned
    /// as-is (the title hint still applies). Unsupported types get a
    /// read-only stand-in.
    pub fn open(&mut self, path: &Path, title_hint: Option<&str>) -> Option<FileId> {
        if let Some(&id) = self.by_path.get(path) {
            if let (Some(model), Some(title)) = (self.models.get_mut(&id), title_hint) {
                model.meta_mut().set_title_override(title);
            }
            return Some(id);
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("failed to read {}: {e}", path.display());
                return None;
            }
        };

        let meta = FileMeta::on_disk(path.to_path_buf());
        let is_text = path
            .extension()
            .map_or(true, |ext| TEXT_EXTENSIONS.iter().any(|t| ext == *t));

        let mut model: Box<dyn FileModel> = if is_text {
            let mut text = TextFileModel::new(meta);
            text.set_data(&bytes);
            text.set_modified(false);
            Box::new(text)
        } else {
            Box::new(NoOpFileModel::new(meta, bytes))
        };

        if let Some(title) = title_hint {
            model.meta_mut().set_title_override(title);
        }

        info!("file model readied for {}", path.display());
        Some(self.insert(model))
    }

    /// In-memory text model with no path; backs a fresh untitled tab.
    pub fn open_off_disk_txt(&mut self) -> FileId {
        self.insert(Box::new(TextFileModel::new(FileMeta::off_disk())))
    }

    pub fn model(&self, id: FileId) -> Option<&dyn FileModel> {
        self.models.get(&id).map(|m| m.as_ref())
    }

    pub fn model_mut(&mut self, id: FileId) -> Option<&mut (dyn FileModel + 'static)> {
        self.models.get_mut(&id).map(|m| m.as_mut())
    }

    pub fn text(&self, id: FileId) -> Option<&TextFileModel> {
        self.model(id).and_then(FileModel::as_text)
    }

    pub fn text_mut(&mut self, id: FileId) -> Option<&mut TextFileModel> {
        self.model_mut(id).and_then(FileModel::as_text_mut)
    }

    pub fn ids(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self.models.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn path_of(&self, id: FileId) -> Option<PathBuf> {
        self.model(id)?.meta().path().map(Path::to_path_buf)
    }

    /// Membership query; no side effects.
    pub fn models_for(&self, paths: &[PathBuf]) -> HashSet<FileId> {
        paths
            .iter()
            .filter_map(|p| self.by_path.get(p).copied())
            .collect()
    }

    /// Synchronous destruction; callers guarantee no views still reference
    /// these models.
    pub fn delete_models(&mut self, ids: &HashSet<FileId>) {
        for id in ids {
            self.models.remove(id);
        }
        self.by_path.retain(|_, id| !ids.contains(id));
    }

    /// Display title for files whose on-disk name is a uuid.
    pub fn set_path_title_override(&mut self, path: &Path, title: &str) {
        let Some(&id) = self.by_path.get(path) else {
            return;
        };

        if let Some(model) = self.models.get_mut(&id) {
            model.meta_mut().set_title_override(title);
            self.bus.emit(BusEvent::FileMetaChanged(id));
        }
    }

    // ------------------------------------------------------------------------
    // Single-file save pipeline
    // ------------------------------------------------------------------------

    /// Flush one model to its own path. Unmodified models are a no-op; a
    /// failed write leaves all state untouched.
    pub fn save(&mut self, id: FileId) -> SaveOutcome {
        let Some(model) = self.models.get_mut(&id) else {
            return SaveOutcome::Failure;
        };

        if !model.supports_modification() || !model.is_modified() {
            return SaveOutcome::NoOp;
        }

        let Some(path) = model.meta().path().map(Path::to_path_buf) else {
            return SaveOutcome::Failure;
        };

        match write_atomic(&path, &model.data()) {
            Ok(()) => {
                model.set_modified(false);
                self.bus
                    .emit(BusEvent::FileModelModificationChanged(id, false));
                SaveOutcome::Success
            }
            Err(e) => {
                error!("failed to save {}: {e}", path.display());
                SaveOutcome::Failure
            }
        }
    }

    /// Save under a new path, re-keying the registry and updating meta.
    pub fn save_as(&mut self, id: FileId, new_path: &Path) -> SaveOutcome {
        let Some(model) = self.models.get_mut(&id) else {
            return SaveOutcome::Failure;
        };

        if let Err(e) = write_atomic(new_path, &model.data()) {
            error!("failed to save {}: {e}", new_path.display());
            return SaveOutcome::Failure;
        }

        let old_path = model.meta().path().map(Path::to_path_buf);
        model.meta_mut().set_path(new_path.to_path_buf());
        model.set_modified(false);

        if let Some(old) = old_path {
            self.by_path.remove(&old);
        }
        self.by_path.insert(new_path.to_path_buf(), id);

        self.bus.emit(BusEvent::FileMetaChanged(id));
        self.bus
            .emit(BusEvent::FileModelModificationChanged(id, false));
        SaveOutcome::Success
    }
}
