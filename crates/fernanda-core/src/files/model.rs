//! File model contract plus the read-only fallback for unsupported types.

use crate::files::meta::FileMeta;
use crate::text::TextFileModel;

pub trait FileModel {
    fn meta(&self) -> &FileMeta;
    fn meta_mut(&mut self) -> &mut FileMeta;

    /// Content bytes. `set_data(x); data()` is byte-for-byte identity for
    /// models that support mutation.
    fn data(&self) -> Vec<u8>;
    fn set_data(&mut self, data: &[u8]);

    fn preferred_extension(&self) -> &'static str;

    fn supports_modification(&self) -> bool {
        false
    }

    fn is_modified(&self) -> bool {
        false
    }

    fn set_modified(&mut self, _modified: bool) {}

    fn has_undo(&self) -> bool {
        false
    }

    fn has_redo(&self) -> bool {
        false
    }

    fn as_text(&self) -> Option<&TextFileModel> {
        None
    }

    fn as_text_mut(&mut self) -> Option<&mut TextFileModel> {
        None
    }
}

/// Stand-in for file types the engine can display but not edit.
pub struct NoOpFileModel {
    meta: FileMeta,
    bytes: Vec<u8>,
}

impl NoOpFileModel {
    pub fn new(meta: FileMeta, bytes: Vec<u8>) -> Self {
        Self { meta, bytes }
    }
}

impl FileModel for NoOpFileModel {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut FileMeta {
        &mut self.meta
    }

    fn data(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn set_data(&mut self, _data: &[u8]) {}

    fn preferred_extension(&self) -> &'static str {
        ""
    }
}
