//! Logical tree of a notebook: the parsed manifest DOM plus every mutation
//! the UI can request (create, import, rename, trash, restore, remove), a
//! tree-model adapter for view binding, and snapshot-based dirty tracking.
//!
//! Identity is the `uuid` attribute. Positions are never used across
//! sessions; renaming changes display only.

pub mod dom;
pub mod xml;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::fnx;

use dom::{Dom, NodeId};

pub const DEFAULT_FILE_NAME: &str = "Untitled";
pub const DEFAULT_FOLDER_NAME: &str = "New folder";
pub const DEFAULT_EXT: &str = ".txt";

/// Snapshot of a file node: enough to locate and label its content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub uuid: String,
    pub extension: String,
    /// Path relative to the working directory (`content/<uuid><extension>`).
    pub rel_path: PathBuf,
}

pub struct ManifestModel {
    dom: Dom,
    notebook: NodeId,
    trash: NodeId,
    snapshot: String,
}

fn make_uuid() -> String {
    // Version 4, hyphenated, no braces.
    Uuid::new_v4().to_string()
}

impl ManifestModel {
    /// Parse `Manifest.xml` from the working directory and capture the
    /// baseline snapshot.
    pub fn load(working_dir: &Path) -> Result<Self, EngineError> {
        let dom = xml::load_manifest(working_dir)?;
        Self::from_dom(dom, working_dir)
    }

    fn from_dom(dom: Dom, working_dir: &Path) -> Result<Self, EngineError> {
        let root = dom.root();
        let manifest_path = working_dir.join(fnx::MANIFEST_FILE_NAME);

        if dom.tag(root) != dom::DOCUMENT_TAG {
            return Err(EngineError::ManifestParse {
                path: manifest_path,
                detail: format!("document element is <{}>, expected <fnx>", dom.tag(root)),
            });
        }

        let (Some(notebook), Some(trash)) = (
            dom.find_child_by_tag(root, dom::NOTEBOOK_TAG),
            dom.find_child_by_tag(root, dom::TRASH_TAG),
        ) else {
            return Err(EngineError::ManifestParse {
                path: manifest_path,
                detail: "missing <notebook> or <trash> element".to_string(),
            });
        };

        let snapshot = xml::serialize(&dom);
        info!("manifest ready ({} bytes)", snapshot.len());

        Ok(Self {
            dom,
            notebook,
            trash,
            snapshot,
        })
    }

    // ------------------------------------------------------------------------
    // Tree-model adapter
    // ------------------------------------------------------------------------

    /// An absent index maps to `<fnx>`, the true DOM root. Mutations
    /// therefore substitute `<notebook>` when the caller means "top level";
    /// see [`Self::attach_parent`].
    fn resolve(&self, index: Option<NodeId>) -> NodeId {
        index.unwrap_or_else(|| self.dom.root())
    }

    /// Parent under which new or restored items land for a caller-supplied
    /// index. Never the document element: items must not become siblings of
    /// `<notebook>` and `<trash>`.
    fn attach_parent(&self, index: Option<NodeId>) -> NodeId {
        match index {
            Some(id) if id != self.dom.root() => id,
            _ => self.notebook,
        }
    }

    pub fn notebook_index(&self) -> NodeId {
        self.notebook
    }

    pub fn trash_index(&self) -> NodeId {
        self.trash
    }

    pub fn index(&self, row: usize, parent: Option<NodeId>) -> Option<NodeId> {
        self.dom.nth_child(self.resolve(parent), row)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.dom.parent(id)
    }

    pub fn row_count(&self, parent: Option<NodeId>) -> usize {
        self.dom.child_count(self.resolve(parent))
    }

    pub fn row_of(&self, id: NodeId) -> usize {
        self.dom.row_of(id)
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.dom.child_count(id) > 0
    }

    pub fn has_trash(&self) -> bool {
        self.dom.child_count(self.trash) > 0
    }

    pub fn is_file(&self, id: NodeId) -> bool {
        self.dom.tag(id) == dom::FILE_TAG
    }

    pub fn is_virtual_folder(&self, id: NodeId) -> bool {
        self.dom.tag(id) == dom::VFOLDER_TAG
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.dom.attr(id, dom::NAME_ATTR).unwrap_or_default()
    }

    pub fn uuid(&self, id: NodeId) -> &str {
        self.dom.attr(id, dom::UUID_ATTR).unwrap_or_default()
    }

    pub fn extension(&self, id: NodeId) -> &str {
        self.dom.attr(id, dom::EXT_ATTR).unwrap_or_default()
    }

    pub fn is_edited(&self, id: NodeId) -> bool {
        self.dom.has_attr(id, dom::EDITED_ATTR)
    }

    pub fn restore_parent_uuid(&self, id: NodeId) -> Option<&str> {
        self.dom.attr(id, dom::RESTORE_PARENT_UUID_ATTR)
    }

    pub fn is_in_trash(&self, id: NodeId) -> bool {
        self.dom.is_ancestor(self.trash, id)
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<NodeId> {
        if uuid.is_empty() {
            return None;
        }
        self.dom.find_by_attr(dom::UUID_ATTR, uuid)
    }

    pub fn file_info_at(&self, id: NodeId) -> Option<FileInfo> {
        if !self.is_file(id) {
            return None;
        }

        let uuid = self.uuid(id).to_string();
        let extension = self.extension(id).to_string();
        let rel_path = fnx::content_rel_path(&uuid, &extension);

        Some(FileInfo {
            name: self.name(id).to_string(),
            uuid,
            extension,
            rel_path,
        })
    }

    /// Every file node in the subtree rooted at `id` (inclusive), document
    /// order. Non-file ancestors (virtual folders, `<trash>` itself) are
    /// skipped.
    pub fn file_infos_at(&self, id: NodeId) -> Vec<FileInfo> {
        self.dom
            .descendants(id)
            .into_iter()
            .filter_map(|node| self.file_info_at(node))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Create an empty `content/<uuid>.txt` and the matching `<file>` node
    /// under `parent`. Disk failure leaves the DOM unchanged.
    pub fn add_new_text_file(
        &mut self,
        working_dir: &Path,
        parent: Option<NodeId>,
    ) -> Result<FileInfo, EngineError> {
        if !working_dir.exists() {
            return Err(EngineError::WorkingDirMissing(working_dir.to_path_buf()));
        }

        let uuid = make_uuid();
        let rel_path = fnx::content_rel_path(&uuid, DEFAULT_EXT);

        if let Err(e) = fs::write(working_dir.join(&rel_path), []) {
            warn!("failed to create text file at {}: {e}", rel_path.display());
            return Err(e.into());
        }

        let node = self.dom.create_element(dom::FILE_TAG);
        self.dom.set_attr(node, dom::NAME_ATTR, DEFAULT_FILE_NAME);
        self.dom.set_attr(node, dom::UUID_ATTR, &uuid);
        self.dom.set_attr(node, dom::EXT_ATTR, DEFAULT_EXT);
        let parent = self.attach_parent(parent);
        self.dom.append_child(parent, node);

        Ok(FileInfo {
            name: DEFAULT_FILE_NAME.to_string(),
            uuid,
            extension: DEFAULT_EXT.to_string(),
            rel_path,
        })
    }

    /// Copy each source file into `content/` and add matching nodes named
    /// after the source stems. A file that fails to copy is skipped.
    pub fn import_text_files(
        &mut self,
        working_dir: &Path,
        fs_paths: &[PathBuf],
        parent: Option<NodeId>,
    ) -> Vec<FileInfo> {
        if !working_dir.exists() {
            warn!("working directory ({}) doesn't exist", working_dir.display());
            return Vec::new();
        }

        let parent = self.attach_parent(parent);
        let mut infos = Vec::new();

        for fs_path in fs_paths {
            if !fs_path.is_file() {
                warn!("skipping import of non-file {}", fs_path.display());
                continue;
            }

            let uuid = make_uuid();
            let rel_path = fnx::content_rel_path(&uuid, DEFAULT_EXT);

            if let Err(e) = fs::copy(fs_path, working_dir.join(&rel_path)) {
                warn!("failed to copy {} into notebook: {e}", fs_path.display());
                continue;
            }

            let name = fs_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());

            let node = self.dom.create_element(dom::FILE_TAG);
            self.dom.set_attr(node, dom::NAME_ATTR, &name);
            self.dom.set_attr(node, dom::UUID_ATTR, &uuid);
            self.dom.set_attr(node, dom::EXT_ATTR, DEFAULT_EXT);
            self.dom.append_child(parent, node);

            infos.push(FileInfo {
                name,
                uuid,
                extension: DEFAULT_EXT.to_string(),
                rel_path,
            });
        }

        infos
    }

    pub fn add_new_virtual_folder(&mut self, parent: Option<NodeId>) -> NodeId {
        let node = self.dom.create_element(dom::VFOLDER_TAG);
        self.dom.set_attr(node, dom::NAME_ATTR, DEFAULT_FOLDER_NAME);
        self.dom.set_attr(node, dom::UUID_ATTR, &make_uuid());
        let parent = self.attach_parent(parent);
        self.dom.append_child(parent, node);
        node
    }

    /// Change the display name. Empty names are a silent no-op. Returns the
    /// file info when a file node was renamed so consumers can retitle open
    /// views; `uuid` is untouched.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Option<FileInfo> {
        if new_name.is_empty() || !self.dom.has_attr(id, dom::NAME_ATTR) {
            return None;
        }

        self.dom.set_attr(id, dom::NAME_ATTR, new_name);
        self.file_info_at(id)
    }

    /// Move the subtree into `<trash>`, recording the current parent's uuid
    /// on the subtree root for a later restore.
    pub fn move_to_trash(&mut self, id: NodeId) {
        if id == self.dom.root() || id == self.notebook || id == self.trash {
            return;
        }

        let restore_uuid = self
            .dom
            .parent(id)
            .and_then(|p| self.dom.attr(p, dom::UUID_ATTR))
            .unwrap_or_default()
            .to_string();

        self.dom.append_child(self.trash, id);

        if restore_uuid.is_empty() {
            self.dom.remove_attr(id, dom::RESTORE_PARENT_UUID_ATTR);
        } else {
            self.dom
                .set_attr(id, dom::RESTORE_PARENT_UUID_ATTR, &restore_uuid);
        }
    }

    /// Move a trashed subtree back to its recorded parent, or to the
    /// `<notebook>` root when that parent is gone (or itself trashed). The
    /// restore uuid is cleared either way.
    pub fn move_to_notebook(&mut self, id: NodeId) {
        if id == self.dom.root() || id == self.notebook || id == self.trash {
            return;
        }

        let target = self
            .restore_parent_uuid(id)
            .map(str::to_string)
            .and_then(|uuid| self.find_by_uuid(&uuid))
            .filter(|&parent| !self.is_in_trash(parent) && parent != id)
            .unwrap_or(self.notebook);

        self.dom.append_child(target, id);
        self.dom.remove_attr(id, dom::RESTORE_PARENT_UUID_ATTR);
    }

    /// Detach the subtree and unlink its content files. A file that fails to
    /// unlink is logged; the DOM mutation still applies.
    pub fn remove(&mut self, id: NodeId, working_dir: &Path) {
        if id == self.dom.root() || id == self.notebook || id == self.trash {
            return;
        }

        for info in self.file_infos_at(id) {
            let path = working_dir.join(&info.rel_path);
            if let Err(e) = fs::remove_file(&path) {
                warn!("failed to delete {} from disk: {e}", path.display());
            }
        }

        self.dom.detach(id);
    }

    /// Remove every child of `<trash>`.
    pub fn clear_trash(&mut self, working_dir: &Path) {
        let children: Vec<NodeId> = self.dom.children(self.trash).to_vec();
        for child in children {
            self.remove(child, working_dir);
        }
    }

    /// Set or clear the `edited` marker on the file node with this uuid.
    /// The attribute is itself the boolean: present (empty value) or absent.
    pub fn set_file_edited(&mut self, uuid: &str, edited: bool) {
        let Some(id) = self.find_by_uuid(uuid) else {
            return;
        };

        if !self.is_file(id) {
            return;
        }

        if edited {
            self.dom.set_attr(id, dom::EDITED_ATTR, "");
        } else {
            self.dom.remove_attr(id, dom::EDITED_ATTR);
        }
    }

    // ------------------------------------------------------------------------
    // Persistence & dirty tracking
    // ------------------------------------------------------------------------

    pub fn write(&self, working_dir: &Path) -> Result<(), EngineError> {
        xml::write_manifest(working_dir, &self.dom)
    }

    /// True iff the current DOM differs from the last snapshot. The
    /// "never-saved notebook is always dirty" clause lives on the Notebook,
    /// which owns the archive path.
    pub fn is_modified(&self) -> bool {
        xml::serialize(&self.dom) != self.snapshot
    }

    /// Capture the current DOM as the dirty-tracking baseline.
    pub fn reset_snapshot(&mut self) {
        self.snapshot = xml::serialize(&self.dom);
    }

    /// Cross-check manifest file nodes against `content/`. Returns one
    /// message per discrepancy; an empty list means invariants hold.
    pub fn verify(&self, working_dir: &Path) -> Vec<String> {
        let mut problems = Vec::new();
        let mut known = HashSet::new();

        for info in self.file_infos_at(self.dom.root()) {
            known.insert(format!("{}{}", info.uuid, info.extension));
            let path = working_dir.join(&info.rel_path);
            if !path.is_file() {
                problems.push(format!(
                    "file node \"{}\" ({}) has no content file",
                    info.name, info.uuid
                ));
            }
        }

        let content_dir = working_dir.join(fnx::CONTENT_DIR_NAME);
        if let Ok(entries) = fs::read_dir(content_dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !known.contains(&name) {
                    problems.push(format!("content file {name} has no manifest node"));
                }
            }
        }

        problems
    }
}
