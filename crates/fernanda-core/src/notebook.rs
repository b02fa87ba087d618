//! Archive-backed workspace.
//!
//! Owns the archive path, the working directory, and the manifest. The
//! working directory name is fixed for the notebook's lifetime; Save-As
//! moves only the archive path. Every manifest mutation is persisted to the
//! working directory immediately, so `Manifest.xml` on disk always matches
//! the DOM; the archive itself changes only on save.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{error, info, warn};

use crate::bus::{BarColor, Bus, BusEvent};
use crate::error::EngineError;
use crate::files::{FileId, FileService};
use crate::fnx;
use crate::manifest::dom::NodeId;
use crate::manifest::ManifestModel;
use crate::save::{MultiSaveResult, SaveOutcome};
use crate::settings::SettingsService;
use crate::views::{PurgeModel, ViewService, WindowId};
use crate::workspace::{Prompter, SaveChoice, Workspace};

pub struct Notebook {
    fnx_path: PathBuf,
    workdir: crate::workdir::WorkingDir,
    manifest: ManifestModel,
    files: FileService,
    views: ViewService,
    bus: Rc<Bus>,
    prompter: Box<dyn Prompter>,
    pending_ui: Vec<BusEvent>,
}

impl Notebook {
    /// Open or create the notebook at `fnx_path`. A missing archive means a
    /// brand-new notebook: the working directory gets the fresh template
    /// and the notebook stays dirty until its first save.
    pub fn open(
        fnx_path: PathBuf,
        temp_root: &Path,
        prompter: Box<dyn Prompter>,
    ) -> Result<Self, EngineError> {
        let file_name = fnx_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled.fnx".to_string());

        let workdir = crate::workdir::WorkingDir::create(temp_root, &file_name)?;

        if fnx_path.exists() {
            fnx::extract(&fnx_path, workdir.path())?;
        } else {
            fnx::make_new_working_dir(workdir.path())?;
        }

        // The per-notebook settings live inside the archive; the redirect
        // must come after extraction.
        let mut settings = SettingsService::ephemeral(&file_name);
        settings.set_override_config_path(workdir.settings_path());
        let bus = Bus::new(settings);

        let manifest = ManifestModel::load(workdir.path())?;
        for problem in manifest.verify(workdir.path()) {
            warn!("{file_name}: {problem}");
        }

        let files = FileService::new(Rc::clone(&bus));
        let mut views = ViewService::new(Rc::clone(&bus));
        views.create_window();
        views.apply_editor_font();

        bus.emit(BusEvent::SubtitleChanged(file_name));

        let mut notebook = Self {
            fnx_path,
            workdir,
            manifest,
            files,
            views,
            bus,
            prompter,
            pending_ui: Vec::new(),
        };

        notebook.update_flags();
        notebook.pump();
        Ok(notebook)
    }

    pub fn fnx_path(&self) -> &Path {
        &self.fnx_path
    }

    pub fn working_dir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn manifest(&self) -> &ManifestModel {
        &self.manifest
    }

    /// A never-saved notebook is always dirty.
    pub fn is_modified(&self) -> bool {
        !self.fnx_path.exists() || self.manifest.is_modified()
    }

    /// UI events accumulated since the last drain.
    pub fn take_ui_events(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.pending_ui)
    }

    // ------------------------------------------------------------------------
    // Bus pumping
    // ------------------------------------------------------------------------

    /// Drain the bus, folding model modification changes into the manifest's
    /// `edited` markers. Handling may emit again, so loop until quiet.
    pub fn pump(&mut self) {
        loop {
            let events = self.bus.take_events();
            if events.is_empty() {
                return;
            }

            for event in events {
                if let BusEvent::FileModelModificationChanged(id, modified) = &event {
                    self.on_model_modification_changed(*id, *modified);
                }
                if let BusEvent::SettingChanged(_) = &event {
                    self.views.apply_editor_font();
                }
                self.pending_ui.push(event);
            }
        }
    }

    fn on_model_modification_changed(&mut self, id: FileId, modified: bool) {
        // Notebook file models always sit on a working-directory path.
        let Some(path) = self.files.path_of(id) else {
            return;
        };

        self.manifest.set_file_edited(&fnx::uuid_of(&path), modified);

        if let Err(e) = self.manifest.write(self.workdir.path()) {
            error!("failed to persist manifest: {e}");
        }
        self.update_flags();
    }

    fn update_flags(&mut self) {
        self.bus.emit(BusEvent::FlaggedChanged(self.is_modified()));
    }

    /// Manifest mutated: persist it and refresh window chrome.
    fn after_dom_change(&mut self) {
        if let Err(e) = self.manifest.write(self.workdir.path()) {
            error!("failed to persist manifest: {e}");
        }

        self.update_flags();
        self.pump();
    }

    // ------------------------------------------------------------------------
    // Tree operations
    // ------------------------------------------------------------------------

    /// New empty file under `index` (or the notebook root), opened in a tab.
    pub fn new_file(&mut self, window: WindowId, index: Option<NodeId>) -> Option<FileId> {
        let info = match self.manifest.add_new_text_file(self.workdir.path(), index) {
            Ok(info) => info,
            Err(e) => {
                warn!("new file creation failed: {e}");
                return None;
            }
        };

        self.after_dom_change();

        let path = self.workdir.path().join(&info.rel_path);
        let id = self
            .views
            .open_file_path_in(&mut self.files, window, &path, Some(&info.name));
        self.pump();
        id
    }

    pub fn new_virtual_folder(&mut self, index: Option<NodeId>) -> NodeId {
        let node = self.manifest.add_new_virtual_folder(index);
        self.after_dom_change();
        node
    }

    /// Copy external files into the notebook and open them.
    pub fn import_files(
        &mut self,
        window: WindowId,
        fs_paths: &[PathBuf],
        index: Option<NodeId>,
    ) -> Vec<FileId> {
        let infos = self
            .manifest
            .import_text_files(self.workdir.path(), fs_paths, index);

        if infos.is_empty() {
            return Vec::new();
        }

        self.after_dom_change();

        let mut ids = Vec::new();
        for info in infos {
            let path = self.workdir.path().join(&info.rel_path);
            if let Some(id) =
                self.views
                    .open_file_path_in(&mut self.files, window, &path, Some(&info.name))
            {
                ids.push(id);
            }
        }

        self.pump();
        ids
    }

    /// Double-click on a tree item: open file nodes, ignore folders.
    pub fn open_index_in(&mut self, window: WindowId, index: NodeId) -> Option<FileId> {
        let info = self.manifest.file_info_at(index)?;
        let path = self.workdir.path().join(&info.rel_path);
        let id = self
            .views
            .open_file_path_in(&mut self.files, window, &path, Some(&info.name));
        self.pump();
        id
    }

    /// Display rename; uuid and content path are untouched. Open tabs pick
    /// up the new title through the registry override.
    pub fn rename(&mut self, index: NodeId, new_name: &str) {
        if new_name.is_empty() {
            return;
        }

        if let Some(info) = self.manifest.rename(index, new_name) {
            let path = self.workdir.path().join(&info.rel_path);
            self.files.set_path_title_override(&path, &info.name);
        }

        self.after_dom_change();
    }

    pub fn move_to_trash(&mut self, index: NodeId) {
        self.manifest.move_to_trash(index);
        self.after_dom_change();
    }

    pub fn restore_from_trash(&mut self, index: NodeId) {
        self.manifest.move_to_notebook(index);
        self.after_dom_change();
    }

    /// Permanent deletion: confirm, close every affected view, destroy the
    /// models, then detach nodes and unlink content files.
    pub fn delete_trash_item(&mut self, index: NodeId) {
        if self.confirm_and_release(index) {
            self.manifest.remove(index, self.workdir.path());
            self.after_dom_change();
        }
    }

    pub fn empty_trash(&mut self) {
        // The trash element itself isn't a file, so it's skipped.
        if self.confirm_and_release(self.manifest.trash_index()) {
            self.manifest.clear_trash(self.workdir.path());
            self.after_dom_change();
        }
    }

    fn confirm_and_release(&mut self, index: NodeId) -> bool {
        let infos = self.manifest.file_infos_at(index);
        if infos.is_empty() {
            return false;
        }

        if !self.prompter.confirm_delete(infos.len()) {
            return false;
        }

        let paths: Vec<PathBuf> = infos
            .iter()
            .map(|info| self.workdir.path().join(&info.rel_path))
            .collect();

        let models = self.files.models_for(&paths);
        self.views
            .remove_views_of_models(&mut self.files, &models, PurgeModel::Always);
        // Models that had no views are still registered; drop them too.
        self.files.delete_models(&models);

        true
    }

    // ------------------------------------------------------------------------
    // Editing conveniences (current view of a window)
    // ------------------------------------------------------------------------

    pub fn type_char(&mut self, window: WindowId, input: char) {
        self.views.key_input(&mut self.files, window, input);
        self.pump();
    }

    pub fn type_str(&mut self, window: WindowId, text: &str) {
        for ch in text.chars() {
            self.views.key_input(&mut self.files, window, ch);
        }
        self.pump();
    }

    pub fn undo(&mut self, window: WindowId) {
        self.views.undo(&mut self.files, window);
        self.pump();
    }

    pub fn redo(&mut self, window: WindowId) {
        self.views.redo(&mut self.files, window);
        self.pump();
    }

    pub fn set_cursor(&mut self, window: WindowId, position: usize) {
        self.views.set_cursor(window, position);
    }

    // ------------------------------------------------------------------------
    // Save pipeline
    // ------------------------------------------------------------------------

    /// Flush every modified model into `content/`. Failures are collected,
    /// sorted by path for the report, and never block other writes.
    fn save_modified_models(&mut self) -> MultiSaveResult {
        let mut result = MultiSaveResult::default();

        for id in self.files.ids() {
            let modified = self
                .files
                .model(id)
                .is_some_and(|m| m.supports_modification() && m.is_modified());
            if !modified {
                continue;
            }

            if self.files.save(id) != SaveOutcome::Success {
                result.failed.push(id);
            }
        }

        result
            .failed
            .sort_by_key(|&id| self.files.path_of(id).unwrap_or_default());
        result
    }

    fn report_model_failures(&mut self, result: &MultiSaveResult) {
        let names: Vec<String> = result
            .failed
            .iter()
            .filter_map(|&id| self.files.path_of(id))
            .map(|p| p.display().to_string())
            .collect();

        self.bus.emit(BusEvent::ColorBar(BarColor::Red));
        self.prompter.report_save_failures(&names);
        self.pump();
    }

    fn report_archive_failure(&mut self, path: &Path) {
        self.bus.emit(BusEvent::ColorBar(BarColor::Red));
        self.prompter
            .report_save_failures(&[path.display().to_string()]);
        self.pump();
    }

    /// The whole pipeline: content files, manifest, archive. Ordering is
    /// strict; any failure stops before the next step and leaves the
    /// snapshot, path, and working directory untouched.
    pub fn save(&mut self) {
        if self.fnx_path.exists() && !self.manifest.is_modified() {
            return;
        }

        let mut path = self.fnx_path.clone();
        let mut saved_as = false;

        if !self.fnx_path.exists() {
            match self.prompter.save_as_path(&self.fnx_path) {
                Some(chosen) => {
                    path = chosen;
                    saved_as = true;
                }
                // Cancel: no-op, no color bar.
                None => return,
            }
        }

        if !self.save_to(&path) {
            return;
        }

        if saved_as {
            self.set_fnx_path(path);
        }

        self.finish_successful_save();
    }

    /// Save under a freshly prompted path, keeping the working directory.
    pub fn save_as(&mut self) {
        let Some(path) = self.prompter.save_as_path(&self.fnx_path) else {
            return;
        };

        if !self.save_to(&path) {
            return;
        }

        self.set_fnx_path(path);
        self.finish_successful_save();
    }

    /// Steps 2-6 of the pipeline; returns false after reporting a failure.
    fn save_to(&mut self, path: &Path) -> bool {
        let result = self.save_modified_models();
        // Fold the cleared modification flags into the manifest before it
        // is written out.
        self.pump();

        if !result.ok() {
            self.report_model_failures(&result);
            return false;
        }

        if let Err(e) = self.manifest.write(self.workdir.path()) {
            error!("failed to write manifest: {e}");
            self.report_archive_failure(&self.workdir.manifest_path());
            return false;
        }

        if let Err(e) = fnx::compress(path, self.workdir.path()) {
            error!("notebook save failed: {e}");
            self.report_archive_failure(path);
            return false;
        }

        true
    }

    fn set_fnx_path(&mut self, path: PathBuf) {
        info!("notebook archive path is now {}", path.display());
        self.fnx_path = path;

        let file_name = self
            .fnx_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bus.emit(BusEvent::SubtitleChanged(file_name));
    }

    fn finish_successful_save(&mut self) {
        self.manifest.reset_snapshot();
        self.update_flags();
        self.bus.emit(BusEvent::ColorBar(BarColor::Green));
        self.pump();
    }

    /// Close-time save: same pipeline, but no snapshot reset or color bar;
    /// the windows are going away.
    fn save_for_close(&mut self) -> bool {
        let mut path = self.fnx_path.clone();

        if !self.fnx_path.exists() {
            match self.prompter.save_as_path(&self.fnx_path) {
                Some(chosen) => path = chosen,
                None => return false,
            }
        }

        self.save_to(&path)
    }

    fn prompt_close_save(&mut self) -> bool {
        let subject = self.fnx_path.display().to_string();
        match self.prompter.save_prompt(&subject) {
            SaveChoice::Cancel => false,
            SaveChoice::Discard => true,
            SaveChoice::Save => self.save_for_close(),
        }
    }
}

impl Workspace for Notebook {
    fn parts(&mut self) -> (&mut ViewService, &mut FileService) {
        (&mut self.views, &mut self.files)
    }

    fn views(&self) -> &ViewService {
        &self.views
    }

    fn files(&self) -> &FileService {
        &self.files
    }

    fn bus(&self) -> &Rc<Bus> {
        &self.bus
    }

    /// Modified models outlive their views until the notebook saves.
    fn purge_policy(&self) -> PurgeModel {
        PurgeModel::IfUnmodified
    }

    /// Tree views root at `<notebook>`, never at `<fnx>`: the trash is a
    /// separate view rooted at `<trash>`.
    fn tree_view_root_index(&self) -> Option<NodeId> {
        Some(self.manifest.notebook_index())
    }

    fn can_close_window(&mut self, _window: WindowId) -> bool {
        if self.views.window_count() > 1 {
            return true;
        }

        if self.fnx_path.exists() && !self.manifest.is_modified() {
            return true;
        }

        // Last window and needs saving.
        self.prompt_close_save()
    }

    fn can_close_all_windows(&mut self) -> bool {
        if self.fnx_path.exists() && !self.manifest.is_modified() {
            return true;
        }

        self.prompt_close_save()
    }
}
