//! Plain-file workspace: every tab is backed by a real path on disk or by
//! an off-disk untitled model. Close flows prompt per modified model; the
//! Notebook's manifest machinery doesn't exist here.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::info;

use crate::bus::{BarColor, Bus, BusEvent};
use crate::files::{FileId, FileService};
use crate::save::SaveOutcome;
use crate::settings::SettingsService;
use crate::views::{PurgeModel, ViewService, WindowId};
use crate::workspace::{Prompter, SaveChoice, Workspace};

pub struct Notepad {
    files: FileService,
    views: ViewService,
    bus: Rc<Bus>,
    prompter: Box<dyn Prompter>,
    start_dir: PathBuf,
    pending_ui: Vec<BusEvent>,
}

impl Notepad {
    pub fn new(settings: SettingsService, start_dir: PathBuf, prompter: Box<dyn Prompter>) -> Self {
        let bus = Bus::new(settings);
        let files = FileService::new(Rc::clone(&bus));
        let mut views = ViewService::new(Rc::clone(&bus));
        views.create_window();
        views.apply_editor_font();

        Self {
            files,
            views,
            bus,
            prompter,
            start_dir,
            pending_ui: Vec::new(),
        }
    }

    /// Directory shown first in file dialogs; doubles as the tree root.
    pub fn start_dir(&self) -> &Path {
        &self.start_dir
    }

    pub fn take_ui_events(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.pending_ui)
    }

    pub fn pump(&mut self) {
        loop {
            let events = self.bus.take_events();
            if events.is_empty() {
                return;
            }

            for event in events {
                if let BusEvent::SettingChanged(_) = &event {
                    self.views.apply_editor_font();
                }
                self.pending_ui.push(event);
            }
        }
    }

    pub fn open_file(&mut self, window: WindowId, path: &Path) -> Option<FileId> {
        let id = self
            .views
            .open_file_path_in(&mut self.files, window, path, None);
        self.pump();
        id
    }

    /// Fresh untitled tab backed by an in-memory text model; its title
    /// follows the first line typed.
    pub fn new_untitled(&mut self, window: WindowId) -> FileId {
        let id = self.files.open_off_disk_txt();
        self.views.add_view_of(&mut self.files, window, id);
        self.pump();
        id
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

    // ------------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------------

    /// Save one model; off-disk models go through the Save-As dialog. A
    /// cancelled dialog is a no-op with no color bar.
    pub fn save_model(&mut self, id: FileId) -> SaveOutcome {
        let Some(model) = self.files.model(id) else {
            return SaveOutcome::Failure;
        };

        let outcome = if model.meta().path().is_none() {
            let start = self.start_dir.clone();
            match self.prompter.save_as_path(&start) {
                Some(path) => self.files.save_as(id, &path),
                None => SaveOutcome::NoOp,
            }
        } else {
            self.files.save(id)
        };

        match outcome {
            SaveOutcome::Success => {
                self.bus.emit(BusEvent::ColorBar(BarColor::Green));
                info!("saved {id:?}");
            }
            SaveOutcome::Failure => {
                self.bus.emit(BusEvent::ColorBar(BarColor::Red));
                let names = self
                    .files
                    .path_of(id)
                    .map(|p| p.display().to_string())
                    .into_iter()
                    .collect::<Vec<_>>();
                self.prompter.report_save_failures(&names);
            }
            SaveOutcome::NoOp => {}
        }

        self.pump();
        outcome
    }

    /// Save the current tab's model.
    pub fn save(&mut self, window: WindowId) -> SaveOutcome {
        match self.views.file_model_at(window, None) {
            Some(id) => self.save_model(id),
            None => SaveOutcome::NoOp,
        }
    }

    /// Save the current tab under a new path.
    pub fn save_as(&mut self, window: WindowId) -> SaveOutcome {
        let Some(id) = self.views.file_model_at(window, None) else {
            return SaveOutcome::NoOp;
        };

        let start = self.start_dir.clone();
        let Some(path) = self.prompter.save_as_path(&start) else {
            return SaveOutcome::NoOp;
        };

        let outcome = self.files.save_as(id, &path);
        match outcome {
            SaveOutcome::Success => self.bus.emit(BusEvent::ColorBar(BarColor::Green)),
            SaveOutcome::Failure => self.bus.emit(BusEvent::ColorBar(BarColor::Red)),
            SaveOutcome::NoOp => {}
        }

        self.pump();
        outcome
    }

    /// Save every modified model with open views. Partial failures never
    /// block the other writes.
    pub fn save_all(&mut self) -> Vec<FileId> {
        let mut failed = Vec::new();

        for id in self.views.modified_view_models(&self.files) {
            if self.save_model(id) == SaveOutcome::Failure {
                failed.push(id);
            }
        }

        failed
    }

    /// Prompt-save-discard for one model; false means cancel.
    fn resolve_modified(&mut self, id: FileId) -> bool {
        let Some(model) = self.files.model(id) else {
            return true;
        };

        if !model.is_modified() {
            return true;
        }

        let title = model.meta().title();
        match self.prompter.save_prompt(&title) {
            SaveChoice::Cancel => false,
            SaveChoice::Discard => true,
            SaveChoice::Save => self.save_model(id) == SaveOutcome::Success,
        }
    }

    /// Prompt for each model in turn, raising it first so the user can see
    /// what they're deciding about.
    fn resolve_all(&mut self, ids: &[FileId]) -> bool {
        for &id in ids {
            self.views.raise_anywhere(id);
            if !self.resolve_modified(id) {
                return false;
            }
        }
        true
    }
}

impl Workspace for Notepad {
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

    /// Close hooks resolve saves first, so an approved close always
    /// destroys the model.
    fn purge_policy(&self) -> PurgeModel {
        PurgeModel::Always
    }

    fn tree_view_fs_root(&self) -> Option<&Path> {
        Some(&self.start_dir)
    }

    fn can_close_tab(&mut self, window: WindowId, index: Option<usize>) -> bool {
        let Some(id) = self.views.file_model_at(window, index) else {
            return true;
        };

        // Another view still references the model; closing this tab loses
        // nothing.
        if self.views.count_for(id) > 1 {
            return true;
        }

        self.resolve_modified(id)
    }

    fn can_close_tab_everywhere(&mut self, window: WindowId, index: Option<usize>) -> bool {
        match self.views.file_model_at(window, index) {
            Some(id) => self.resolve_modified(id),
            None => true,
        }
    }

    fn can_close_window_tabs(&mut self, window: WindowId) -> bool {
        // Models also open in another window survive that window's close.
        let ids = self.views.modified_view_models_in(&self.files, window, true);
        self.resolve_all(&ids)
    }

    fn can_close_all_tabs(&mut self) -> bool {
        let ids = self.views.modified_view_models(&self.files);
        self.resolve_all(&ids)
    }

    fn can_close_window(&mut self, window: WindowId) -> bool {
        self.can_close_window_tabs(window)
    }

    fn can_close_all_windows(&mut self) -> bool {
        self.can_close_all_tabs()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::workspace::{DiscardPrompter, ScriptedPrompter};

    fn notepad_with(prompter: ScriptedPrompter) -> (Notepad, WindowId) {
        let notepad = Notepad::new(
            SettingsService::ephemeral("notepad"),
            std::env::temp_dir(),
            Box::new(prompter),
        );
        let window = notepad.views().window_ids()[0];
        (notepad, window)
    }

    #[test]
    fn untitled_tab_titles_follow_the_first_line() {
        let (mut notepad, window) = notepad_with(ScriptedPrompter::default());
        notepad.new_untitled(window);

        assert_eq!(
            notepad.views.tab_title(&notepad.files, window, None).unwrap(),
            "Untitled"
        );

        notepad.type_str(window, "A River in Winter\nfirst line of prose");
        assert_eq!(
            notepad.views.tab_title(&notepad.files, window, None).unwrap(),
            "A River in Winter"
        );
    }

    #[test]
    fn save_as_prompts_for_off_disk_models() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("Draft.txt");

        let mut prompter = ScriptedPrompter::default();
        prompter.save_as_paths.push_back(target.clone());
        let (mut notepad, window) = notepad_with(prompter);

        notepad.new_untitled(window);
        notepad.type_str(window, "kept words");

        assert_eq!(notepad.save(window), SaveOutcome::Success);
        assert_eq!(fs::read_to_string(&target).unwrap(), "kept words");

        // The registry is re-keyed to the new path and the model is clean.
        let ids = notepad.files.models_for(&[target.clone()]);
        assert_eq!(ids.len(), 1);
        let id = *ids.iter().next().unwrap();
        assert!(!notepad.files.model(id).unwrap().is_modified());
        assert_eq!(notepad.files.model(id).unwrap().meta().title(), "Draft");
    }

    #[test]
    fn cancelled_save_as_changes_nothing() {
        let (mut notepad, window) = notepad_with(ScriptedPrompter::default());
        let id = notepad.new_untitled(window);
        notepad.type_str(window, "unsaved");

        assert_eq!(notepad.save(window), SaveOutcome::NoOp);
        assert!(notepad.files.model(id).unwrap().is_modified());

        let events = notepad.take_ui_events();
        assert!(!events.iter().any(|e| matches!(e, BusEvent::ColorBar(_))));
    }

    #[test]
    fn close_tab_prompts_only_when_changes_would_be_lost() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "body").unwrap();

        let mut prompter = ScriptedPrompter::default();
        prompter.choices.push_back(SaveChoice::Cancel);
        let (mut notepad, window) = notepad_with(prompter);

        let id = notepad.open_file(window, &path).unwrap();
        notepad.type_str(window, "x");

        // Cancel vetoes.
        notepad.close_tab(window, None);
        assert_eq!(notepad.views.tab_count(window), 1);

        // A second view of the same model closes without any prompt.
        notepad.views.add_view_of(&mut notepad.files, window, id);
        notepad.close_tab(window, None);
        assert_eq!(notepad.views.tab_count(window), 1);
        assert!(notepad.files.model(id).is_some());
    }

    #[test]
    fn close_tab_with_save_writes_and_destroys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "body").unwrap();

        let mut prompter = ScriptedPrompter::default();
        prompter.choices.push_back(SaveChoice::Save);
        let (mut notepad, window) = notepad_with(prompter);

        let id = notepad.open_file(window, &path).unwrap();
        notepad.type_str(window, "more ");

        notepad.close_tab(window, None);

        assert_eq!(notepad.views.tab_count(window), 0);
        assert!(notepad.files.model(id).is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "more body");
    }

    #[test]
    fn discarded_close_destroys_the_modified_model() {
        let (mut notepad, window) = notepad_with(ScriptedPrompter::default());
        let id = notepad.new_untitled(window);
        notepad.type_str(window, "throwaway");

        let mut prompter = ScriptedPrompter::default();
        prompter.choices.push_back(SaveChoice::Discard);
        notepad.prompter = Box::new(prompter);

        notepad.close_tab(window, None);
        assert!(notepad.files.model(id).is_none());
        assert!(!notepad.views.any_views());
    }

    #[test]
    fn close_tab_everywhere_drops_every_view_of_the_model() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "body").unwrap();

        let (mut notepad, w1) = notepad_with(ScriptedPrompter::default());
        let w2 = notepad.views.create_window();

        let id = notepad.open_file(w1, &path).unwrap();
        notepad.open_file(w2, &path).unwrap();
        assert_eq!(notepad.views.count_for(id), 2);

        notepad.close_tab_everywhere(w1, None);

        assert_eq!(notepad.views.count_for(id), 0);
        assert_eq!(notepad.views.tab_count(w2), 0);
        assert!(notepad.files.model(id).is_none());
    }

    #[test]
    fn quit_resolves_every_modified_model() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        fs::write(&a, "aa").unwrap();
        fs::write(&b, "bb").unwrap();

        let mut prompter = ScriptedPrompter::default();
        prompter.choices.push_back(SaveChoice::Save);
        prompter.choices.push_back(SaveChoice::Discard);
        let (mut notepad, window) = notepad_with(prompter);

        notepad.open_file(window, &a).unwrap();
        notepad.type_str(window, "1");
        notepad.open_file(window, &b).unwrap();
        notepad.type_str(window, "2");

        assert!(notepad.try_quit());
        assert_eq!(fs::read_to_string(&a).unwrap(), "1aa");
        assert_eq!(fs::read_to_string(&b).unwrap(), "bb");
        assert_eq!(notepad.views.window_count(), 0);
    }

    #[test]
    fn discard_prompter_never_blocks_quit() {
        let mut notepad = Notepad::new(
            SettingsService::ephemeral("notepad"),
            std::env::temp_dir(),
            Box::<DiscardPrompter>::default(),
        );
        let window = notepad.views().window_ids()[0];
        notepad.new_untitled(window);
        notepad.type_str(window, "gone");

        assert!(notepad.try_quit());
    }
}
