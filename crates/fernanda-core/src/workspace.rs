//! Workspace contract: close hooks, interactive-surface injection, and the
//! shared close orchestration.
//!
//! The engine stays headless: dialogs (save prompts, save-as pickers, trash
//! confirmation, failure reports) are reached through the [`Prompter`]
//! trait, and each close operation is gated by a veto hook the concrete
//! workspace overrides. A hook returning false aborts the close with no
//! state change.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;

use crate::bus::Bus;
use crate::files::FileService;
use crate::views::{PurgeModel, ViewService, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save,
    Discard,
    Cancel,
}

/// Interactive surfaces owned by the shell. Prompts drive the event loop
/// recursively in a real UI; here they are plain synchronous calls.
pub trait Prompter {
    /// "Save changes to `subject`?"
    fn save_prompt(&mut self, subject: &str) -> SaveChoice;

    /// Save-As dialog; `None` is a cancel and must behave as a no-op.
    fn save_as_path(&mut self, start: &Path) -> Option<PathBuf>;

    /// "Permanently delete N files?"
    fn confirm_delete(&mut self, count: usize) -> bool;

    /// Modal listing of files that failed to save.
    fn report_save_failures(&mut self, names: &[String]);
}

/// Non-interactive prompter: never saves, never supplies paths.
#[derive(Default)]
pub struct DiscardPrompter;

impl Prompter for DiscardPrompter {
    fn save_prompt(&mut self, _subject: &str) -> SaveChoice {
        SaveChoice::Discard
    }

    fn save_as_path(&mut self, _start: &Path) -> Option<PathBuf> {
        None
    }

    fn confirm_delete(&mut self, _count: usize) -> bool {
        true
    }

    fn report_save_failures(&mut self, names: &[String]) {
        warn!("save failed for: {}", names.join(", "));
    }
}

/// Prompter with scripted answers, for driving workspaces without a UI.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub choices: VecDeque<SaveChoice>,
    pub save_as_paths: VecDeque<PathBuf>,
    pub confirm_deletes: bool,
    pub reported_failures: Vec<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn saving_to(path: PathBuf) -> Self {
        Self {
            choices: VecDeque::from([SaveChoice::Save]),
            save_as_paths: VecDeque::from([path]),
            confirm_deletes: true,
            reported_failures: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn save_prompt(&mut self, _subject: &str) -> SaveChoice {
        self.choices.pop_front().unwrap_or(SaveChoice::Cancel)
    }

    fn save_as_path(&mut self, _start: &Path) -> Option<PathBuf> {
        self.save_as_paths.pop_front()
    }

    fn confirm_delete(&mut self, _count: usize) -> bool {
        self.confirm_deletes
    }

    fn report_save_failures(&mut self, names: &[String]) {
        self.reported_failures.push(names.to_vec());
    }
}

/// Common surface of Notepad and Notebook: services, hooks, and the close
/// flows the view/window plumbing calls into.
pub trait Workspace {
    /// Split borrow of the two services every close operation touches.
    fn parts(&mut self) -> (&mut ViewService, &mut FileService);

    fn views(&self) -> &ViewService;
    fn files(&self) -> &FileService;
    fn bus(&self) -> &Rc<Bus>;

    /// What happens to a model when its last view goes away.
    fn purge_policy(&self) -> PurgeModel {
        PurgeModel::IfUnmodified
    }

    // --------------------------------------------------------------------
    // Tree-model hooks
    // --------------------------------------------------------------------

    /// Index under which tree views display children (the `<notebook>`
    /// element for a Notebook). None when the workspace has no manifest.
    fn tree_view_root_index(&self) -> Option<crate::manifest::dom::NodeId> {
        None
    }

    /// Filesystem root for workspaces whose tree mirrors a directory.
    fn tree_view_fs_root(&self) -> Option<&Path> {
        None
    }

    // --------------------------------------------------------------------
    // Close hooks (veto predicates)
    // --------------------------------------------------------------------

    fn can_close_tab(&mut self, _window: WindowId, _index: Option<usize>) -> bool {
        true
    }

    fn can_close_tab_everywhere(&mut self, _window: WindowId, _index: Option<usize>) -> bool {
        true
    }

    fn can_close_window_tabs(&mut self, _window: WindowId) -> bool {
        true
    }

    fn can_close_all_tabs(&mut self) -> bool {
        true
    }

    fn can_close_window(&mut self, _window: WindowId) -> bool {
        true
    }

    fn can_close_all_windows(&mut self) -> bool {
        true
    }

    // --------------------------------------------------------------------
    // Gated close flows
    // --------------------------------------------------------------------

    fn close_tab(&mut self, window: WindowId, index: Option<usize>) {
        if !self.can_close_tab(window, index) {
            return;
        }

        let purge = self.purge_policy();
        let (views, files) = self.parts();
        views.remove_tab(files, window, index, purge);
    }

    /// Close every tab, in any window, referencing the same model.
    fn close_tab_everywhere(&mut self, window: WindowId, index: Option<usize>) {
        let Some(model) = self.views().file_model_at(window, index) else {
            return;
        };

        if !self.can_close_tab_everywhere(window, index) {
            return;
        }

        let purge = self.purge_policy();
        let (views, files) = self.parts();
        views.remove_views_of_models(files, &HashSet::from([model]), purge);
    }

    fn close_window_tabs(&mut self, window: WindowId) {
        if !self.can_close_window_tabs(window) {
            return;
        }

        let purge = self.purge_policy();
        let (views, files) = self.parts();
        views.remove_all_tabs_in(files, window, purge);
    }

    fn close_all_tabs(&mut self) {
        if !self.can_close_all_tabs() {
            return;
        }

        let purge = self.purge_policy();
        let (views, files) = self.parts();
        for window in views.window_ids() {
            views.remove_all_tabs_in(files, window, purge);
        }
    }

    /// Returns false when the close was vetoed (cancelled prompt, failed
    /// save).
    fn close_window(&mut self, window: WindowId) -> bool {
        if !self.can_close_window(window) {
            return false;
        }

        let purge = self.purge_policy();
        let (views, files) = self.parts();
        views.remove_window(files, window, purge);
        true
    }

    fn close_all_windows(&mut self) -> bool {
        if !self.can_close_all_windows() {
            return false;
        }

        let purge = self.purge_policy();
        let (views, files) = self.parts();
        for window in views.window_ids() {
            views.remove_window(files, window, purge);
        }
        true
    }

    fn try_quit(&mut self) -> bool {
        self.close_all_windows()
    }
}
