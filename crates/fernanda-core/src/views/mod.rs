//! Per-window tab containers and the model-to-view lifecycle.
//!
//! A view renders one file model; any number of views may share a model.
//! Text views carry their own cursor/selection and a per-view local
//! document registered with the model, which owns all fan-out. The service
//! tracks view counts and performs the mechanical side of closing; veto
//! logic (save prompts) belongs to the owning workspace's close hooks.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use log::info;

use crate::bus::{Bus, BusEvent};
use crate::files::{FileId, FileService};
use crate::files::model::FileModel;
use crate::keyfilter;
use crate::text::ViewDocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u32);

#[derive(Debug, Clone)]
pub struct TextViewState {
    pub doc: ViewDocId,
    pub cursor: usize,
    /// (anchor, position); equal ends mean no selection.
    pub selection: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub enum ViewKind {
    Text(TextViewState),
    NoOp,
}

#[derive(Debug, Clone)]
pub struct FileView {
    pub file: FileId,
    pub kind: ViewKind,
}

#[derive(Default)]
struct TabContainer {
    tabs: Vec<FileView>,
    current: Option<usize>,
}

/// What to do with a model once its last view is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeModel {
    /// Destroy it unconditionally (the close hook already resolved saves).
    Always,
    /// Keep modified models alive; a pending notebook save still targets
    /// them.
    IfUnmodified,
}

pub struct ViewService {
    bus: Rc<Bus>,
    windows: BTreeMap<WindowId, TabContainer>,
    next_window: u32,
    clipboard: Option<String>,
    editor_font: (String, u32),
}

impl ViewService {
    pub fn new(bus: Rc<Bus>) -> Self {
        Self {
            bus,
            windows: BTreeMap::new(),
            next_window: 0,
            clipboard: None,
            editor_font: (String::new(), 0),
        }
    }

    // ------------------------------------------------------------------------
    // Windows
    // ------------------------------------------------------------------------

    pub fn create_window(&mut self) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;
        self.windows.insert(id, TabContainer::default());
        self.bus.emit(BusEvent::WindowCreated(id));
        id
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn has_window(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    /// Mechanical removal; every tab is closed with the given purge policy.
    pub fn remove_window(&mut self, files: &mut FileService, window: WindowId, purge: PurgeModel) {
        self.remove_all_tabs_in(files, window, purge);
        self.windows.remove(&window);
    }

    // ------------------------------------------------------------------------
    // Tabs & views
    // ------------------------------------------------------------------------

    pub fn tab_count(&self, window: WindowId) -> usize {
        self.windows.get(&window).map_or(0, |w| w.tabs.len())
    }

    pub fn any_views(&self) -> bool {
        self.windows.values().any(|w| !w.tabs.is_empty())
    }

    fn normalize_index(&self, window: WindowId, index: Option<usize>) -> Option<usize> {
        let container = self.windows.get(&window)?;
        let index = index.or(container.current)?;
        (index < container.tabs.len()).then_some(index)
    }

    /// Ensure a model via the registry and show it in `window`. If the
    /// window already has a view of that model, it is raised instead of
    /// duplicated; a second view of the same model is an explicit request
    /// (see [`Self::add_view_of`]).
    pub fn open_file_path_in(
        &mut self,
        files: &mut FileService,
        window: WindowId,
        path: &Path,
        title: Option<&str>,
    ) -> Option<FileId> {
        if !self.has_window(window) {
            return None;
        }

        let id = files.open(path, title)?;

        if self.raise_model(window, id) {
            return Some(id);
        }

        self.add_view_of(files, window, id);
        Some(id)
    }

    /// Add a fresh tab with a new view of `id`, unconditionally.
    pub fn add_view_of(&mut self, files: &mut FileService, window: WindowId, id: FileId) -> bool {
        if files.model(id).is_none() || !self.has_window(window) {
            return false;
        }

        let kind = match files.text_mut(id) {
            Some(text) => ViewKind::Text(TextViewState {
                doc: text.register_view_document(),
                cursor: 0,
                selection: None,
            }),
            None => ViewKind::NoOp,
        };

        let Some(container) = self.windows.get_mut(&window) else {
            return false;
        };

        container.tabs.push(FileView { file: id, kind });
        container.current = Some(container.tabs.len() - 1);
        true
    }

    pub fn file_view_at(&self, window: WindowId, index: Option<usize>) -> Option<&FileView> {
        let i = self.normalize_index(window, index)?;
        self.windows.get(&window)?.tabs.get(i)
    }

    pub fn file_model_at(&self, window: WindowId, index: Option<usize>) -> Option<FileId> {
        self.file_view_at(window, index).map(|v| v.file)
    }

    pub fn current_index(&self, window: WindowId) -> Option<usize> {
        self.normalize_index(window, None)
    }

    pub fn set_current(&mut self, window: WindowId, index: usize) {
        if let Some(container) = self.windows.get_mut(&window) {
            if index < container.tabs.len() {
                container.current = Some(index);
            }
        }
    }

    // Tab chrome mirrors model meta and modification state.

    pub fn tab_title(&self, files: &FileService, window: WindowId, index: Option<usize>) -> Option<String> {
        let view = self.file_view_at(window, index)?;
        Some(files.model(view.file)?.meta().title())
    }

    pub fn tab_tool_tip(&self, files: &FileService, window: WindowId, index: Option<usize>) -> Option<String> {
        let view = self.file_view_at(window, index)?;
        Some(files.model(view.file)?.meta().tool_tip())
    }

    pub fn is_tab_flagged(&self, files: &FileService, window: WindowId, index: Option<usize>) -> bool {
        self.file_view_at(window, index)
            .and_then(|view| files.model(view.file))
            .is_some_and(|model| model.is_modified())
    }

    // ------------------------------------------------------------------------
    // Closing (mechanics only; hooks live on the workspace)
    // ------------------------------------------------------------------------

    /// Destroy one view. The model's view count drops; at zero the model is
    /// purged per policy.
    pub fn remove_tab(
        &mut self,
        files: &mut FileService,
        window: WindowId,
        index: Option<usize>,
        purge: PurgeModel,
    ) {
        let Some(i) = self.normalize_index(window, index) else {
            return;
        };

        let Some(container) = self.windows.get_mut(&window) else {
            return;
        };

        let view = container.tabs.remove(i);

        container.current = if container.tabs.is_empty() {
            None
        } else {
            Some(i.min(container.tabs.len() - 1))
        };

        if let ViewKind::Text(state) = &view.kind {
            if let Some(text) = files.text_mut(view.file) {
                text.unregister_view_document(state.doc);
            }
        }

        self.purge_if_orphaned(files, view.file, purge);
    }

    fn purge_if_orphaned(&mut self, files: &mut FileService, id: FileId, purge: PurgeModel) {
        if self.count_for(id) > 0 {
            return;
        }

        let keep_for_pending_save = purge == PurgeModel::IfUnmodified
            && files.model(id).is_some_and(|m| m.is_modified());

        if !keep_for_pending_save {
            info!("destroying file model {id:?} (no views remain)");
            files.delete_models(&HashSet::from([id]));
        }
    }

    pub fn remove_all_tabs_in(&mut self, files: &mut FileService, window: WindowId, purge: PurgeModel) {
        while self.tab_count(window) > 0 {
            self.remove_tab(files, window, Some(0), purge);
        }
    }

    /// Close every view of each model, across all windows. No hook: callers
    /// use this after their own confirmation (permanent deletion).
    pub fn remove_views_of_models(
        &mut self,
        files: &mut FileService,
        models: &HashSet<FileId>,
        purge: PurgeModel,
    ) {
        for window in self.window_ids() {
            // Iterate backward to avoid index shifting.
            for i in (0..self.tab_count(window)).rev() {
                let Some(view) = self.file_view_at(window, Some(i)) else {
                    continue;
                };
                if models.contains(&view.file) {
                    self.remove_tab(files, window, Some(i), purge);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Live view count for a model, across all windows.
    pub fn count_for(&self, id: FileId) -> usize {
        self.windows
            .values()
            .flat_map(|w| w.tabs.iter())
            .filter(|view| view.file == id)
            .count()
    }

    /// True if the model has views in two or more distinct windows.
    pub fn is_multi_window(&self, id: FileId) -> bool {
        self.windows
            .values()
            .filter(|w| w.tabs.iter().any(|view| view.file == id))
            .take(2)
            .count()
            >= 2
    }

    /// Unique modified models in one window, in tab order.
    pub fn modified_view_models_in(
        &self,
        files: &FileService,
        window: WindowId,
        exclude_multi_window: bool,
    ) -> Vec<FileId> {
        let Some(container) = self.windows.get(&window) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for view in &container.tabs {
            if result.contains(&view.file) {
                continue;
            }
            if !files.model(view.file).is_some_and(|m| m.is_modified()) {
                continue;
            }
            if exclude_multi_window && self.is_multi_window(view.file) {
                continue;
            }
            result.push(view.file);
        }

        result
    }

    /// Unique modified models across every window, window-then-tab order.
    pub fn modified_view_models(&self, files: &FileService) -> Vec<FileId> {
        let mut result = Vec::new();
        for window in self.window_ids() {
            for id in self.modified_view_models_in(files, window, false) {
                if !result.contains(&id) {
                    result.push(id);
                }
            }
        }
        result
    }

    pub fn any_modified_in(&self, files: &FileService, window: WindowId) -> bool {
        !self.modified_view_models_in(files, window, false).is_empty()
    }

    // ------------------------------------------------------------------------
    // Raising
    // ------------------------------------------------------------------------

    pub fn raise(&mut self, window: WindowId, index: usize) {
        self.set_current(window, index);
    }

    /// Bring the first tab (from the left) showing `id` to the front of
    /// `window`. Returns false when the window has no view of it.
    pub fn raise_model(&mut self, window: WindowId, id: FileId) -> bool {
        let Some(container) = self.windows.get(&window) else {
            return false;
        };

        let Some(i) = container.tabs.iter().position(|view| view.file == id) else {
            return false;
        };

        self.set_current(window, i);
        true
    }

    /// Raise `id` somewhere; returns the first window found with it.
    pub fn raise_anywhere(&mut self, id: FileId) -> Option<WindowId> {
        let window = self
            .window_ids()
            .into_iter()
            .find(|&w| self.raise_model(w, id))?;
        Some(window)
    }

    // ------------------------------------------------------------------------
    // Editing commands (routed to the current view's model)
    // ------------------------------------------------------------------------

    fn current_text_view(&self, window: WindowId) -> Option<(usize, FileId, TextViewState)> {
        let i = self.normalize_index(window, None)?;
        let view = self.windows.get(&window)?.tabs.get(i)?;
        match &view.kind {
            ViewKind::Text(state) => Some((i, view.file, state.clone())),
            ViewKind::NoOp => None,
        }
    }

    fn store_text_view(&mut self, window: WindowId, index: usize, state: TextViewState) {
        if let Some(view) = self
            .windows
            .get_mut(&window)
            .and_then(|w| w.tabs.get_mut(index))
        {
            view.kind = ViewKind::Text(state);
        }
    }

    fn announce_modification_change(&self, files: &FileService, id: FileId, was_modified: bool) {
        let is_modified = files.model(id).is_some_and(|m| m.is_modified());
        if is_modified != was_modified {
            self.bus
                .emit(BusEvent::FileModelModificationChanged(id, is_modified));
        }
    }

    /// One raw keystroke into the focused view, run through the key filter
    /// when it is enabled in settings.
    pub fn key_input(&mut self, files: &mut FileService, window: WindowId, input: char) {
        let filter_on = self.bus.setting_or(crate::settings::keys::EDITOR_KEY_FILTER, "true") == "true";

        let Some((index, id, mut state)) = self.current_text_view(window) else {
            return;
        };
        let Some(model) = files.text_mut(id) else {
            return;
        };

        let was_modified = model.is_modified();
        self.delete_selection_of(model, &mut state);

        if filter_on && !input.is_control() {
            keyfilter::apply_filtered(model, state.doc, &mut state.cursor, input);
        } else {
            keyfilter::apply_key(
                model,
                state.doc,
                &mut state.cursor,
                keyfilter::SyntheticKey::Input(input),
            );
        }

        self.store_text_view(window, index, state);
        self.announce_modification_change(files, id, was_modified);
    }

    /// Insert a run of text at the caret (paste, programmatic typing).
    pub fn insert_text(&mut self, files: &mut FileService, window: WindowId, text: &str) {
        let Some((index, id, mut state)) = self.current_text_view(window) else {
            return;
        };
        let Some(model) = files.text_mut(id) else {
            return;
        };

        let was_modified = model.is_modified();
        self.delete_selection_of(model, &mut state);
        model.edit(state.doc, state.cursor, 0, text);
        state.cursor += text.chars().count();

        self.store_text_view(window, index, state);
        self.announce_modification_change(files, id, was_modified);
    }

    pub fn backspace(&mut self, files: &mut FileService, window: WindowId) {
        let Some((index, id, mut state)) = self.current_text_view(window) else {
            return;
        };
        let Some(model) = files.text_mut(id) else {
            return;
        };

        let was_modified = model.is_modified();
        if state.selection.is_some() {
            self.delete_selection_of(model, &mut state);
        } else if state.cursor > 0 {
            model.edit(state.doc, state.cursor - 1, 1, "");
            state.cursor -= 1;
        }

        self.store_text_view(window, index, state);
        self.announce_modification_change(files, id, was_modified);
    }

    fn delete_selection_of(&self, model: &mut crate::text::TextFileModel, state: &mut TextViewState) {
        let Some((anchor, pos)) = state.selection.take() else {
            return;
        };

        let (start, end) = (anchor.min(pos), anchor.max(pos));
        if start < end {
            model.edit(state.doc, start, end - start, "");
            state.cursor = start;
        }
    }

    /// Undo on the view's model. The focused view repositions its caret at
    /// the replay hint; inactive views don't move.
    pub fn undo(&mut self, files: &mut FileService, window: WindowId) {
        self.replay(files, window, true);
    }

    pub fn redo(&mut self, files: &mut FileService, window: WindowId) {
        self.replay(files, window, false);
    }

    fn replay(&mut self, files: &mut FileService, window: WindowId, undo: bool) {
        let Some((index, id, mut state)) = self.current_text_view(window) else {
            return;
        };
        let Some(model) = files.text_mut(id) else {
            return;
        };

        let was_modified = model.is_modified();
        let hint = if undo {
            if !model.has_undo() {
                return;
            }
            model.undo()
        } else {
            if !model.has_redo() {
                return;
            }
            model.redo()
        };

        if let Some(position) = hint {
            state.cursor = position.min(model.char_count());
            state.selection = None;
        }

        self.store_text_view(window, index, state);
        self.announce_modification_change(files, id, was_modified);
    }

    pub fn copy(&mut self, files: &FileService, window: WindowId) {
        let Some((_, id, state)) = self.current_text_view(window) else {
            return;
        };
        let Some((anchor, pos)) = state.selection else {
            return;
        };

        let (start, end) = (anchor.min(pos), anchor.max(pos));
        if let Some(model) = files.text(id) {
            if let Some(text) = model.view_text(state.doc) {
                let selected: String = text
                    .chars()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .collect();
                self.clipboard = Some(selected);
            }
        }
    }

    pub fn cut(&mut self, files: &mut FileService, window: WindowId) {
        let Some((index, id, mut state)) = self.current_text_view(window) else {
            return;
        };
        if state.selection.is_none() {
            return;
        }

        self.copy(files, window);

        let Some(model) = files.text_mut(id) else {
            return;
        };
        let was_modified = model.is_modified();
        self.delete_selection_of(model, &mut state);
        self.store_text_view(window, index, state);
        self.announce_modification_change(files, id, was_modified);
    }

    pub fn paste(&mut self, files: &mut FileService, window: WindowId) {
        let Some(text) = self.clipboard.clone() else {
            return;
        };
        self.insert_text(files, window, &text);
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub fn select_all(&mut self, files: &FileService, window: WindowId) {
        let Some((index, id, mut state)) = self.current_text_view(window) else {
            return;
        };
        let Some(model) = files.text(id) else {
            return;
        };

        let len = model.char_count();
        state.selection = Some((0, len));
        state.cursor = len;
        self.store_text_view(window, index, state);
    }

    pub fn set_cursor(&mut self, window: WindowId, position: usize) {
        if let Some((index, _, mut state)) = self.current_text_view(window) {
            state.cursor = position;
            state.selection = None;
            self.store_text_view(window, index, state);
        }
    }

    pub fn set_selection(&mut self, window: WindowId, anchor: usize, position: usize) {
        if let Some((index, _, mut state)) = self.current_text_view(window) {
            state.selection = Some((anchor, position));
            state.cursor = position;
            self.store_text_view(window, index, state);
        }
    }

    pub fn cursor(&self, window: WindowId) -> Option<usize> {
        self.current_text_view(window).map(|(_, _, state)| state.cursor)
    }

    // ------------------------------------------------------------------------
    // Settings fan-out
    // ------------------------------------------------------------------------

    /// Re-read the editor font from settings; real view widgets would be
    /// restyled here.
    pub fn apply_editor_font(&mut self) {
        let family = self
            .bus
            .setting_or(crate::settings::keys::EDITOR_FONT_FAMILY, "monospace");
        let size = self
            .bus
            .setting_or(crate::settings::keys::EDITOR_FONT_SIZE, "12")
            .parse()
            .unwrap_or(12);
        self.editor_font = (family, size);
    }

    pub fn editor_font(&self) -> (&str, u32) {
        (&self.editor_font.0, self.editor_font.1)
    }
}

#[cfg(test)]
mod tests;
