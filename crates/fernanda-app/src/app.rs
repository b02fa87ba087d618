//! Workspace dispatch: classify each command-line path and route it to a
//! Notebook or the shared Notepad.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{error, info};

use fernanda_core::settings::keys;
use fernanda_core::{fnx, DiscardPrompter, Notebook, Notepad, SettingsService, Workspace};

use crate::app_dirs;

#[derive(Debug, Parser)]
#[command(name = "fernanda", about = "Long-form fiction drafting environment")]
pub struct Cli {
    /// Enable the developer menu.
    #[arg(short, long)]
    pub dev: bool,

    /// Notebooks (.fnx archives) and/or plain files to open.
    pub paths: Vec<PathBuf>,
}

pub struct Application {
    dev: bool,
    settings: SettingsService,
    notebooks: Vec<Notebook>,
    notepad: Option<Notepad>,
}

impl Application {
    pub fn new(dev: bool) -> Self {
        Self {
            dev,
            settings: SettingsService::new("fernanda", Some(&app_dirs::config())),
            notebooks: Vec::new(),
            notepad: None,
        }
    }

    pub fn dev_mode(&self) -> bool {
        self.dev
    }

    pub fn notebooks(&self) -> &[Notebook] {
        &self.notebooks
    }

    pub fn notepad(&self) -> Option<&Notepad> {
        self.notepad.as_ref()
    }

    /// Zero paths opens an empty Notepad; otherwise each path opens as a
    /// Notebook when it is a real `.fnx` archive (magic and extension), and
    /// as a Notepad file otherwise. A failure in one workspace never
    /// affects the others.
    pub fn dispatch(&mut self, paths: &[PathBuf]) {
        if paths.is_empty() {
            self.ensure_notepad();
            return;
        }

        for path in paths {
            if path.exists() && fnx::is_fnx_file(path) {
                self.open_notebook(path.clone());
            } else {
                self.open_in_notepad(path);
            }
        }
    }

    fn open_notebook(&mut self, path: PathBuf) {
        if self.notebooks.iter().any(|n| n.fnx_path() == path.as_path()) {
            info!("notebook {} is already open", path.display());
            return;
        }

        match Notebook::open(
            path.clone(),
            &app_dirs::temp(),
            Box::<DiscardPrompter>::default(),
        ) {
            Ok(notebook) => {
                self.settings
                    .set(keys::MOST_RECENT_NOTEBOOK, &path.display().to_string());
                self.notebooks.push(notebook);
            }
            Err(e) => error!("could not open notebook {}: {e}", path.display()),
        }
    }

    fn open_in_notepad(&mut self, path: &Path) {
        self.ensure_notepad();

        let Some(notepad) = self.notepad.as_mut() else {
            return;
        };

        let window = notepad.views().window_ids()[0];
        if path.exists() {
            notepad.open_file(window, path);
        } else {
            error!("no such file: {}", path.display());
        }
    }

    fn ensure_notepad(&mut self) {
        if self.notepad.is_some() {
            return;
        }

        let start_dir = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        self.notepad = Some(Notepad::new(
            SettingsService::new("notepad", Some(&app_dirs::config())),
            start_dir,
            Box::<DiscardPrompter>::default(),
        ));
    }

    /// One line per open workspace, for the log.
    pub fn summarize(&self) {
        for notebook in &self.notebooks {
            let manifest = notebook.manifest();
            info!(
                "notebook {}: {} top-level items{}",
                notebook.fnx_path().display(),
                manifest.row_count(Some(manifest.notebook_index())),
                if notebook.is_modified() { " (unsaved)" } else { "" },
            );
        }

        if let Some(notepad) = &self.notepad {
            let window = notepad.views().window_ids()[0];
            info!("notepad: {} open tabs", notepad.views().tab_count(window));
        }
    }
}
