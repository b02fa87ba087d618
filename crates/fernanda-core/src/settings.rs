//! INI-backed key/value settings.
//!
//! One service per workspace. A Notebook redirects its service at the
//! `Settings.ini` inside the working directory right after extraction, so
//! per-notebook overrides travel inside the archive. Keys the engine
//! doesn't recognize round-trip untouched.

use std::path::{Path, PathBuf};

use ini::Ini;
use log::warn;

/// Recognized (section, key) pairs.
pub mod keys {
    pub const EDITOR_FONT_FAMILY: (&str, &str) = ("Editor", "font_family");
    pub const EDITOR_FONT_SIZE: (&str, &str) = ("Editor", "font_size");
    pub const EDITOR_KEY_FILTER: (&str, &str) = ("Editor", "key_filter");
    pub const TREE_DOCK_VISIBLE: (&str, &str) = ("TreeView", "dock_visible");
    pub const MOST_RECENT_NOTEBOOK: (&str, &str) = ("General", "most_recent_notebook");
}

pub struct SettingsService {
    name: String,
    path: Option<PathBuf>,
    ini: Ini,
}

impl SettingsService {
    /// `config_dir/<name>.ini`; loads existing content when present.
    pub fn new(name: &str, config_dir: Option<&Path>) -> Self {
        let path = config_dir.map(|dir| dir.join(format!("{name}.ini")));
        let ini = path
            .as_deref()
            .and_then(|p| Ini::load_from_file(p).ok())
            .unwrap_or_else(Ini::new);

        Self {
            name: name.to_string(),
            path,
            ini,
        }
    }

    /// In-memory only; nothing is ever written.
    pub fn ephemeral(name: &str) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Point the service at a different file (the per-notebook
    /// `Settings.ini`), reloading from it.
    pub fn set_override_config_path(&mut self, path: PathBuf) {
        self.ini = Ini::load_from_file(&path).unwrap_or_else(|_| Ini::new());
        self.path = Some(path);
    }

    pub fn get(&self, section_key: (&str, &str)) -> Option<&str> {
        let (section, key) = section_key;
        self.ini.get_from(Some(section), key)
    }

    pub fn get_or(&self, section_key: (&str, &str), default: &str) -> String {
        self.get(section_key).unwrap_or(default).to_string()
    }

    pub fn set(&mut self, section_key: (&str, &str), value: &str) {
        let (section, key) = section_key;
        self.ini
            .set_to(Some(section), key.to_string(), value.to_string());
        self.flush();
    }

    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };

        if let Err(e) = self.ini.write_to_file(path) {
            warn!("failed to write settings to {}: {e}", path.display());
        }
    }
}
