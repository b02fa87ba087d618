//! Platform-appropriate application directories.

use std::path::PathBuf;

const APP_NAME: &str = "fernanda";

pub fn user_data() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

pub fn config() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Root for per-notebook working directories.
pub fn temp() -> PathBuf {
    std::env::temp_dir().join(APP_NAME)
}

/// Rendezvous point for the single-instance guard.
pub fn runtime_socket(name: &str) -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(format!("{name}.sock"))
}
