//! Application settings persistence for NotesManager.
//!
//! Stores the database location and the last email used to log in in a JSON
//! file at an OS-appropriate location. Passwords are never written here.

use notesmanager_core::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// SQLite file holding users, binders, tabs and notes.
    pub database_path: String,
    /// Email of the last successful login, offered as the default next time.
    #[serde(default)]
    pub last_email: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path().to_string_lossy().to_string(),
            last_email: None,
        }
    }
}

/// Returns the path to the settings JSON file.
///
/// - macOS / Linux: `~/.config/notesmanager/settings.json`
/// - Windows: `%APPDATA%/NotesManager/settings.json`
pub fn settings_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("NotesManager").join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("notesmanager").join("settings.json")
    }
}

/// Returns the default database file: `~/Documents/NotesManager/notes.db`.
pub fn default_database_path() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Documents")
        })
        .join("NotesManager")
        .join("notes.db")
}

/// Loads settings from `path`; returns defaults if the file is missing or corrupt.
pub fn load_settings(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring corrupt settings file {}: {e}", path.display());
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}
