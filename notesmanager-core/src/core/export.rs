//! Notebook export to, and import from, pretty-printed JSON.

use crate::{Color, Label, Notebook, NotesError, Result, Session, User};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bumped whenever the export layout changes incompatibly.
pub const EXPORT_VERSION: u32 = 1;

/// Version of the library that wrote an export.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level JSON document written by [`export_notebook`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookExport {
    pub version: u32,
    pub app_version: String,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub user: User,
    pub labels: Vec<Label>,
    pub colors: Vec<Color>,
    pub notebook: Notebook,
}

/// Counts of rows created by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub binders: usize,
    pub tabs: usize,
    pub notes: usize,
    pub labels_created: usize,
}

/// Snapshots the session's notebook together with the label and color tables.
///
/// An active label filter is respected: only the visible notes are exported.
pub fn export_notebook(session: &Session) -> NotebookExport {
    NotebookExport {
        version: EXPORT_VERSION,
        app_version: APP_VERSION.to_string(),
        exported_at: chrono::Utc::now(),
        user: session.user().clone(),
        labels: session.labels().all().to_vec(),
        colors: session.colors().all().to_vec(),
        notebook: session.notebook().clone(),
    }
}

/// Writes an export as pretty JSON, creating parent directories as needed.
pub fn write_export<P: AsRef<Path>>(export: &NotebookExport, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(export)?)?;
    log::info!("exported notebook to {}", path.display());
    Ok(())
}

/// Reads an export file back, refusing layouts newer than [`EXPORT_VERSION`].
pub fn read_export<P: AsRef<Path>>(path: P) -> Result<NotebookExport> {
    let content = fs::read_to_string(path)?;
    let export: NotebookExport = serde_json::from_str(&content)?;
    if export.version > EXPORT_VERSION {
        return Err(NotesError::ValidationFailed(format!(
            "Export version {} is newer than this application supports ({EXPORT_VERSION})",
            export.version
        )));
    }
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{register, Storage};
    use tempfile::{tempdir, NamedTempFile};

    fn session_with_content() -> (Session, NamedTempFile) {
        let temp = NamedTempFile::new().unwrap();
        let storage = Storage::create(temp.path()).unwrap();
        register(storage.connection(), "Ada", "ada@example.com", "analytical1").unwrap();
        let mut session = Session::login(storage, "ada@example.com", "analytical1").unwrap();
        let binder_id = session.create_binder("Work", Some(1)).unwrap();
        let tab_id = session.notebook().binder(binder_id).unwrap().tabs[0].id;
        let note_id = session.create_note(tab_id, "Plan", None).unwrap();
        session.update_note_content(note_id, "<h1>Q3</h1>").unwrap();
        session.attach_label(note_id, 1).unwrap();
        (session, temp)
    }

    #[test]
    fn test_export_uses_camel_case_keys() {
        let (session, _temp) = session_with_content();
        let json = serde_json::to_string(&export_notebook(&session)).unwrap();
        assert!(json.contains("\"appVersion\""));
        assert!(json.contains("\"colorId\""));
        assert!(json.contains("\"tabId\""));
        assert!(!json.contains("user_password"));
    }

    #[test]
    fn test_write_and_read_export() {
        let (session, _temp) = session_with_content();
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.json");

        let export = export_notebook(&session);
        write_export(&export, &path).unwrap();
        let back = read_export(&path).unwrap();

        assert_eq!(back.version, EXPORT_VERSION);
        assert_eq!(back.notebook, *session.notebook());
        assert_eq!(back.notebook.notes().next().unwrap().content, "<h1>Q3</h1>");
    }

    #[test]
    fn test_read_export_rejects_garbage() {
        let temp = NamedTempFile::new().unwrap();
        fs::write(temp.path(), "{ not json").unwrap();
        assert!(matches!(read_export(temp.path()), Err(crate::NotesError::Json(_))));
    }

    #[test]
    fn test_read_export_rejects_newer_version() {
        let (session, _temp) = session_with_content();
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");

        let mut export = export_notebook(&session);
        export.version = EXPORT_VERSION + 1;
        write_export(&export, &path).unwrap();

        assert!(matches!(read_export(&path), Err(NotesError::ValidationFailed(_))));
    }
}
