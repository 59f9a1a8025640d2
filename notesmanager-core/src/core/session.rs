//! A logged-in user's view of the database.
//!
//! Every mutation follows the same order: write the row first, then mirror the
//! change into the in-memory [`Notebook`] only when the statement touched a row.

use crate::core::dao::{self, nullable, Condition};
use crate::core::export::{ImportSummary, NotebookExport};
use crate::core::validation::validate_name;
use crate::{
    authenticate, load_notebook, Binder, Color, ColorRegistry, Label, LabelRegistry, Note, Notebook,
    NotesError, Result, Storage, Tab, User, MAX_LABELS_PER_NOTE,
};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

/// Name of the tab every new binder starts with.
pub const DEFAULT_TAB_NAME: &str = "New Tab";

/// The main-window state reached through [`Session::login`].
///
/// Owns the storage handle, the label and color registries, the authenticated
/// user and that user's materialized notebook.
pub struct Session {
    storage: Storage,
    user: User,
    labels: LabelRegistry,
    colors: ColorRegistry,
    notebook: Notebook,
    label_filter: Option<String>,
}

impl Session {
    /// Authenticates and loads the user's notebook.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::InvalidCredentials`] when the email/password pair
    /// does not match an account.
    pub fn login(storage: Storage, email: &str, password: &str) -> Result<Self> {
        let user = authenticate(storage.connection(), email, password)?;
        let labels = LabelRegistry::load(storage.connection())?;
        let colors = ColorRegistry::load(storage.connection())?;
        let notebook = load_notebook(storage.connection(), user.id, None)?;
        log::info!("user {} logged in", user.id);
        Ok(Self {
            storage,
            user,
            labels,
            colors,
            notebook,
            label_filter: None,
        })
    }

    /// Ends the session and hands back the storage for another login.
    pub fn logout(self) -> Storage {
        log::info!("user {} logged out", self.user.id);
        self.storage
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn notebook(&self) -> &Notebook {
        &self.notebook
    }

    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    pub fn colors(&self) -> &ColorRegistry {
        &self.colors
    }

    pub fn label_filter(&self) -> Option<&str> {
        self.label_filter.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    /// Re-reads registries and the notebook from the database.
    pub fn reload(&mut self) -> Result<()> {
        let conn = self.storage.connection();
        self.labels.refresh(conn)?;
        self.colors.refresh(conn)?;
        self.notebook = load_notebook(conn, self.user.id, self.label_filter.as_deref())?;
        Ok(())
    }

    /// Shows only notes carrying the named label, or everything with `None`.
    ///
    /// # Errors
    ///
    /// [`NotesError::NotFound`] when no label has that name (case ignored).
    pub fn set_label_filter(&mut self, label: Option<&str>) -> Result<()> {
        self.label_filter = match label {
            Some(name) => Some(
                self.labels
                    .find_by_name(name)
                    .ok_or_else(|| NotesError::not_found("Label", name))?
                    .name
                    .clone(),
            ),
            None => None,
        };
        self.notebook = load_notebook(
            self.storage.connection(),
            self.user.id,
            self.label_filter.as_deref(),
        )?;
        Ok(())
    }

    // ── Binders ──────────────────────────────────────────────────────

    /// Creates a binder together with its default tab; both rows or neither.
    ///
    /// Returns the new binder's id.
    pub fn create_binder(&mut self, name: &str, color_id: Option<i64>) -> Result<i64> {
        let name = validate_name("Binder name", name)?;
        self.colors.check(color_id)?;

        let tx = self.storage.connection_mut().transaction()?;
        let binder_id = dao::insert(
            &tx,
            "binders",
            &[
                ("binder_name", Value::Text(name.clone())),
                ("binder_color_id", nullable(color_id)),
                ("user_id", Value::Integer(self.user.id)),
            ],
        )?;
        let tab_id = dao::insert(
            &tx,
            "tabs",
            &[
                ("tab_name", Value::Text(DEFAULT_TAB_NAME.to_string())),
                ("tab_color_id", nullable(color_id)),
                ("binder_id", Value::Integer(binder_id)),
            ],
        )?;
        tx.commit()?;
        log::info!("created binder {binder_id} with default tab {tab_id}");

        if self.label_filter.is_none() {
            self.notebook.binders.push(Binder {
                id: binder_id,
                name,
                color_id,
                user_id: self.user.id,
                tabs: vec![Tab {
                    id: tab_id,
                    name: DEFAULT_TAB_NAME.to_string(),
                    color_id,
                    binder_id,
                    notes: Vec::new(),
                }],
            });
        }
        Ok(binder_id)
    }

    /// Renames a binder. Returns whether a row changed.
    pub fn rename_binder(&mut self, binder_id: i64, name: &str) -> Result<bool> {
        let name = validate_name("Binder name", name)?;
        let changed = self.update_binder(binder_id, "binder_name", Value::Text(name.clone()))?;
        if changed {
            if let Some(binder) = self.notebook.binder_mut(binder_id) {
                binder.name = name;
            }
        }
        Ok(changed)
    }

    pub fn set_binder_color(&mut self, binder_id: i64, color_id: Option<i64>) -> Result<bool> {
        self.colors.check(color_id)?;
        let changed = self.update_binder(binder_id, "binder_color_id", nullable(color_id))?;
        if changed {
            if let Some(binder) = self.notebook.binder_mut(binder_id) {
                binder.color_id = color_id;
            }
        }
        Ok(changed)
    }

    /// Deletes a binder with all its tabs and notes.
    pub fn delete_binder(&mut self, binder_id: i64) -> Result<bool> {
        let removed = dao::delete(
            self.storage.connection(),
            "binders",
            &[
                Condition::eq("binder_id", binder_id),
                Condition::eq("user_id", self.user.id),
            ],
        )?;
        if removed > 0 {
            self.notebook.remove_binder(binder_id);
            log::info!("deleted binder {binder_id}");
        }
        Ok(removed > 0)
    }

    fn update_binder(&self, binder_id: i64, column: &str, value: Value) -> Result<bool> {
        let changed = dao::update(
            self.storage.connection(),
            "binders",
            &[(column, value)],
            &[
                Condition::eq("binder_id", binder_id),
                Condition::eq("user_id", self.user.id),
            ],
        )?;
        Ok(changed > 0)
    }

    // ── Tabs ─────────────────────────────────────────────────────────

    pub fn create_tab(&mut self, binder_id: i64, name: &str, color_id: Option<i64>) -> Result<i64> {
        let name = validate_name("Tab name", name)?;
        self.colors.check(color_id)?;
        self.ensure_binder_owned(binder_id)?;

        let tab_id = dao::insert(
            self.storage.connection(),
            "tabs",
            &[
                ("tab_name", Value::Text(name.clone())),
                ("tab_color_id", nullable(color_id)),
                ("binder_id", Value::Integer(binder_id)),
            ],
        )?;
        log::info!("created tab {tab_id} in binder {binder_id}");

        if self.label_filter.is_none() {
            if let Some(binder) = self.notebook.binder_mut(binder_id) {
                binder.tabs.push(Tab {
                    id: tab_id,
                    name,
                    color_id,
                    binder_id,
                    notes: Vec::new(),
                });
            }
        }
        Ok(tab_id)
    }

    pub fn rename_tab(&mut self, tab_id: i64, name: &str) -> Result<bool> {
        let name = validate_name("Tab name", name)?;
        self.ensure_tab_owned(tab_id)?;
        let changed = dao::update(
            self.storage.connection(),
            "tabs",
            &[("tab_name", Value::Text(name.clone()))],
            &[Condition::eq("tab_id", tab_id)],
        )? > 0;
        if changed {
            if let Some(tab) = self.notebook.tab_mut(tab_id) {
                tab.name = name;
            }
        }
        Ok(changed)
    }

    pub fn set_tab_color(&mut self, tab_id: i64, color_id: Option<i64>) -> Result<bool> {
        self.colors.check(color_id)?;
        self.ensure_tab_owned(tab_id)?;
        let changed = dao::update(
            self.storage.connection(),
            "tabs",
            &[("tab_color_id", nullable(color_id))],
            &[Condition::eq("tab_id", tab_id)],
        )? > 0;
        if changed {
            if let Some(tab) = self.notebook.tab_mut(tab_id) {
                tab.color_id = color_id;
            }
        }
        Ok(changed)
    }

    /// Deletes a tab and its notes.
    pub fn delete_tab(&mut self, tab_id: i64) -> Result<bool> {
        self.ensure_tab_owned(tab_id)?;
        let removed = dao::delete(
            self.storage.connection(),
            "tabs",
            &[Condition::eq("tab_id", tab_id)],
        )?;
        if removed > 0 {
            self.notebook.remove_tab(tab_id);
            log::info!("deleted tab {tab_id}");
        }
        Ok(removed > 0)
    }

    // ── Notes ────────────────────────────────────────────────────────

    pub fn create_note(&mut self, tab_id: i64, name: &str, color_id: Option<i64>) -> Result<i64> {
        let name = validate_name("Note name", name)?;
        self.colors.check(color_id)?;
        self.ensure_tab_owned(tab_id)?;

        let note_id = dao::insert(
            self.storage.connection(),
            "notes",
            &[
                ("note_name", Value::Text(name.clone())),
                ("note_content", Value::Text(String::new())),
                ("note_color_id", nullable(color_id)),
                ("tab_id", Value::Integer(tab_id)),
            ],
        )?;
        log::info!("created note {note_id} in tab {tab_id}");

        if self.label_filter.is_none() {
            if let Some(tab) = self.notebook.tab_mut(tab_id) {
                tab.notes.push(Note {
                    id: note_id,
                    name,
                    content: String::new(),
                    color_id,
                    tab_id,
                    labels: Vec::new(),
                });
            }
        }
        Ok(note_id)
    }

    pub fn rename_note(&mut self, note_id: i64, name: &str) -> Result<bool> {
        let name = validate_name("Note name", name)?;
        let changed = self.update_note(note_id, "note_name", Value::Text(name.clone()))?;
        if changed {
            if let Some(note) = self.notebook.note_mut(note_id) {
                note.name = name;
            }
        }
        Ok(changed)
    }

    pub fn set_note_color(&mut self, note_id: i64, color_id: Option<i64>) -> Result<bool> {
        self.colors.check(color_id)?;
        let changed = self.update_note(note_id, "note_color_id", nullable(color_id))?;
        if changed {
            if let Some(note) = self.notebook.note_mut(note_id) {
                note.color_id = color_id;
            }
        }
        Ok(changed)
    }

    /// Replaces the note body. Content is stored as given, rich-text markup included.
    pub fn update_note_content(&mut self, note_id: i64, content: &str) -> Result<bool> {
        let changed = self.update_note(note_id, "note_content", Value::Text(content.to_string()))?;
        if changed {
            if let Some(note) = self.notebook.note_mut(note_id) {
                note.content = content.to_string();
            }
        }
        Ok(changed)
    }

    pub fn delete_note(&mut self, note_id: i64) -> Result<bool> {
        self.ensure_note_owned(note_id)?;
        let removed = dao::delete(
            self.storage.connection(),
            "notes",
            &[Condition::eq("note_id", note_id)],
        )?;
        if removed > 0 {
            self.notebook.remove_note(note_id);
            log::info!("deleted note {note_id}");
        }
        Ok(removed > 0)
    }

    fn update_note(&self, note_id: i64, column: &str, value: Value) -> Result<bool> {
        self.ensure_note_owned(note_id)?;
        let changed = dao::update(
            self.storage.connection(),
            "notes",
            &[(column, value)],
            &[Condition::eq("note_id", note_id)],
        )?;
        Ok(changed > 0)
    }

    // ── Labels ───────────────────────────────────────────────────────

    /// Puts `label_id` into the note's first free label slot.
    ///
    /// Returns `false` when the note already carries the label.
    ///
    /// # Errors
    ///
    /// [`NotesError::LabelLimit`] when both slots are taken by other labels,
    /// [`NotesError::NotFound`] for an unknown label or a foreign note.
    pub fn attach_label(&mut self, note_id: i64, label_id: i64) -> Result<bool> {
        let label = self.labels.require(label_id)?.clone();
        self.ensure_note_owned(note_id)?;

        let tx = self.storage.connection_mut().transaction()?;
        let (slot1, slot2) = label_slots(&tx, note_id)?;
        if slot1 == Some(label_id) || slot2 == Some(label_id) {
            return Ok(false);
        }
        let column = match (slot1, slot2) {
            (None, _) => "note_label1_id",
            (Some(_), None) => "note_label2_id",
            (Some(_), Some(_)) => return Err(NotesError::LabelLimit(note_id)),
        };
        let changed = dao::update(
            &tx,
            "notes",
            &[(column, Value::Integer(label_id))],
            &[Condition::eq("note_id", note_id)],
        )?;
        tx.commit()?;

        if changed > 0 {
            log::debug!("attached label {label_id} to note {note_id}");
            self.mirror_labels(note_id, |labels| {
                if labels.len() < MAX_LABELS_PER_NOTE {
                    labels.push(label);
                }
            })?;
        }
        Ok(changed > 0)
    }

    /// Clears whichever label slot holds `label_id`. Returns `false` if neither did.
    pub fn detach_label(&mut self, note_id: i64, label_id: i64) -> Result<bool> {
        self.ensure_note_owned(note_id)?;

        let tx = self.storage.connection_mut().transaction()?;
        let (slot1, slot2) = label_slots(&tx, note_id)?;
        let mut changed = 0;
        if slot1 == Some(label_id) {
            changed += dao::update(
                &tx,
                "notes",
                &[("note_label1_id", Value::Null)],
                &[Condition::eq("note_id", note_id)],
            )?;
        }
        if slot2 == Some(label_id) {
            changed += dao::update(
                &tx,
                "notes",
                &[("note_label2_id", Value::Null)],
                &[Condition::eq("note_id", note_id)],
            )?;
        }
        tx.commit()?;

        if changed > 0 {
            log::debug!("detached label {label_id} from note {note_id}");
            self.mirror_labels(note_id, |labels| labels.retain(|l| l.id != label_id))?;
        }
        Ok(changed > 0)
    }

    /// Creates a label and makes it available to every note.
    pub fn create_label(&mut self, name: &str) -> Result<Label> {
        self.labels.create(self.storage.connection(), name)
    }

    /// Creates a color and makes it available to binders, tabs and notes.
    pub fn create_color(&mut self, name: &str, hex: &str) -> Result<Color> {
        self.colors.create(self.storage.connection(), name, hex)
    }

    // ── Import ───────────────────────────────────────────────────────

    /// Recreates an exported notebook under this user, with fresh ids.
    ///
    /// Every name is validated before the database is touched. Labels are
    /// matched by name and created when missing; a note whose labels map to the
    /// same label keeps it once. Color references are kept only when the color
    /// id exists here. Labels, binders, tabs and notes are written in one
    /// transaction, and the label registry is refreshed only after it commits.
    pub fn import_notebook(&mut self, export: &NotebookExport) -> Result<ImportSummary> {
        let plan = self.plan_import(export)?;
        let mut summary = ImportSummary::default();

        let tx = self.storage.connection_mut().transaction()?;
        let mut created: Vec<Label> = Vec::new();
        for name in &plan.new_labels {
            let id = dao::insert(&tx, "labels", &[("label_name", Value::Text(name.clone()))])?;
            created.push(Label { id, name: name.clone() });
        }
        let labels = &self.labels;
        let label_id = |name: &str| -> Option<i64> {
            labels
                .find_by_name(name)
                .or_else(|| created.iter().find(|l| l.name.eq_ignore_ascii_case(name)))
                .map(|l| l.id)
        };

        for binder in &plan.binders {
            let binder_id = dao::insert(
                &tx,
                "binders",
                &[
                    ("binder_name", Value::Text(binder.name.clone())),
                    ("binder_color_id", nullable(binder.color_id)),
                    ("user_id", Value::Integer(self.user.id)),
                ],
            )?;
            summary.binders += 1;
            for tab in &binder.tabs {
                let tab_id = dao::insert(
                    &tx,
                    "tabs",
                    &[
                        ("tab_name", Value::Text(tab.name.clone())),
                        ("tab_color_id", nullable(tab.color_id)),
                        ("binder_id", Value::Integer(binder_id)),
                    ],
                )?;
                summary.tabs += 1;
                for note in &tab.notes {
                    let mut slots = note.labels.iter().filter_map(|name| label_id(name.as_str()));
                    dao::insert(
                        &tx,
                        "notes",
                        &[
                            ("note_name", Value::Text(note.name.clone())),
                            ("note_content", Value::Text(note.content.clone())),
                            ("note_color_id", nullable(note.color_id)),
                            ("tab_id", Value::Integer(tab_id)),
                            ("note_label1_id", nullable(slots.next())),
                            ("note_label2_id", nullable(slots.next())),
                        ],
                    )?;
                    summary.notes += 1;
                }
            }
        }
        tx.commit()?;
        summary.labels_created = created.len();
        log::info!(
            "imported {} binders, {} tabs, {} notes for user {}",
            summary.binders,
            summary.tabs,
            summary.notes,
            self.user.id
        );

        self.labels.refresh(self.storage.connection())?;
        self.notebook = load_notebook(
            self.storage.connection(),
            self.user.id,
            self.label_filter.as_deref(),
        )?;
        Ok(summary)
    }

    /// Validates an export and resolves its label and color references.
    fn plan_import(&self, export: &NotebookExport) -> Result<ImportPlan> {
        let mut label_names: Vec<(i64, String)> = Vec::new();
        let mut new_labels: Vec<String> = Vec::new();
        for label in &export.labels {
            let name = validate_name("Label name", &label.name)?;
            let known = self.labels.find_by_name(&name).is_some()
                || new_labels.iter().any(|n| n.eq_ignore_ascii_case(&name));
            if !known {
                new_labels.push(name.clone());
            }
            label_names.push((label.id, name));
        }
        let label_name = |id: i64| {
            label_names
                .iter()
                .find(|(old, _)| *old == id)
                .map(|(_, name)| name.clone())
        };
        let known_color = |id: Option<i64>| id.filter(|id| self.colors.get(*id).is_some());

        let mut binders = Vec::with_capacity(export.notebook.binders.len());
        for binder in &export.notebook.binders {
            let mut tabs = Vec::with_capacity(binder.tabs.len());
            for tab in &binder.tabs {
                let mut notes = Vec::with_capacity(tab.notes.len());
                for note in &tab.notes {
                    let mut labels: Vec<String> = Vec::with_capacity(MAX_LABELS_PER_NOTE);
                    for name in note.labels.iter().filter_map(|l| label_name(l.id)) {
                        if labels.len() < MAX_LABELS_PER_NOTE
                            && !labels.iter().any(|n| n.eq_ignore_ascii_case(&name))
                        {
                            labels.push(name);
                        }
                    }
                    notes.push(ImportedNote {
                        name: validate_name("Note name", &note.name)?,
                        content: note.content.clone(),
                        color_id: known_color(note.color_id),
                        labels,
                    });
                }
                tabs.push(ImportedTab {
                    name: validate_name("Tab name", &tab.name)?,
                    color_id: known_color(tab.color_id),
                    notes,
                });
            }
            binders.push(ImportedBinder {
                name: validate_name("Binder name", &binder.name)?,
                color_id: known_color(binder.color_id),
                tabs,
            });
        }
        Ok(ImportPlan { new_labels, binders })
    }

    /// Applies a label change to the in-memory note, honouring an active filter.
    fn mirror_labels<F>(&mut self, note_id: i64, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Label>),
    {
        if let Some(filter) = self.label_filter.clone() {
            // Membership under the filter may have changed in either direction.
            self.notebook = load_notebook(self.storage.connection(), self.user.id, Some(&filter))?;
        } else if let Some(note) = self.notebook.note_mut(note_id) {
            apply(&mut note.labels);
        }
        Ok(())
    }

    // ── Ownership checks ─────────────────────────────────────────────

    fn ensure_binder_owned(&self, binder_id: i64) -> Result<()> {
        let found = dao::select(
            self.storage.connection(),
            "binders",
            &["binder_id"],
            &[
                Condition::eq("binder_id", binder_id),
                Condition::eq("user_id", self.user.id),
            ],
            &[],
            |row| row.get::<_, i64>(0),
        )?;
        if found.is_empty() {
            return Err(NotesError::not_found("Binder", binder_id));
        }
        Ok(())
    }

    fn ensure_tab_owned(&self, tab_id: i64) -> Result<()> {
        let owner: Option<i64> = self
            .storage
            .connection()
            .query_row(
                "SELECT b.user_id FROM tabs t JOIN binders b ON b.binder_id = t.binder_id
                 WHERE t.tab_id = ?1",
                [tab_id],
                |row| row.get(0),
            )
            .optional()?;
        match owner {
            Some(owner) if owner == self.user.id => Ok(()),
            _ => Err(NotesError::not_found("Tab", tab_id)),
        }
    }

    fn ensure_note_owned(&self, note_id: i64) -> Result<()> {
        let owner: Option<i64> = self
            .storage
            .connection()
            .query_row(
                "SELECT b.user_id FROM notes n
                 JOIN tabs t ON t.tab_id = n.tab_id
                 JOIN binders b ON b.binder_id = t.binder_id
                 WHERE n.note_id = ?1",
                [note_id],
                |row| row.get(0),
            )
            .optional()?;
        match owner {
            Some(owner) if owner == self.user.id => Ok(()),
            _ => Err(NotesError::not_found("Note", note_id)),
        }
    }
}

/// A validated export, ready to be written.
struct ImportPlan {
    new_labels: Vec<String>,
    binders: Vec<ImportedBinder>,
}

struct ImportedBinder {
    name: String,
    color_id: Option<i64>,
    tabs: Vec<ImportedTab>,
}

struct ImportedTab {
    name: String,
    color_id: Option<i64>,
    notes: Vec<ImportedNote>,
}

struct ImportedNote {
    name: String,
    content: String,
    color_id: Option<i64>,
    labels: Vec<String>,
}

fn label_slots(conn: &Connection, note_id: i64) -> Result<(Option<i64>, Option<i64>)> {
    dao::select(
        conn,
        "notes",
        &["note_label1_id", "note_label2_id"],
        &[Condition::eq("note_id", note_id)],
        &[],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?
    .into_iter()
    .next()
    .ok_or_else(|| NotesError::not_found("Note", note_id))
}
