//! Labels and the label registry.

use crate::core::dao::{self, Condition};
use crate::{NotesError, Result};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// A named tag a note may carry; a note holds at most two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub name: String,
}

/// Cached id ↔ name pairs from the `labels` table.
///
/// The cache is filled on [`load`](Self::load) and only changes through
/// [`refresh`](Self::refresh) or [`create`](Self::create).
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    labels: Vec<Label>,
}

impl LabelRegistry {
    /// Builds a registry populated from the database.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut registry = Self::default();
        registry.refresh(conn)?;
        Ok(registry)
    }

    /// Re-reads every label, replacing the cached set.
    pub fn refresh(&mut self, conn: &Connection) -> Result<()> {
        self.labels = dao::select(
            conn,
            "labels",
            &["label_id", "label_name"],
            &[],
            &["label_id"],
            |row| {
                Ok(Label {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?;
        log::debug!("label registry refreshed: {} labels", self.labels.len());
        Ok(())
    }

    /// Inserts a new label and adds it to the cache.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::ConstraintViolation`] if a label with the same name exists.
    pub fn create(&mut self, conn: &Connection, name: &str) -> Result<Label> {
        let name = crate::core::validation::validate_name("Label name", name)?;
        let id = dao::insert(conn, "labels", &[("label_name", Value::Text(name.clone()))])?;
        let label = Label { id, name };
        log::info!("created label {} ({})", label.id, label.name);
        self.labels.push(label.clone());
        Ok(label)
    }

    /// Deletes a label; notes that carried it lose the reference.
    pub fn delete(&mut self, conn: &Connection, id: i64) -> Result<bool> {
        let removed = dao::delete(conn, "labels", &[Condition::eq("label_id", id)])?;
        if removed > 0 {
            self.labels.retain(|l| l.id != id);
        }
        Ok(removed > 0)
    }

    pub fn get(&self, id: i64) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    /// Label names are matched case-insensitively, like the `labels` table.
    pub fn find_by_name(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Looks a label up by id, failing with [`NotesError::NotFound`].
    pub fn require(&self, id: i64) -> Result<&Label> {
        self.get(id).ok_or_else(|| NotesError::not_found("Label", id))
    }

    pub fn all(&self) -> &[Label] {
        &self.labels
    }
}
