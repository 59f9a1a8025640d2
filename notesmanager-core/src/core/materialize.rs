//! Rebuilds a [`Notebook`] from the flattened binders ⋈ tabs ⋈ notes ⋈ labels join.
//!
//! The join is read in binder, tab, note order. Grouping relies on that order:
//! all rows of one binder (and of one tab inside it) must be adjacent. The
//! query in [`load_notebook`] guarantees it with its `ORDER BY`; nothing here
//! re-checks it.

use crate::{Binder, Label, Note, Notebook, Result, Tab};
use rusqlite::{Connection, Row};

/// One row of the outer join. Tab and note columns are `None` where the outer
/// join found no child.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinRow {
    pub binder_id: i64,
    pub binder_name: String,
    pub binder_color_id: Option<i64>,
    pub tab_id: Option<i64>,
    pub tab_name: Option<String>,
    pub tab_color_id: Option<i64>,
    pub note_id: Option<i64>,
    pub note_name: Option<String>,
    pub note_content: Option<String>,
    pub note_color_id: Option<i64>,
    pub label1: Option<Label>,
    pub label2: Option<Label>,
}

impl JoinRow {
    /// Labels carried by the row's note, without duplicates.
    fn labels(&self) -> Vec<Label> {
        let mut labels = Vec::with_capacity(2);
        for label in [&self.label1, &self.label2].into_iter().flatten() {
            if !labels.iter().any(|l: &Label| l.id == label.id) {
                labels.push(label.clone());
            }
        }
        labels
    }

    fn carries_label(&self, name: &str) -> bool {
        [&self.label1, &self.label2]
            .into_iter()
            .flatten()
            .any(|l| l.name.eq_ignore_ascii_case(name))
    }
}

const NOTEBOOK_QUERY: &str = "
    SELECT b.binder_id, b.binder_name, b.binder_color_id,
           t.tab_id, t.tab_name, t.tab_color_id,
           n.note_id, n.note_name, n.note_content, n.note_color_id,
           l1.label_id, l1.label_name,
           l2.label_id, l2.label_name
    FROM binders b
    LEFT JOIN tabs t ON t.binder_id = b.binder_id
    LEFT JOIN notes n ON n.tab_id = t.tab_id
    LEFT JOIN labels l1 ON l1.label_id = n.note_label1_id
    LEFT JOIN labels l2 ON l2.label_id = n.note_label2_id
    WHERE b.user_id = ?1
    ORDER BY b.binder_id, t.tab_id, n.note_id";

fn map_join_row(row: &Row<'_>) -> rusqlite::Result<JoinRow> {
    let label = |id: Option<i64>, name: Option<String>| match (id, name) {
        (Some(id), Some(name)) => Some(Label { id, name }),
        _ => None,
    };
    Ok(JoinRow {
        binder_id: row.get(0)?,
        binder_name: row.get(1)?,
        binder_color_id: row.get(2)?,
        tab_id: row.get(3)?,
        tab_name: row.get(4)?,
        tab_color_id: row.get(5)?,
        note_id: row.get(6)?,
        note_name: row.get(7)?,
        note_content: row.get(8)?,
        note_color_id: row.get(9)?,
        label1: label(row.get(10)?, row.get(11)?),
        label2: label(row.get(12)?, row.get(13)?),
    })
}

/// Reads every binder, tab and note of `user_id` and groups them into a notebook.
///
/// With `label_filter` set, only notes carrying a label of that exact name are
/// kept, and only the tabs and binders holding such notes appear.
pub fn load_notebook(conn: &Connection, user_id: i64, label_filter: Option<&str>) -> Result<Notebook> {
    let mut stmt = conn.prepare(NOTEBOOK_QUERY)?;
    let rows = stmt
        .query_map([user_id], map_join_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let notebook = materialize(user_id, rows, label_filter);
    log::debug!(
        "materialized notebook for user {user_id}: {} binders, {} notes",
        notebook.binders.len(),
        notebook.notes().count()
    );
    Ok(notebook)
}

/// Groups ordered join rows into binders, tabs and notes.
///
/// The filter is applied to each row before grouping, so a row without a
/// matching note contributes nothing, not even its binder or tab.
pub fn materialize<I>(user_id: i64, rows: I, label_filter: Option<&str>) -> Notebook
where
    I: IntoIterator<Item = JoinRow>,
{
    let mut notebook = Notebook::new(user_id);
    let mut current_binder: Option<i64> = None;
    let mut current_tab: Option<i64> = None;

    for row in rows {
        if let Some(filter) = label_filter {
            if !row.carries_label(filter) {
                continue;
            }
        }

        if current_binder != Some(row.binder_id) {
            current_binder = Some(row.binder_id);
            current_tab = None;
            notebook.binders.push(Binder {
                id: row.binder_id,
                name: row.binder_name.clone(),
                color_id: row.binder_color_id,
                user_id,
                tabs: Vec::new(),
            });
        }
        let Some(binder) = notebook.binders.last_mut() else {
            continue;
        };

        let Some(tab_id) = row.tab_id else {
            continue;
        };
        if current_tab != Some(tab_id) {
            current_tab = Some(tab_id);
            binder.tabs.push(Tab {
                id: tab_id,
                name: row.tab_name.clone().unwrap_or_default(),
                color_id: row.tab_color_id,
                binder_id: row.binder_id,
                notes: Vec::new(),
            });
        }
        let Some(tab) = binder.tabs.last_mut() else {
            continue;
        };

        if let Some(note_id) = row.note_id {
            let labels = row.labels();
            tab.notes.push(Note {
                id: note_id,
                name: row.note_name.unwrap_or_default(),
                content: row.note_content.unwrap_or_default(),
                color_id: row.note_color_id,
                tab_id,
                labels,
            });
        }
    }

    notebook
}
