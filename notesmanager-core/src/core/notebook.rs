//! The in-memory notebook: binders owning tabs owning notes.
//!
//! Children refer to their parent by id only. Navigation from a child to its
//! parent goes through the [`Notebook`] lookup methods.

use crate::Label;
use serde::{Deserialize, Serialize};

/// Most labels a single note may carry.
pub const MAX_LABELS_PER_NOTE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub name: String,
    /// Rich text body, stored verbatim.
    pub content: String,
    pub color_id: Option<i64>,
    pub tab_id: i64,
    pub labels: Vec<Label>,
}

impl Note {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn has_label_id(&self, id: i64) -> bool {
        self.labels.iter().any(|l| l.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: i64,
    pub name: String,
    pub color_id: Option<i64>,
    pub binder_id: i64,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binder {
    pub id: i64,
    pub name: String,
    pub color_id: Option<i64>,
    pub user_id: i64,
    pub tabs: Vec<Tab>,
}

/// Every binder owned by one user, in the order the database returned them.
///
/// A notebook is a view, not a table: it is rebuilt from the binders, tabs and
/// notes rows by [`materialize`](crate::materialize).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub user_id: i64,
    pub binders: Vec<Binder>,
}

impl Notebook {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            binders: Vec::new(),
        }
    }

    pub fn binder(&self, id: i64) -> Option<&Binder> {
        self.binders.iter().find(|b| b.id == id)
    }

    pub fn binder_mut(&mut self, id: i64) -> Option<&mut Binder> {
        self.binders.iter_mut().find(|b| b.id == id)
    }

    pub fn tab(&self, id: i64) -> Option<&Tab> {
        self.tabs().find(|t| t.id == id)
    }

    pub fn tab_mut(&mut self, id: i64) -> Option<&mut Tab> {
        self.binders
            .iter_mut()
            .flat_map(|b| b.tabs.iter_mut())
            .find(|t| t.id == id)
    }

    pub fn note(&self, id: i64) -> Option<&Note> {
        self.notes().find(|n| n.id == id)
    }

    pub fn note_mut(&mut self, id: i64) -> Option<&mut Note> {
        self.binders
            .iter_mut()
            .flat_map(|b| b.tabs.iter_mut())
            .flat_map(|t| t.notes.iter_mut())
            .find(|n| n.id == id)
    }

    /// Resolves the binder a tab belongs to.
    pub fn binder_of_tab(&self, tab_id: i64) -> Option<&Binder> {
        self.tab(tab_id).and_then(|t| self.binder(t.binder_id))
    }

    /// Resolves the tab a note belongs to.
    pub fn tab_of_note(&self, note_id: i64) -> Option<&Tab> {
        self.note(note_id).and_then(|n| self.tab(n.tab_id))
    }

    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.binders.iter().flat_map(|b| b.tabs.iter())
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.tabs().flat_map(|t| t.notes.iter())
    }

    pub fn remove_binder(&mut self, id: i64) -> Option<Binder> {
        let index = self.binders.iter().position(|b| b.id == id)?;
        Some(self.binders.remove(index))
    }

    pub fn remove_tab(&mut self, id: i64) -> Option<Tab> {
        self.binders.iter_mut().find_map(|b| {
            let index = b.tabs.iter().position(|t| t.id == id)?;
            Some(b.tabs.remove(index))
        })
    }

    pub fn remove_note(&mut self, id: i64) -> Option<Note> {
        self.binders
            .iter_mut()
            .flat_map(|b| b.tabs.iter_mut())
            .find_map(|t| {
                let index = t.notes.iter().position(|n| n.id == id)?;
                Some(t.notes.remove(index))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: i64, tab_id: i64) -> Note {
        Note {
            id,
            name: format!("Note {id}"),
            content: String::new(),
            color_id: None,
            tab_id,
            labels: vec![],
        }
    }

    fn sample() -> Notebook {
        Notebook {
            user_id: 1,
            binders: vec![
                Binder {
                    id: 10,
                    name: "Work".to_string(),
                    color_id: None,
                    user_id: 1,
                    tabs: vec![Tab {
                        id: 100,
                        name: "Meetings".to_string(),
                        color_id: Some(2),
                        binder_id: 10,
                        notes: vec![note(1000, 100), note(1001, 100)],
                    }],
                },
                Binder {
                    id: 20,
                    name: "Home".to_string(),
                    color_id: None,
                    user_id: 1,
                    tabs: vec![Tab {
                        id: 200,
                        name: "Recipes".to_string(),
                        color_id: None,
                        binder_id: 20,
                        notes: vec![note(2000, 200)],
                    }],
                },
            ],
        }
    }

    #[test]
    fn test_lookup_walks_all_levels() {
        let nb = sample();
        assert_eq!(nb.note(2000).unwrap().tab_id, 200);
        assert_eq!(nb.tab_of_note(1001).unwrap().name, "Meetings");
        assert_eq!(nb.binder_of_tab(200).unwrap().name, "Home");
        assert!(nb.note(9).is_none());
        assert_eq!(nb.notes().count(), 3);
    }

    #[test]
    fn test_remove_note_only_touches_owner() {
        let mut nb = sample();
        let removed = nb.remove_note(1000).unwrap();
        assert_eq!(removed.id, 1000);
        assert_eq!(nb.tab(100).unwrap().notes.len(), 1);
        assert_eq!(nb.tab(200).unwrap().notes.len(), 1);
        assert!(nb.remove_note(1000).is_none());
    }

    #[test]
    fn test_remove_binder_drops_children() {
        let mut nb = sample();
        nb.remove_binder(10).unwrap();
        assert!(nb.tab(100).is_none());
        assert_eq!(nb.binders.len(), 1);
    }

    #[test]
    fn test_has_label() {
        let mut n = note(1, 1);
        n.labels.push(Label { id: 2, name: "Todo".to_string() });
        assert!(n.has_label("Todo"));
        assert!(n.has_label_id(2));
        assert!(n.has_label("todo"));
        assert!(!n.has_label("Idea"));
    }
}
