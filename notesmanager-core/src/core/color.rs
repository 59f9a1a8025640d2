//! Display colors shared by binders, tabs and notes.

use crate::core::dao;
use crate::{NotesError, Result};
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// A named display color with its `#RRGGBB` hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: i64,
    pub name: String,
    pub hex: String,
}

/// Cached rows of the `colors` table. Works like [`LabelRegistry`](crate::LabelRegistry).
#[derive(Debug, Clone, Default)]
pub struct ColorRegistry {
    colors: Vec<Color>,
}

impl ColorRegistry {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut registry = Self::default();
        registry.refresh(conn)?;
        Ok(registry)
    }

    pub fn refresh(&mut self, conn: &Connection) -> Result<()> {
        self.colors = dao::select(
            conn,
            "colors",
            &["color_id", "color_name", "color_hex"],
            &[],
            &["color_id"],
            |row| {
                Ok(Color {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    hex: row.get(2)?,
                })
            },
        )?;
        log::debug!("color registry refreshed: {} colors", self.colors.len());
        Ok(())
    }

    /// Inserts a color after checking the hex string; the hex is stored upper-case.
    pub fn create(&mut self, conn: &Connection, name: &str, hex: &str) -> Result<Color> {
        let name = crate::core::validation::validate_name("Color name", name)?;
        let hex = crate::core::validation::validate_hex_color(hex)?;
        let id = dao::insert(
            conn,
            "colors",
            &[
                ("color_name", Value::Text(name.clone())),
                ("color_hex", Value::Text(hex.clone())),
            ],
        )?;
        let color = Color { id, name, hex };
        self.colors.push(color.clone());
        Ok(color)
    }

    pub fn get(&self, id: i64) -> Option<&Color> {
        self.colors.iter().find(|c| c.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Color> {
        self.colors
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Checks that an optional color reference points at a known color.
    pub fn check(&self, id: Option<i64>) -> Result<()> {
        match id {
            Some(id) if self.get(id).is_none() => Err(NotesError::not_found("Color", id)),
            _ => Ok(()),
        }
    }

    pub fn all(&self) -> &[Color] {
        &self.colors
    }
}
