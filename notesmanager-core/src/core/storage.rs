//! SQLite connection ownership and schema bootstrap.

use crate::{NotesError, Result};
use rusqlite::Connection;
use std::path::Path;

const REQUIRED_TABLES: [&str; 6] = ["users", "binders", "tabs", "notes", "labels", "colors"];

/// An open NotesManager database file.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Creates the schema in a fresh database at `path` and seeds the default
    /// colors and labels.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        enable_foreign_keys(&conn)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        log::info!("created notes database at {}", path.as_ref().display());
        Ok(Self { conn })
    }

    /// Opens an existing database, refusing files that lack the NotesManager tables.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master
             WHERE type='table'
             AND name IN ('users', 'binders', 'tabs', 'notes', 'labels', 'colors')",
            [],
            |row| row.get(0),
        )?;

        if table_count != REQUIRED_TABLES.len() as i64 {
            return Err(NotesError::InvalidDatabase(
                "Not a valid NotesManager database".to_string(),
            ));
        }

        enable_foreign_keys(&conn)?;
        log::debug!("opened notes database at {}", path.as_ref().display());
        Ok(Self { conn })
    }

    /// Opens `path` when it already holds a database, otherwise creates one.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let populated = path.metadata().map(|m| m.len() > 0).unwrap_or(false);
        if populated {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn enable_foreign_keys(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}
