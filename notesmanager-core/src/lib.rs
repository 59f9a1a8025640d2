//! Core library for NotesManager: binders, tabs and notes kept in SQLite.
//!
//! Start with [`Storage`] to open a database, [`register`] an account, then
//! [`Session::login`] to reach the user's [`Notebook`]. All mutations go
//! through `Session` methods.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use crate::core::{
    color::{Color, ColorRegistry},
    dao,
    error::{NotesError, Result},
    export::{
        export_notebook, read_export, write_export, ImportSummary, NotebookExport, APP_VERSION,
        EXPORT_VERSION,
    },
    label::{Label, LabelRegistry},
    materialize::{load_notebook, materialize, JoinRow},
    notebook::{Binder, Note, Notebook, Tab, MAX_LABELS_PER_NOTE},
    session::{Session, DEFAULT_TAB_NAME},
    storage::Storage,
    user::{authenticate, get_user, register, User},
    validation,
};
