//! Internal domain modules for the NotesManager core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod color;
pub mod dao;
pub mod error;
pub mod export;
pub mod label;
pub mod materialize;
pub mod notebook;
pub mod session;
pub mod storage;
pub mod user;
pub mod validation;

#[doc(inline)]
pub use color::{Color, ColorRegistry};
#[doc(inline)]
pub use error::{NotesError, Result};
#[doc(inline)]
pub use export::{export_notebook, read_export, write_export, ImportSummary, NotebookExport};
#[doc(inline)]
pub use label::{Label, LabelRegistry};
#[doc(inline)]
pub use materialize::{load_notebook, materialize, JoinRow};
#[doc(inline)]
pub use notebook::{Binder, Note, Notebook, Tab, MAX_LABELS_PER_NOTE};
#[doc(inline)]
pub use session::{Session, DEFAULT_TAB_NAME};
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use user::{authenticate, get_user, register, User};
