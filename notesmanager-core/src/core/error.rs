//! Error types for the NotesManager core library.

use rusqlite::ErrorCode;
use thiserror::Error;

/// All errors that can occur within the NotesManager core library.
#[derive(Debug, Error)]
pub enum NotesError {
    /// A SQLite operation failed for a reason other than a constraint.
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// A UNIQUE, FOREIGN KEY, CHECK or NOT NULL constraint rejected the statement.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),

    /// A binder, tab, note, label, color or user does not exist for this account.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// User input did not pass format validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Registration was attempted with an email that already has an account.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// No account matches the supplied email and password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// A note already carries two labels.
    #[error("Note {0} already has two labels")]
    LabelLimit(i64),

    /// The opened file is not a NotesManager database.
    #[error("Invalid database: {0}")]
    InvalidDatabase(String),

    /// A stored password hash could not be produced or parsed.
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings or export data could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`NotesError`].
pub type Result<T> = std::result::Result<T, NotesError>;

impl From<rusqlite::Error> for NotesError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(err),
            _ => Self::Database(err),
        }
    }
}

impl From<argon2::password_hash::Error> for NotesError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(err.to_string())
    }
}

impl NotesError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true for errors caused by a rejected constraint rather than a failure.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }

    /// Stable machine-readable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::NotFound { .. } => "not_found",
            Self::ValidationFailed(_) => "validation_failed",
            Self::EmailTaken(_) => "email_taken",
            Self::InvalidCredentials => "invalid_credentials",
            Self::LabelLimit(_) => "label_limit",
            Self::InvalidDatabase(_) => "invalid_database",
            Self::PasswordHash(_) => "password_hash",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::ConstraintViolation(_) => "That entry already exists or is still in use".to_string(),
            Self::NotFound { kind, .. } => format!("{kind} no longer exists"),
            Self::ValidationFailed(msg) => msg.clone(),
            Self::EmailTaken(email) => format!("An account already exists for {email}"),
            Self::InvalidCredentials => "Wrong email or password, please try again".to_string(),
            Self::LabelLimit(_) => "A note can carry at most two labels".to_string(),
            Self::InvalidDatabase(_) => "Could not open the notes database".to_string(),
            Self::PasswordHash(_) => "Could not verify the password".to_string(),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
