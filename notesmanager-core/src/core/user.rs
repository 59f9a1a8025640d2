//! Accounts: registration and email/password authentication.
//!
//! Passwords are stored as Argon2id PHC strings, never as plain text.

use crate::core::dao::{self, Condition};
use crate::core::validation::{validate_email, validate_name, validate_password};
use crate::{NotesError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::types::Value;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// A registered account. The password hash stays in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Validates the inputs and inserts a new account.
///
/// # Errors
///
/// [`NotesError::ValidationFailed`] for a malformed name, email or password,
/// [`NotesError::EmailTaken`] when the email already has an account.
pub fn register(conn: &Connection, name: &str, email: &str, password: &str) -> Result<User> {
    let name = validate_name("Name", name)?;
    let email = validate_email(email)?;
    validate_password(password)?;

    let hash = hash_password(password)?;
    let inserted = dao::insert(
        conn,
        "users",
        &[
            ("user_name", Value::Text(name.clone())),
            ("user_email", Value::Text(email.clone())),
            ("user_password", Value::Text(hash)),
        ],
    );
    let id = match inserted {
        Ok(id) => id,
        Err(NotesError::ConstraintViolation(_)) => return Err(NotesError::EmailTaken(email)),
        Err(e) => return Err(e),
    };

    log::info!("registered user {id}");
    Ok(User { id, name, email })
}

/// Returns the account matching `email` when `password` verifies against its hash.
///
/// An unknown email and a wrong password both yield
/// [`NotesError::InvalidCredentials`].
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User> {
    let email = email.trim().to_lowercase();
    let found = dao::select(
        conn,
        "users",
        &["user_id", "user_name", "user_email", "user_password"],
        &[Condition::eq("user_email", email)],
        &[],
        |row| {
            Ok((
                User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                },
                row.get::<_, String>(3)?,
            ))
        },
    )?;

    let Some((user, hash)) = found.into_iter().next() else {
        log::warn!("login attempt for unknown email");
        return Err(NotesError::InvalidCredentials);
    };
    if !verify_password(password, &hash)? {
        log::warn!("wrong password for user {}", user.id);
        return Err(NotesError::InvalidCredentials);
    }
    Ok(user)
}

/// Loads an account by id.
pub fn get_user(conn: &Connection, id: i64) -> Result<User> {
    dao::select(
        conn,
        "users",
        &["user_id", "user_name", "user_email"],
        &[Condition::eq("user_id", id)],
        &[],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    )?
    .into_iter()
    .next()
    .ok_or_else(|| NotesError::not_found("User", id))
}

/// Hashes a plaintext password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks a plaintext password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
