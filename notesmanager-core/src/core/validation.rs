//! Format checks run on user input before it reaches the database.

use crate::{NotesError, Result};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
});
static LETTER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z]").expect("valid regex"));
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").expect("valid regex"));
static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid regex"));

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 64;

/// Trims and lower-cases an email address, then checks its shape.
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(NotesError::ValidationFailed(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email)
}

/// Passwords must be 8–64 characters with at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(NotesError::ValidationFailed(format!(
            "Password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
        )));
    }
    if !LETTER_RE.is_match(password) || !DIGIT_RE.is_match(password) {
        return Err(NotesError::ValidationFailed(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }
    Ok(())
}

/// Trims a display name and rejects empty, over-long or control-character names.
///
/// `what` names the field in the error message, e.g. `"Binder name"`.
pub fn validate_name(what: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NotesError::ValidationFailed(format!("{what} cannot be empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(NotesError::ValidationFailed(format!(
            "{what} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(NotesError::ValidationFailed(format!(
            "{what} contains control characters"
        )));
    }
    Ok(name.to_string())
}

/// Accepts `#RRGGBB` in either case and returns it upper-cased.
pub fn validate_hex_color(hex: &str) -> Result<String> {
    let hex = hex.trim();
    if !HEX_RE.is_match(hex) {
        return Err(NotesError::ValidationFailed(format!(
            "'{hex}' is not a #RRGGBB color"
        )));
    }
    Ok(hex.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert_eq!(validate_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@c.de").is_err());
    }

    #[test]
    fn test_password() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("1234567890").is_err());
        assert!(validate_password(&"a1".repeat(40)).is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(validate_name("Binder name", "  Work  ").unwrap(), "Work");
        assert!(validate_name("Binder name", "   ").is_err());
        assert!(validate_name("Binder name", "tab\there").is_err());
        let err = validate_name("Tab name", &"x".repeat(65)).unwrap_err();
        assert!(err.to_string().contains("Tab name"));
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(validate_hex_color("#a1b2c3").unwrap(), "#A1B2C3");
        assert!(validate_hex_color("a1b2c3").is_err());
        assert!(validate_hex_color("#a1b2c").is_err());
    }
}
