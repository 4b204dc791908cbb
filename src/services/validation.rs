//! Input rules for account fields.
//!
//! Each `check_*` function returns the message for the first rule a value
//! breaks. [`FieldErrors`] collects them so a form is reported in one go.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 80;
pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 255;

/// Field name to message. Ordered so responses are stable.
pub type FieldErrors = BTreeMap<String, String>;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

/// Canonical form used for storage and lookup.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn check_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required");
    }
    if email.chars().count() > EMAIL_MAX_LEN
        || !email.contains('@')
        || !email.contains('.')
        || !email_regex().is_match(email)
    {
        return Err("Invalid email format");
    }
    Ok(())
}

pub fn check_username(username: &str) -> Result<(), &'static str> {
    let username = username.trim();
    let len = username.chars().count();
    if len == 0 {
        return Err("Username is required");
    }
    if len < USERNAME_MIN_LEN {
        return Err("Username must be at least 3 characters");
    }
    if len > USERNAME_MAX_LEN {
        return Err("Username must be less than 80 characters");
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<(), &'static str> {
    let len = password.chars().count();
    if len == 0 {
        return Err("Password is required");
    }
    if len < PASSWORD_MIN_LEN {
        return Err("Password must be at least 8 characters long");
    }
    if len > PASSWORD_MAX_LEN {
        return Err("Password must be less than 128 characters");
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err("Password must contain at least one letter");
    }
    if !password.chars().any(char::is_numeric) {
        return Err("Password must contain at least one number");
    }
    Ok(())
}

pub fn check_name(
    value: &str,
    required: &'static str,
    too_long: &'static str,
) -> Result<(), &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(required);
    }
    if value.chars().count() > NAME_MAX_LEN {
        return Err(too_long);
    }
    Ok(())
}

/// Record `result` under `field` when it failed.
pub fn collect(errors: &mut FieldErrors, field: &str, result: Result<(), &'static str>) {
    if let Err(message) = result {
        errors.insert(field.to_string(), message.to_string());
    }
}

/// A one-entry map, for single-field failures.
#[must_use]
pub fn single(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), message.into());
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_email() {
        assert!(check_email("a@x.com").is_ok());
        assert!(check_email("  first.last@sub.example.org ").is_ok());
        assert_eq!(check_email(""), Err("Email is required"));
        assert_eq!(check_email("   "), Err("Email is required"));
        assert_eq!(check_email("no-at-sign.com"), Err("Invalid email format"));
        assert_eq!(check_email("a@nodot"), Err("Invalid email format"));
        assert_eq!(check_email("a b@x.com"), Err("Invalid email format"));
    }

    #[test]
    fn test_check_username() {
        assert!(check_username("bob").is_ok());
        assert_eq!(check_username(""), Err("Username is required"));
        assert_eq!(
            check_username(" ab "),
            Err("Username must be at least 3 characters")
        );
        assert_eq!(
            check_username(&"u".repeat(81)),
            Err("Username must be less than 80 characters")
        );
        assert!(check_username(&"u".repeat(80)).is_ok());
    }

    #[test]
    fn test_check_password_reports_first_failing_rule() {
        assert!(check_password("abc12345").is_ok());
        assert!(check_password("пароль123").is_ok());
        assert!(check_password("Straße٣٤٥").is_ok());
        assert_eq!(check_password(""), Err("Password is required"));
        assert_eq!(
            check_password("abc1"),
            Err("Password must be at least 8 characters long")
        );
        assert_eq!(
            check_password(&format!("a1{}", "x".repeat(127))),
            Err("Password must be less than 128 characters")
        );
        assert_eq!(
            check_password("12345678"),
            Err("Password must contain at least one letter")
        );
        assert_eq!(
            check_password("abcdefgh"),
            Err("Password must contain at least one number")
        );
        assert_eq!(
            check_password("12345678!"),
            Err("Password must contain at least one letter")
        );
        assert_eq!(
            check_password("абвгдежз"),
            Err("Password must contain at least one number")
        );
    }

    #[test]
    fn test_collect_aggregates() {
        let mut errors = FieldErrors::new();
        collect(&mut errors, "email", check_email("bad"));
        collect(&mut errors, "username", check_username("bob"));
        collect(&mut errors, "password", check_password("short"));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors["email"], "Invalid email format");
        assert_eq!(
            errors["password"],
            "Password must be at least 8 characters long"
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
