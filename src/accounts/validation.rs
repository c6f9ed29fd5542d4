//! Field rules checked before any account or post write.
//!
//! Each field contributes at most its first violation. All violations are
//! collapsed into a single `BadRequest("Error! <m1>. <m2>.")`.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidateEmail;

use crate::error::{AppError, AppResult};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;

static USERNAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

pub fn check_username(username: &str) -> Option<&'static str> {
    let username = username.trim();
    let len = username.chars().count();

    if username.is_empty() {
        return Some("Please provide a username");
    }
    if len < USERNAME_MIN {
        return Some("Please provide a username with atleast 3 characters");
    }
    if len > USERNAME_MAX {
        return Some("Please provide a username with less than 20 characters");
    }
    if !USERNAME_CHARS.is_match(username)
        || username.starts_with('_')
        || username.ends_with('_')
        || username.contains("__")
    {
        return Some(
            "Only letters, numbers & underscores allowed with no consecutive underscores at start or end",
        );
    }
    None
}

pub fn check_email(email: &str) -> Option<&'static str> {
    let email = email.trim();
    if email.is_empty() || !email.validate_email() {
        return Some("Please provide a valid email");
    }
    None
}

pub fn check_password(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        return Some("Please provide a password");
    }
    if password.chars().count() < PASSWORD_MIN {
        return Some("Password must be atleast 8 characters long");
    }
    None
}

pub fn check_content(content: &str) -> Option<&'static str> {
    if content.trim().is_empty() {
        return Some("A post must have some text");
    }
    None
}

/// Collects first-violations across fields in the order they are checked.
#[derive(Debug, Default)]
pub struct Validation {
    violations: Vec<&'static str>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn username(self, value: &str) -> Self {
        self.push(check_username(value))
    }

    pub fn email(self, value: &str) -> Self {
        self.push(check_email(value))
    }

    pub fn password(self, value: &str) -> Self {
        self.push(check_password(value))
    }

    pub fn content(self, value: &str) -> Self {
        self.push(check_content(value))
    }

    fn push(mut self, violation: Option<&'static str>) -> Self {
        if let Some(message) = violation {
            self.violations.push(message);
        }
        self
    }

    pub fn finish(self) -> AppResult<()> {
        if self.violations.is_empty() {
            return Ok(());
        }
        Err(AppError::BadRequest(format!(
            "Error! {}.",
            self.violations.join(". ")
        )))
    }
}

/// Emails are stored and looked up trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
