//! Input normalization shared by handlers and repositories

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern compiles")
});

/// Lowercase and trim an email address, rejecting anything that is not one.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let normalized = email.trim().to_lowercase();
    if normalized.len() > 320 || !EMAIL_PATTERN.is_match(&normalized) {
        return Err(AppError::InvalidInput(format!(
            "Invalid email address: {}",
            email.trim()
        )));
    }
    Ok(normalized)
}
