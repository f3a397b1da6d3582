//! User profile field validation.

use crate::error::CoreError;

/// Maximum username length (characters).
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum full name length (characters).
pub const MAX_FULL_NAME_LENGTH: usize = 100;

/// Maximum avatar URL length (bytes).
pub const MAX_AVATAR_URL_LENGTH: usize = 2048;

fn bounded(field: &str, value: &str, max: usize) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max {
        return Err(CoreError::Validation(format!(
            "{field} exceeds maximum length of {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// Trim a username; letters, digits, `_`, `-` and `.` only.
pub fn validate_username(username: &str) -> Result<String, CoreError> {
    let username = bounded("Username", username, MAX_USERNAME_LENGTH)?;
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(CoreError::Validation(
            "Username may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    Ok(username)
}

pub fn validate_full_name(full_name: &str) -> Result<String, CoreError> {
    bounded("Full name", full_name, MAX_FULL_NAME_LENGTH)
}

/// Avatars must be absolute `http(s)` URLs.
pub fn validate_avatar_url(url: &str) -> Result<String, CoreError> {
    let url = url.trim();
    if url.len() > MAX_AVATAR_URL_LENGTH {
        return Err(CoreError::Validation(format!(
            "Avatar URL exceeds maximum length of {MAX_AVATAR_URL_LENGTH} bytes"
        )));
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(CoreError::Validation(
            "Avatar URL must start with http:// or https://".into(),
        ));
    }
    Ok(url.to_string())
}
