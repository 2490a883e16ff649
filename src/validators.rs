/// Input validators for identity provisioning
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Email format validation
/// 3. Permission level shape checks

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_PERMISSION_LEVEL_LENGTH: usize = 32;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref PERMISSION_LEVEL_REGEX: Regex = Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap();
}

/// Canonical form used as the store key: trimmed, ASCII-lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validates email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
/// - Rejects oversized local parts and null bytes
///
/// Returns the normalized address.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let normalized = normalize_email(email);
    let trimmed = normalized.as_str();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(normalized)
}

/// Validates a permission level name such as `user` or `admin`
pub fn is_valid_permission_level(level: &str) -> Result<String, ValidationError> {
    let trimmed = level.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("permission level".to_string()));
    }

    if trimmed.len() > MAX_PERMISSION_LEVEL_LENGTH {
        return Err(ValidationError::TooLong(
            "permission level".to_string(),
            MAX_PERMISSION_LEVEL_LENGTH,
        ));
    }

    if !PERMISSION_LEVEL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("permission level".to_string()));
    }

    Ok(trimmed.to_string())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return true;
        }
    }

    email.contains('\0')
}
