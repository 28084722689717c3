/// Input validators for principal payloads
///
/// Field rules for registration and profile updates:
/// 1. Required fields are non-empty after trimming
/// 2. Email is syntactically valid and length-bounded
/// 3. Phone number, when given, is an international-style number
/// 4. Password fits the bcrypt input limit
///
/// Every failure is collected so the caller reports them in one response.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 256;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 72; // bcrypt ignores anything longer

pub const STATUS_ACTIVE: &str = "active";
const ALLOWED_STATUSES: [&str; 2] = [STATUS_ACTIVE, "inactive"];

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[1-9][0-9]{6,14}$").unwrap();
}

/// Validated email, trimmed. Case is kept as given.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if let Some(at_pos) = trimmed.find('@') {
        if trimmed[..at_pos].len() > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Validated name field (`field` is used in error messages)
pub fn is_valid_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Optional phone number; blank counts as absent
pub fn is_valid_phone(phone: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    if !PHONE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("phone_number".to_string()));
    }

    Ok(Some(trimmed.to_string()))
}

pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Optional status; defaults to `active`
pub fn is_valid_status(status: Option<&str>) -> Result<String, ValidationError> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(STATUS_ACTIVE.to_string()),
        Some(s) if ALLOWED_STATUSES.contains(&s) => Ok(s.to_string()),
        Some(_) => Err(ValidationError::InvalidFormat("status".to_string())),
    }
}

/// Runs `check`, pushing its error into `errors`
pub fn collect<T>(
    errors: &mut Vec<ValidationError>,
    check: Result<T, ValidationError>,
) -> Option<T> {
    match check {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}
