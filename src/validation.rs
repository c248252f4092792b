//! Client-side form validation, run before any network call.

use time::PrimitiveDateTime;
use time::macros::format_description;

use crate::api::types::{ActivityDraft, OngDraft, PasswordChange, ProfileUpdate, RegisterRequest};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Substrings a nickname may not contain (case-insensitive): profanity,
/// slurs, and words that impersonate staff.
const FORBIDDEN_NICKNAME_WORDS: &[&str] = &[
    "merda", "porra", "caralho", "puta", "foder", "viado", "bicha", "cuzao", "arrombado", "idiota", "imbecil",
    "retardado", "nazista", "fascista", "racista", "macaco", "hitler", "admin", "administrador", "adm", "root",
    "suporte", "moderador", "mod",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("nickname contains a word that is not allowed")]
    ForbiddenNickname,
    #[error("email address is invalid")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("new password must differ from the current one")]
    PasswordUnchanged,
    #[error("points must not be negative")]
    NegativePoints,
    #[error("{0} must be a local date-time like 2025-01-15T09:00:00")]
    InvalidDate(&'static str),
    #[error("end date must not be before start date")]
    EndBeforeStart,
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

fn require_opt(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) => require(field, v),
        None => Ok(()),
    }
}

/// True when the nickname contains none of the forbidden words.
#[must_use]
pub fn nickname_allowed(nickname: &str) -> bool {
    let lower = nickname.to_lowercase();
    !FORBIDDEN_NICKNAME_WORDS
        .iter()
        .any(|word| lower.contains(word))
}

fn check_nickname(nickname: &str) -> Result<(), ValidationError> {
    require("nickname", nickname)?;
    if !nickname_allowed(nickname) {
        return Err(ValidationError::ForbiddenNickname);
    }
    Ok(())
}

fn check_password_len(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LEN });
    }
    Ok(())
}

/// Parse a local activity timestamp (`YYYY-MM-DDTHH:MM:SS`, no offset).
/// Leading zeros after the year may be omitted.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDate`] naming `field` when the text is
/// not a real calendar date-time in that shape.
pub fn parse_local_timestamp(field: &'static str, raw: &str) -> Result<PrimitiveDateTime, ValidationError> {
    let format = format_description!(
        "[year]-[month padding:none]-[day padding:none]T[hour padding:none]:[minute padding:none]:[second padding:none]"
    );
    PrimitiveDateTime::parse(raw.trim(), &format).map_err(|_| ValidationError::InvalidDate(field))
}

/// Zero-padded `YYYY-MM-DDTHH:MM:SS`, the form the API stores.
#[must_use]
pub fn format_local_timestamp(at: PrimitiveDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second()
    )
}

/// Validate a profile edit. Fields left as `None` are not being changed and
/// are skipped; present name, nickname and address must not be blank.
///
/// # Errors
///
/// Returns the first failing rule.
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), ValidationError> {
    require_opt("name", update.name.as_deref())?;
    if let Some(nickname) = update.nickname.as_deref() {
        check_nickname(nickname)?;
    }
    require_opt("address", update.address.as_deref())?;
    Ok(())
}

/// # Errors
///
/// Returns the first failing rule.
pub fn validate_password_change(change: &PasswordChange) -> Result<(), ValidationError> {
    require("current password", &change.current_password)?;
    check_password_len(&change.new_password)?;
    if change.new_password == change.current_password {
        return Err(ValidationError::PasswordUnchanged);
    }
    Ok(())
}

/// # Errors
///
/// Returns the first failing rule.
pub fn validate_registration(request: &RegisterRequest) -> Result<(), ValidationError> {
    require("name", &request.name)?;
    check_nickname(&request.nickname)?;
    require("email", &request.email)?;
    if !request.email.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    check_password_len(&request.password)?;
    Ok(())
}

/// # Errors
///
/// Returns the first failing rule.
pub fn validate_activity(draft: &ActivityDraft) -> Result<(), ValidationError> {
    require("title", &draft.title)?;
    require("description", &draft.description)?;
    require("location", &draft.location)?;
    if draft.points_value < 0 {
        return Err(ValidationError::NegativePoints);
    }
    let start = parse_local_timestamp("start date", &draft.start_date)?;
    let end = parse_local_timestamp("end date", &draft.end_date)?;
    if end < start {
        return Err(ValidationError::EndBeforeStart);
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the name is blank.
pub fn validate_ong(draft: &OngDraft) -> Result<(), ValidationError> {
    require("name", &draft.name)
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;
