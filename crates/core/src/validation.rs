//! Recipient and message-body validation for outbound notifications.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Maximum SMS body length in characters.
pub const MAX_SMS_LENGTH: usize = 160;

/// Accepts E.164-ish international numbers and zero-prefixed local numbers.
pub const PHONE_PATTERN: &str = r"^(\+?[1-9]\d{1,14}|0\d{9,14})$";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PHONE_PATTERN).expect("valid regex"));

/// Validate an SMS recipient phone number.
pub fn validate_phone_number(phone: &str) -> Result<(), CoreError> {
    if phone.is_empty() {
        return Err(CoreError::validation("phone number must not be empty"));
    }
    if !PHONE_RE.is_match(phone) {
        return Err(CoreError::validation("phone number format is invalid"));
    }
    Ok(())
}

/// Validate an SMS body: non-empty and at most [`MAX_SMS_LENGTH`] characters.
///
/// Length is counted in Unicode scalar values, not bytes.
pub fn validate_sms_body(body: &str) -> Result<(), CoreError> {
    if body.is_empty() {
        return Err(CoreError::validation("SMS body must not be empty"));
    }
    if body.chars().count() > MAX_SMS_LENGTH {
        return Err(CoreError::Validation(format!(
            "SMS body exceeds the {MAX_SMS_LENGTH} character limit"
        )));
    }
    Ok(())
}

/// Validate a push device token is present.
pub fn validate_device_token(token: &str) -> Result<(), CoreError> {
    if token.trim().is_empty() {
        return Err(CoreError::validation("device token must not be empty"));
    }
    Ok(())
}
