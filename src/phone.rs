//! Emergency-contact phone numbers: pre-flight grammar and display form.
//!
//! The server is the final authority; this only spares a round trip on
//! input that cannot possibly pass.

use crate::error::PhoneError;

pub const MIN_DIGITS: usize = 7;
pub const MAX_LEN: usize = 16;

/// Longest prefix first, so the first hit is the most specific.
const COUNTRY_CODES: &[&str] = &[
    "+971", "+966", "+965", "+880", "+852", "+420", "+358", "+353", "+351", "+254", "+234", "+27",
    "+31", "+33", "+34", "+39", "+44", "+49", "+52", "+55", "+61", "+64", "+81", "+82", "+86",
    "+91", "+7", "+1",
];
const DEFAULT_COUNTRY_CODE: &str = "+1";

pub fn validate(phone: &str) -> Result<(), PhoneError> {
    let Some(digits) = phone.strip_prefix('+') else {
        return Err(PhoneError::MissingCountryCode);
    };
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::NonDigit);
    }
    if digits.len() < MIN_DIGITS {
        return Err(PhoneError::TooShort { min: MIN_DIGITS });
    }
    if phone.len() > MAX_LEN {
        return Err(PhoneError::TooLong { max: MAX_LEN });
    }
    Ok(())
}

/// Best-effort country code for display purposes.
pub fn country_code(phone: &str) -> &'static str {
    COUNTRY_CODES
        .iter()
        .copied()
        .find(|code| phone.starts_with(code))
        .unwrap_or(DEFAULT_COUNTRY_CODE)
}

/// `+1 (XXX) XXX-XXXX` for North American numbers, otherwise
/// `<code> <three digits> <rest>`. Input that does not pass [`validate`] is
/// returned untouched.
pub fn format_display(phone: &str) -> String {
    if validate(phone).is_err() {
        return phone.to_string();
    }
    if phone.len() == 12 && phone.starts_with("+1") {
        return format!("+1 ({}) {}-{}", &phone[2..5], &phone[5..8], &phone[8..]);
    }
    // an unmatched number keeps its own digits, split at the default's width
    let (head, rest) = phone.split_at(country_code(phone).len());
    let (group, tail) = rest.split_at(rest.len().min(3));
    if tail.is_empty() {
        format!("{head} {group}")
    } else {
        format!("{head} {group} {tail}")
    }
}
