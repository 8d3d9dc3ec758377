//! Input validation utilities.
//!
//! Pure format predicates applied by services when records are created or updated. Each
//! predicate has a single fixed error message, exposed as a constant so the HTTP layer and
//! tests agree on the wording.

use crate::{LogisticsError, LogisticsResult};
use regex::Regex;
use std::sync::LazyLock;

pub const INVALID_EMAIL: &str = "Invalid email format";
pub const INVALID_PHONE: &str = "Invalid phone number format";
pub const INVALID_DIMENSIONS: &str = "Invalid dimensions format. Use LxWxHin";
pub const NEGATIVE_INVENTORY: &str = "Kit inventory cannot drop below zero";
pub const INVALID_TEMP_RANGE: &str = "Invalid temperature range format";
pub const INVALID_POSTAL_CODE: &str = "Invalid postal code format";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid regex"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("valid regex"));
static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+x\d+x\d+in$").expect("valid regex"));
static TEMP_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(-\d+)?°[CF]$").expect("valid regex"));
static US_POSTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid regex"));
static CA_POSTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d[A-Z]\s?\d[A-Z]\d$").expect("valid regex"));

pub fn validate_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Optional leading `+`, optional leading `1`, then 9 to 15 digits.
pub fn validate_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

/// `LxWxHin`, integers only, inches only.
pub fn validate_dimensions(dimensions: &str) -> bool {
    DIMENSIONS.is_match(dimensions)
}

/// A single temperature or a range followed by `°C` or `°F`, e.g. `2-8°C`.
pub fn validate_temp_range(temp_range: &str) -> bool {
    TEMP_RANGE.is_match(temp_range)
}

/// Validates a postal code for the given ISO country code.
///
/// US and CA codes are checked against their national formats; codes for any other country
/// only need to be non-empty.
pub fn validate_postal_code(code: &str, country: &str) -> bool {
    match country {
        "US" => US_POSTAL.is_match(code),
        "CA" => CA_POSTAL.is_match(code),
        _ => !code.is_empty(),
    }
}

/// Turns a failed predicate into a `LogisticsError::Validation` carrying `message`.
///
/// # Errors
///
/// Returns `LogisticsError::Validation` if `ok` is false.
pub(crate) fn require(ok: bool, message: &str) -> LogisticsResult<()> {
    if ok {
        Ok(())
    } else {
        Err(LogisticsError::Validation(message.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_require_inches() {
        assert!(validate_dimensions("10x10x10in"));
        assert!(validate_dimensions("24x18x12in"));
        assert!(!validate_dimensions("10x10x10cm"));
        assert!(!validate_dimensions("10x10in"));
        assert!(!validate_dimensions("10.5x10x10in"));
    }

    #[test]
    fn us_postal_codes() {
        assert!(validate_postal_code("12345", "US"));
        assert!(validate_postal_code("12345-6789", "US"));
        assert!(!validate_postal_code("ABCDE", "US"));
        assert!(!validate_postal_code("1234", "US"));
    }

    #[test]
    fn ca_postal_codes() {
        assert!(validate_postal_code("K1A 0B1", "CA"));
        assert!(validate_postal_code("K1A0B1", "CA"));
        assert!(!validate_postal_code("k1a 0b1", "CA"));
    }

    #[test]
    fn other_countries_only_need_a_value() {
        assert!(validate_postal_code("SW1A 1AA", "GB"));
        assert!(!validate_postal_code("", "GB"));
    }

    #[test]
    fn emails() {
        assert!(validate_email("coordinator@site-01.example.org"));
        assert!(!validate_email("coordinator.example.org"));
        assert!(!validate_email("a@b"));
    }

    #[test]
    fn phones() {
        assert!(validate_phone("+15551234567"));
        assert!(validate_phone("555123456"));
        assert!(!validate_phone("555-123-4567"));
        assert!(!validate_phone("12345"));
    }

    #[test]
    fn temperature_ranges() {
        assert!(validate_temp_range("2-8°C"));
        assert!(validate_temp_range("70°F"));
        assert!(!validate_temp_range("2-8C"));
        assert!(!validate_temp_range("-20°C"));
    }

    #[test]
    fn require_maps_to_validation_error() {
        let err = require(false, INVALID_EMAIL).unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(m) if m == INVALID_EMAIL));
        assert!(require(true, INVALID_EMAIL).is_ok());
    }
}
