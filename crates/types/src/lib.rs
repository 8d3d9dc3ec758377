//! Small validated value types shared across the Odyssey crates.

/// Maximum length of a business key (`trial_id`, `tracking_number`, ...).
pub const MAX_KEY_LEN: usize = 100;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text exceeded the permitted length
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    /// The input text carried leading or trailing whitespace where none is allowed
    #[error("Text cannot start or end with whitespace")]
    Padded,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The unique business key of a record within its collection.
///
/// Keys are opaque strings: non-empty, free of surrounding whitespace and at most
/// [`MAX_KEY_LEN`] characters long. Keys are never normalised, so `"TRIAL001"` and
/// `"trial001"` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusinessKey(NonEmptyText);

impl BusinessKey {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        let text = NonEmptyText::new(input)?;
        if text.as_str() != input {
            return Err(TextError::Padded);
        }
        if text.as_str().chars().count() > MAX_KEY_LEN {
            return Err(TextError::TooLong { max: MAX_KEY_LEN });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Boston General  ").unwrap();
        assert_eq!(text.as_str(), "Boston General");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
        assert_eq!(NonEmptyText::new("").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn business_key_enforces_length() {
        assert!(BusinessKey::parse("SHIP001").is_ok());
        let long = "X".repeat(MAX_KEY_LEN + 1);
        assert_eq!(
            BusinessKey::parse(long).unwrap_err(),
            TextError::TooLong { max: MAX_KEY_LEN }
        );
    }

    #[test]
    fn business_key_rejects_surrounding_whitespace() {
        assert_eq!(BusinessKey::parse(" SHIP001 ").unwrap_err(), TextError::Padded);
        assert_eq!(BusinessKey::parse("SHIP001\t").unwrap_err(), TextError::Padded);
        assert_eq!(BusinessKey::parse("  ").unwrap_err(), TextError::Empty);
        assert_eq!(BusinessKey::parse("SHIP 001").unwrap().as_str(), "SHIP 001");
    }

    #[test]
    fn business_key_is_case_sensitive() {
        let upper = BusinessKey::parse("TRIAL001").unwrap();
        let lower = BusinessKey::parse("trial001").unwrap();
        assert_ne!(upper, lower);
    }
}
