//! Bearer token verification.
//!
//! The REST layer extracts the token from the `Authorization` header and hands it to a
//! [`TokenVerifier`]. The token itself is read from configuration once, at startup.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
}

/// Decides whether a bearer token grants access.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<(), AuthError>;
}

/// Accepts exactly one configured token.
#[derive(Clone)]
pub struct StaticTokenVerifier {
    token: String,
}

impl StaticTokenVerifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Result<(), AuthError> {
        if !self.token.is_empty() && token == self.token {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_verifier_accepts_only_its_token() {
        let verifier = StaticTokenVerifier::new("s3cret");
        assert!(verifier.verify("s3cret").is_ok());
        assert_eq!(verifier.verify("other"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn empty_configured_token_accepts_nothing() {
        let verifier = StaticTokenVerifier::new("");
        assert_eq!(verifier.verify(""), Err(AuthError::InvalidToken));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(Some("bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::InvalidToken));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthError::InvalidToken));
        assert_eq!(bearer_token(Some("Bearer   ")), Err(AuthError::InvalidToken));
    }
}
