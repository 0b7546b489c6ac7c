//! Errors produced while authenticating requests and while building
//! strategies.

use axum::http::HeaderName;

/// The outcome of a failed authentication attempt.
///
/// Every variant is an expected result of looking at a request: none of them
/// indicate a bug or an unrecoverable condition. The middleware only cares
/// whether authentication failed, but the variants are kept apart so that
/// strategies, tests and logs can tell a missing credential from a rejected
/// one.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No token was present in the expected header, or it lacked the required
    /// scheme prefix.
    #[error("token not found in `{header}` header")]
    TokenNotFound {
        /// The header that was inspected.
        header: HeaderName,
    },

    /// The username or the password field was absent or empty.
    #[error("credentials are missing")]
    CredentialsMissing,

    /// Form data was not valid UTF-8 or contained an invalid percent
    /// escape.
    #[error("malformed form data: {0}")]
    MalformedForm(String),

    /// A custom lookup function could not extract credentials.
    #[error("{0}")]
    Lookup(eyre::Report),

    /// The token failed to decode or verify. The library's error is kept as
    /// is, so its message (e.g. for an expired signature) is preserved.
    #[error(transparent)]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The key resolver could not provide a key for the token.
    #[error("{0}")]
    KeyUnavailable(eyre::Report),

    /// The application's verify function declined the claims or credentials.
    #[error("{0}")]
    Rejected(eyre::Report),

    /// Every strategy of a composition failed.
    #[error("authentication failed")]
    AuthenticationFailed,
}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TokenNotFound { .. }
            | Error::CredentialsMissing
            | Error::MalformedForm(_)
            | Error::Lookup(_) => ErrorKind::LookupFailed,
            Error::InvalidToken(_) | Error::KeyUnavailable(_) => ErrorKind::TokenInvalid,
            Error::Rejected(_) => ErrorKind::VerificationRejected,
            Error::AuthenticationFailed => ErrorKind::CompositionExhausted,
        }
    }
}

/// Broad classes of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credential material was absent or malformed at extraction time.
    LookupFailed,
    /// The token's signature, structure or expiry did not check out.
    TokenInvalid,
    /// The application declined otherwise well-formed credentials.
    VerificationRejected,
    /// All composed strategies failed.
    CompositionExhausted,
}

/// A misconfiguration caught while constructing a strategy or layer.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// No verify function was given.
    #[error("a verify function is required by {0}")]
    MissingVerifier(&'static str),

    /// No key resolver was given to a token strategy.
    #[error("a key resolver is required by {0}")]
    MissingKeyResolver(&'static str),

    /// A composition was given no strategies.
    #[error("at least one strategy is required to compose")]
    NoStrategies,
}
