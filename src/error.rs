/// Unified error types for Gatehouse
use thiserror::Error;

/// Main error type for credential and session operations
///
/// Everything except `Database`, `Mail`, `Config`, and `Internal` is an
/// expected business outcome that callers handle explicitly. Messages on the
/// security-sensitive variants are deliberately uninformative.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An account with the given email already exists
    #[error("An account with this email already exists")]
    AlreadyExists,

    /// Unknown email or wrong password; the two cases are indistinguishable
    /// to prevent account enumeration
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Login attempted before the confirmation token was consumed
    #[error("Email address has not been confirmed")]
    EmailNotConfirmed,

    /// Presented token does not exist
    #[error("Invalid token")]
    InvalidToken,

    /// Presented token exists but is revoked or expired
    #[error("Inactive token")]
    InactiveToken,

    /// Password-reset token is missing, mismatched, or past its expiry
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access-token verification failure (parse, signature, or expiry)
    #[error("Unauthorized")]
    Unauthorized,

    /// Mail delivery errors; isolated by the session manager, never fatal
    #[error("Mail error: {0}")]
    Mail(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for credential and session operations
pub type AuthResult<T> = Result<T, AuthError>;
