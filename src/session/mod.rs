/// Session management system
///
/// Owns the refresh-token rotation/revocation protocol and the single-use
/// token flows for registration confirmation and password reset, and
/// orchestrates the credential store, password hasher, token issuer, and
/// mailer.

mod manager;

pub use manager::SessionManager;

use serde::{Deserialize, Serialize};

/// Access/refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Short-lived signed access token
    pub access_token: String,
    /// Long-lived opaque refresh token, consumed exactly once on refresh
    pub refresh_token: String,
}
