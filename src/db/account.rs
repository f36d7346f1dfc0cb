/// Account database models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account record in the database
///
/// The confirmation and reset sub-states each pair a single-use opaque token
/// with its expiry; the two columns of a pair are always written together.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// Normalized (trimmed, lowercased) and unique
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub email_confirmed: bool,
    pub confirmation_token: Option<String>,
    pub confirmation_expires: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_expires: Option<DateTime<Utc>>,
}

/// Refresh token record
///
/// `value` is generated once and immutable; revocation only ever sets the
/// `revoked_*`/`replaced_by` fields. `replaced_by` points at the successor
/// token minted during rotation, forming a forward-only chain.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RefreshToken {
    pub value: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_by_ip: String,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by_ip: Option<String>,
    pub replaced_by: Option<String>,
}

impl RefreshToken {
    /// A token is active until it is revoked or its expiry passes
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(now: DateTime<Utc>) -> RefreshToken {
        RefreshToken {
            value: "tok".to_string(),
            account_id: "acct".to_string(),
            created_at: now,
            expires_at: now + Duration::days(7),
            created_by_ip: "198.51.100.1".to_string(),
            revoked_at: None,
            revoked_by_ip: None,
            replaced_by: None,
        }
    }

    #[test]
    fn active_until_expiry() {
        let now = Utc::now();
        let t = token(now);
        assert!(t.is_active(now));
        assert!(t.is_active(now + Duration::days(7) - Duration::seconds(1)));
        // Expiry boundary is exclusive
        assert!(!t.is_active(now + Duration::days(7)));
    }

    #[test]
    fn revoked_is_never_active() {
        let now = Utc::now();
        let mut t = token(now);
        t.revoked_at = Some(now);
        assert!(!t.is_active(now));
        assert!(!t.is_active(now - Duration::hours(1)));
    }
}
