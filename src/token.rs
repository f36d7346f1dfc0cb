/// Signed access-token issuer (HS256)
///
/// Access tokens are stateless, short-lived snapshots of an account's
/// identity claims. They cannot be revoked individually; session cut-off
/// happens at the refresh-token layer.
use crate::config::TokenConfig;
use crate::db::account::Account;
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Identity claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_key.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: Duration::seconds(config.access_ttl_secs),
        }
    }

    /// Mint an access token from an account snapshot taken at `now`
    pub fn issue(&self, account: &Account, now: DateTime<Utc>) -> AuthResult<String> {
        let claims = Claims {
            sub: account.id.clone(),
            email: account.email.clone(),
            given_name: account.first_name.clone(),
            family_name: account.last_name.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Stateless verification of signature, expiry, issuer, and audience.
    ///
    /// Fails closed: every parse, signature, or expiry failure collapses into
    /// `Unauthorized` with no detail about which check failed.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Access token rejected: {}", e);
                AuthError::Unauthorized
            })
    }
}
