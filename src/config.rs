/// Configuration management for Gatehouse
///
/// All tunable state (signing key, token lifetimes, hashing work factor) is
/// carried in an explicit structure injected at construction; nothing reads
/// ambient globals after startup.
use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub token: TokenConfig,
    pub password: PasswordConfig,
    /// Base URL used when building confirmation and reset links
    pub app_url: String,
    pub email: Option<EmailConfig>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// Token issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Symmetric HS256 signing key for access tokens
    pub signing_key: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub confirmation_ttl_secs: i64,
    pub reset_ttl_secs: i64,
}

impl TokenConfig {
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_ttl_secs)
    }

    pub fn confirmation_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.confirmation_ttl_secs)
    }

    pub fn reset_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reset_ttl_secs)
    }
}

/// Password hashing work factor (Argon2id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let database_path = env::var("GATEHOUSE_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/gatehouse.sqlite"));

        let signing_key = env::var("GATEHOUSE_SIGNING_KEY")
            .map_err(|_| AuthError::Config("Signing key required".to_string()))?;
        let issuer = env::var("GATEHOUSE_TOKEN_ISSUER")
            .unwrap_or_else(|_| "gatehouse".to_string());
        let audience = env::var("GATEHOUSE_TOKEN_AUDIENCE")
            .unwrap_or_else(|_| "gatehouse-api".to_string());

        let access_ttl_secs = env_i64("GATEHOUSE_ACCESS_TTL_SECS", 900);
        let refresh_ttl_secs = env_i64("GATEHOUSE_REFRESH_TTL_SECS", 604_800);
        let confirmation_ttl_secs = env_i64("GATEHOUSE_CONFIRMATION_TTL_SECS", 86_400);
        let reset_ttl_secs = env_i64("GATEHOUSE_RESET_TTL_SECS", 3_600);

        let memory_kib = env_i64("GATEHOUSE_HASH_MEMORY_KIB", 19_456) as u32;
        let iterations = env_i64("GATEHOUSE_HASH_ITERATIONS", 2) as u32;

        let app_url = env::var("GATEHOUSE_APP_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let email = if let Ok(smtp_url) = env::var("GATEHOUSE_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("GATEHOUSE_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "noreply@localhost".to_string()),
            })
        } else {
            None
        };

        Ok(Config {
            database: DatabaseConfig {
                path: database_path,
            },
            token: TokenConfig {
                signing_key,
                issuer,
                audience,
                access_ttl_secs,
                refresh_ttl_secs,
                confirmation_ttl_secs,
                reset_ttl_secs,
            },
            password: PasswordConfig {
                memory_kib,
                iterations,
            },
            app_url,
            email,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.token.signing_key.len() < 32 {
            return Err(AuthError::Config(
                "Signing key must be at least 32 bytes".to_string(),
            ));
        }

        for (name, value) in [
            ("access", self.token.access_ttl_secs),
            ("refresh", self.token.refresh_ttl_secs),
            ("confirmation", self.token.confirmation_ttl_secs),
            ("reset", self.token.reset_ttl_secs),
        ] {
            if value <= 0 {
                return Err(AuthError::Config(format!(
                    "{} token TTL must be positive",
                    name
                )));
            }
        }

        if self.app_url.is_empty() {
            return Err(AuthError::Config("App URL cannot be empty".to_string()));
        }

        Ok(())
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
            },
            token: TokenConfig {
                signing_key: "0123456789abcdef0123456789abcdef".to_string(),
                issuer: "gatehouse".to_string(),
                audience: "gatehouse-api".to_string(),
                access_ttl_secs: 900,
                refresh_ttl_secs: 604_800,
                confirmation_ttl_secs: 86_400,
                reset_ttl_secs: 3_600,
            },
            password: PasswordConfig {
                memory_kib: 19_456,
                iterations: 2,
            },
            app_url: "http://localhost:8080".to_string(),
            email: None,
        }
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_signing_key() {
        let mut config = valid_config();
        config.token.signing_key = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_ttl() {
        let mut config = valid_config();
        config.token.reset_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn ttl_helpers_match_seconds() {
        let config = valid_config();
        assert_eq!(config.token.access_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.token.refresh_ttl(), chrono::Duration::days(7));
    }
}
