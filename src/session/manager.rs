/// Session manager implementation
///
/// Every operation reads `now` once from the injected clock, so expiry
/// comparisons are consistent within one logical operation. The store is the
/// single source of truth; the rotation path is guarded by a conditional
/// write so concurrent refreshes of the same token cannot both succeed.
use crate::clock::Clock;
use crate::config::Config;
use crate::db::account::{Account, RefreshToken};
use crate::error::{AuthError, AuthResult};
use crate::mailer::Mailer;
use crate::password::PasswordHasher;
use crate::session::SessionTokens;
use crate::store::CredentialStore;
use crate::token::TokenIssuer;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Recorded as `revoked_by_ip` when sessions are cut during a password reset
const REVOKED_FOR_RESET: &str = "password-reset";

pub struct SessionManager {
    store: CredentialStore,
    passwords: PasswordHasher,
    issuer: TokenIssuer,
    mailer: Mailer,
    clock: Arc<dyn Clock>,
    config: Arc<Config>,
}

impl SessionManager {
    pub fn new(
        db: SqlitePool,
        config: Arc<Config>,
        mailer: Mailer,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        Ok(Self {
            store: CredentialStore::new(db),
            passwords: PasswordHasher::new(&config.password)?,
            issuer: TokenIssuer::new(&config.token),
            mailer,
            clock,
            config,
        })
    }

    /// Create an unconfirmed account and issue its confirmation token
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> AuthResult<Account> {
        let email = normalize_email(email);
        if self.store.email_exists(&email).await? {
            return Err(AuthError::AlreadyExists);
        }

        let now = self.clock.now();
        let confirmation_token = generate_opaque_token();

        let account = Account {
            id: Uuid::new_v4().to_string(),
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            password_hash: self.passwords.hash(password)?,
            created_at: now,
            email_confirmed: false,
            confirmation_token: Some(confirmation_token.clone()),
            confirmation_expires: Some(now + self.config.token.confirmation_ttl()),
            reset_token: None,
            reset_expires: None,
        };

        self.store.create_account(&account).await?;
        tracing::info!("Registered account {}", account.id);

        // Mail is outside the transactional boundary: a send failure never
        // rolls back the account.
        let link = format!(
            "{}/email/verify?email={}&token={}",
            self.config.app_url, account.email, confirmation_token
        );
        self.notify(
            &account.email,
            "Confirm your email address",
            &format!(
                "Hello {},\n\nPlease confirm your email address by visiting:\n\n{}\n\n\
                 This link expires in {} hours.\n",
                account.first_name,
                link,
                self.config.token.confirmation_ttl().num_hours()
            ),
        )
        .await;
        self.notify(
            &account.email,
            "Welcome",
            &format!(
                "Hello {},\n\nYour account has been created. You can sign in once \
                 your email address is confirmed.\n",
                account.first_name
            ),
        )
        .await;

        Ok(account)
    }

    /// Authenticate with email and password, returning a fresh token pair
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: &str,
    ) -> AuthResult<SessionTokens> {
        let email = normalize_email(email);

        // Unknown email and wrong password collapse into the same error to
        // resist account enumeration.
        let account = match self.store.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(AuthError::NotFound(_)) => return Err(AuthError::InvalidCredentials),
            Err(err) => return Err(err),
        };

        if !self.passwords.verify(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !account.email_confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }

        let now = self.clock.now();
        let refresh = self.new_refresh_token(&account.id, now, client_ip);
        self.store.insert_refresh_token(&refresh).await?;

        let access_token = self.issuer.issue(&account, now)?;
        tracing::info!("Login for account {} from {}", account.id, client_ip);

        Ok(SessionTokens {
            access_token,
            refresh_token: refresh.value,
        })
    }

    /// Rotate a refresh token: consume the presented token, mint a successor,
    /// and issue a fresh access token from the account's current claims.
    ///
    /// Rotation is mandatory; a token is consumed exactly once. Presenting it
    /// again always fails with `InactiveToken`, which doubles as reuse
    /// detection (the stolen-then-rotated trail stays visible through
    /// `replaced_by`).
    pub async fn refresh_session(
        &self,
        refresh_value: &str,
        client_ip: &str,
    ) -> AuthResult<SessionTokens> {
        let token = self.lookup_refresh_token(refresh_value).await?;

        let now = self.clock.now();
        if !token.is_active(now) {
            return Err(AuthError::InactiveToken);
        }

        let successor = self.new_refresh_token(&token.account_id, now, client_ip);
        self.store
            .rotate_refresh_token(&token.value, &successor, now, client_ip)
            .await?;

        let account = self.store.get_account_by_id(&token.account_id).await?;
        let access_token = self.issuer.issue(&account, now)?;
        tracing::debug!("Rotated refresh token for account {}", account.id);

        Ok(SessionTokens {
            access_token,
            refresh_token: successor.value,
        })
    }

    /// Revoke a single refresh token with no successor.
    /// Sibling tokens on the account are untouched.
    pub async fn logout(&self, refresh_value: &str, client_ip: &str) -> AuthResult<()> {
        let token = self.lookup_refresh_token(refresh_value).await?;

        let now = self.clock.now();
        if !token.is_active(now) {
            return Err(AuthError::InactiveToken);
        }

        self.store
            .revoke_refresh_token(&token.value, now, client_ip)
            .await?;
        tracing::info!("Logout for account {}", token.account_id);

        Ok(())
    }

    /// Revoke every active refresh token owned by the account in one update.
    /// Safe on an account with zero active tokens. Returns the revoked count.
    pub async fn revoke_all_sessions(&self, account_id: &str, reason: &str) -> AuthResult<u64> {
        let now = self.clock.now();
        let revoked = self.store.revoke_all_active(account_id, now, reason).await?;

        if revoked > 0 {
            tracing::info!(
                "Revoked {} active session(s) for account {} ({})",
                revoked,
                account_id,
                reason
            );
        }

        Ok(revoked)
    }

    /// Issue a password-reset token and mail the reset link.
    ///
    /// Always reports success to the caller; an unknown email changes
    /// nothing but is indistinguishable from the outside.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);

        let account = match self.store.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(AuthError::NotFound(_)) => {
                tracing::debug!("Password reset requested for unknown email");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        // Cut existing sessions before the token goes out; a fresh request
        // always overwrites a still-pending token.
        self.revoke_all_sessions(&account.id, REVOKED_FOR_RESET).await?;

        let reset_token = generate_opaque_token();
        let now = self.clock.now();
        self.store
            .set_reset_token(
                &account.id,
                &reset_token,
                now + self.config.token.reset_ttl(),
            )
            .await?;

        let link = format!(
            "{}/reset-password?email={}&token={}",
            self.config.app_url, account.email, reset_token
        );
        self.notify(
            &account.email,
            "Reset your password",
            &format!(
                "Hello {},\n\nA password reset was requested for your account. \
                 To choose a new password, visit:\n\n{}\n\n\
                 This link expires in {} hour(s) and can be used once. If you did \
                 not request a reset, you can ignore this message.\n",
                account.first_name,
                link,
                self.config.token.reset_ttl().num_hours()
            ),
        )
        .await;

        Ok(())
    }

    /// Consume a reset token and replace the password
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let email = normalize_email(email);
        let now = self.clock.now();

        let account = match self.store.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(AuthError::NotFound(_)) => return Err(AuthError::InvalidOrExpiredToken),
            Err(err) => return Err(err),
        };

        let valid = match (&account.reset_token, account.reset_expires) {
            (Some(stored), Some(expires)) => stored == token && expires >= now,
            _ => false,
        };
        if !valid {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        // Revoke again in case sessions were created between request and
        // reset.
        self.revoke_all_sessions(&account.id, REVOKED_FOR_RESET).await?;

        let password_hash = self.passwords.hash(new_password)?;
        self.store
            .replace_password(&account.id, &password_hash)
            .await?;
        tracing::info!("Password reset for account {}", account.id);

        self.notify(
            &account.email,
            "Your password has been changed",
            &format!(
                "Hello {},\n\nThe password for your account was just changed and all \
                 active sessions were signed out. If this was not you, request a new \
                 password reset immediately.\n",
                account.first_name
            ),
        )
        .await;

        Ok(())
    }

    /// Consume a confirmation token and mark the email confirmed (terminal)
    pub async fn verify_email(&self, email: &str, token: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let now = self.clock.now();

        let account = match self.store.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(AuthError::NotFound(_)) => return Err(AuthError::InvalidToken),
            Err(err) => return Err(err),
        };

        let valid = match (&account.confirmation_token, account.confirmation_expires) {
            (Some(stored), Some(expires)) => stored == token && expires >= now,
            _ => false,
        };
        if !valid {
            return Err(AuthError::InvalidToken);
        }

        self.store.confirm_email(&account.id).await?;
        tracing::info!("Email confirmed for account {}", account.id);

        Ok(())
    }

    /// Read-only lookup used by the bearer-identity boundary
    pub async fn get_account(&self, account_id: &str) -> AuthResult<Account> {
        self.store.get_account_by_id(account_id).await
    }

    /// Bearer-identity primitive: verify the access token and load the
    /// account behind its `sub` claim.
    ///
    /// A valid signature over a since-deleted account does not authenticate;
    /// every failure surfaces as a uniform `Unauthorized`.
    pub async fn authenticate(&self, bearer: &str) -> AuthResult<Account> {
        let claims = self.issuer.verify(bearer)?;

        match self.store.get_account_by_id(&claims.sub).await {
            Ok(account) => Ok(account),
            Err(AuthError::NotFound(_)) => Err(AuthError::Unauthorized),
            Err(err) => Err(err),
        }
    }

    /// Map an absent token to `InvalidToken`, leaving infrastructure errors
    /// untouched
    async fn lookup_refresh_token(&self, value: &str) -> AuthResult<RefreshToken> {
        match self.store.get_refresh_token(value).await {
            Ok(token) => Ok(token),
            Err(AuthError::NotFound(_)) => Err(AuthError::InvalidToken),
            Err(err) => Err(err),
        }
    }

    fn new_refresh_token(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        client_ip: &str,
    ) -> RefreshToken {
        RefreshToken {
            value: generate_opaque_token(),
            account_id: account_id.to_string(),
            created_at: now,
            expires_at: now + self.config.token.refresh_ttl(),
            created_by_ip: client_ip.to_string(),
            revoked_at: None,
            revoked_by_ip: None,
            replaced_by: None,
        }
    }

    /// Fire-and-forget mail: failures are logged, never propagated
    async fn notify(&self, to: &str, subject: &str, body: &str) {
        if let Err(err) = self.mailer.send(to, subject, body).await {
            tracing::warn!("Failed to send \"{}\" mail to {}: {}", subject, to, err);
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// 256 bits of entropy, URL-safe base64 without padding
fn generate_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
