/// Credential store: the narrow persistence contract
///
/// Uses sqlx runtime query building instead of compile-time macros to avoid
/// needing DATABASE_URL during compilation. "Not found" is a distinct
/// outcome (`AuthError::NotFound`) from an infrastructure failure
/// (`AuthError::Database`); callers translate it into their own taxonomy.
use crate::db::account::{Account, RefreshToken};
use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct CredentialStore {
    db: SqlitePool,
}

impl CredentialStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ==================== Accounts ====================

    pub async fn create_account(&self, account: &Account) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO account (id, email, first_name, last_name, password_hash, created_at,
                                  email_confirmed, confirmation_token, confirmation_expires,
                                  reset_token, reset_expires)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.email_confirmed)
        .bind(&account.confirmation_token)
        .bind(account.confirmation_expires)
        .bind(&account.reset_token)
        .bind(account.reset_expires)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    pub async fn get_account_by_id(&self, id: &str) -> AuthResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM account WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))
    }

    /// Lookup by normalized email; callers normalize before calling
    pub async fn get_account_by_email(&self, email: &str) -> AuthResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM account WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?
            .ok_or_else(|| AuthError::NotFound("Account not found".to_string()))
    }

    pub async fn email_exists(&self, email: &str) -> AuthResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(count > 0)
    }

    /// Mark the email confirmed and consume the confirmation token.
    /// Token and expiry are cleared together, never one without the other.
    pub async fn confirm_email(&self, account_id: &str) -> AuthResult<()> {
        sqlx::query(
            "UPDATE account
             SET email_confirmed = 1, confirmation_token = NULL, confirmation_expires = NULL
             WHERE id = ?1",
        )
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    /// Issue (or overwrite) the single-use reset token with its expiry
    pub async fn set_reset_token(
        &self,
        account_id: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query("UPDATE account SET reset_token = ?1, reset_expires = ?2 WHERE id = ?3")
            .bind(token)
            .bind(expires)
            .bind(account_id)
            .execute(&self.db)
            .await
            .map_err(AuthError::Database)?;

        Ok(())
    }

    /// Replace the password hash and consume the reset token in one write
    pub async fn replace_password(&self, account_id: &str, password_hash: &str) -> AuthResult<()> {
        sqlx::query(
            "UPDATE account
             SET password_hash = ?1, reset_token = NULL, reset_expires = NULL
             WHERE id = ?2",
        )
        .bind(password_hash)
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    // ==================== Refresh tokens ====================

    pub async fn insert_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO refresh_token (value, account_id, created_at, expires_at, created_by_ip,
                                        revoked_at, revoked_by_ip, replaced_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&token.value)
        .bind(&token.account_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .bind(&token.created_by_ip)
        .bind(token.revoked_at)
        .bind(&token.revoked_by_ip)
        .bind(&token.replaced_by)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(())
    }

    pub async fn get_refresh_token(&self, value: &str) -> AuthResult<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_token WHERE value = ?1")
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .map_err(AuthError::Database)?
            .ok_or_else(|| AuthError::NotFound("Refresh token not found".to_string()))
    }

    /// Consume `old_value` and insert its successor in one transaction.
    ///
    /// The revoke is conditional on `revoked_at IS NULL`: of two concurrent
    /// refreshes presenting the same token, exactly one wins; the loser gets
    /// `InactiveToken` and no successor row.
    pub async fn rotate_refresh_token(
        &self,
        old_value: &str,
        successor: &RefreshToken,
        now: DateTime<Utc>,
        client_ip: &str,
    ) -> AuthResult<()> {
        let mut tx = self.db.begin().await.map_err(AuthError::Database)?;

        let revoked = sqlx::query(
            "UPDATE refresh_token
             SET revoked_at = ?1, revoked_by_ip = ?2, replaced_by = ?3
             WHERE value = ?4 AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(client_ip)
        .bind(&successor.value)
        .bind(old_value)
        .execute(&mut *tx)
        .await
        .map_err(AuthError::Database)?;

        if revoked.rows_affected() == 0 {
            return Err(AuthError::InactiveToken);
        }

        sqlx::query(
            "INSERT INTO refresh_token (value, account_id, created_at, expires_at, created_by_ip,
                                        revoked_at, revoked_by_ip, replaced_by)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, NULL)",
        )
        .bind(&successor.value)
        .bind(&successor.account_id)
        .bind(successor.created_at)
        .bind(successor.expires_at)
        .bind(&successor.created_by_ip)
        .execute(&mut *tx)
        .await
        .map_err(AuthError::Database)?;

        tx.commit().await.map_err(AuthError::Database)?;

        Ok(())
    }

    /// Revoke a single token with no successor (logout).
    /// Conditional on the token still being unrevoked.
    pub async fn revoke_refresh_token(
        &self,
        value: &str,
        now: DateTime<Utc>,
        client_ip: &str,
    ) -> AuthResult<()> {
        let result = sqlx::query(
            "UPDATE refresh_token
             SET revoked_at = ?1, revoked_by_ip = ?2
             WHERE value = ?3 AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(client_ip)
        .bind(value)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::InactiveToken);
        }

        Ok(())
    }

    /// Revoke every currently-active token of an account in one write.
    /// Returns the number of tokens revoked; zero is a no-op success.
    pub async fn revoke_all_active(
        &self,
        account_id: &str,
        now: DateTime<Utc>,
        reason: &str,
    ) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_token
             SET revoked_at = ?1, revoked_by_ip = ?2, replaced_by = NULL
             WHERE account_id = ?3 AND revoked_at IS NULL AND expires_at > ?1",
        )
        .bind(now)
        .bind(reason)
        .bind(account_id)
        .execute(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(result.rows_affected())
    }

    /// Full rotation/audit trail for an account, oldest first
    pub async fn list_refresh_tokens(&self, account_id: &str) -> AuthResult<Vec<RefreshToken>> {
        let tokens = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_token WHERE account_id = ?1 ORDER BY created_at, value",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(AuthError::Database)?;

        Ok(tokens)
    }
}
