/// End-to-end lifecycle tests against the public API only:
/// registration through confirmation, login, rotation, logout, and the
/// password-reset flow.
use chrono::{Timelike, Utc};
use gatehouse::config::{DatabaseConfig, PasswordConfig, TokenConfig};
use gatehouse::mailer::Mailer;
use gatehouse::{db, AuthError, Config, ManualClock, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;

const CLIENT_IP: &str = "192.0.2.10";

fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            path: PathBuf::from(":memory:"),
        },
        token: TokenConfig {
            signing_key: "integration-signing-key-0123456789ab".to_string(),
            issuer: "gatehouse".to_string(),
            audience: "gatehouse-api".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
            confirmation_ttl_secs: 86_400,
            reset_ttl_secs: 3_600,
        },
        password: PasswordConfig {
            memory_kib: 8,
            iterations: 1,
        },
        app_url: "http://localhost:8080".to_string(),
        email: None,
    }
}

async fn session_manager() -> SessionManager {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let clock = ManualClock::new(Utc::now().with_nanosecond(0).unwrap());
    SessionManager::new(
        pool,
        Arc::new(test_config()),
        Mailer::new(None).unwrap(),
        Arc::new(clock),
    )
    .unwrap()
}

#[tokio::test]
async fn register_login_refresh_logout_lifecycle() {
    let manager = session_manager().await;

    // Register, then consume the confirmation token
    let account = manager
        .register("grace@example.com", "hopper-compiles", "Grace", "Hopper")
        .await
        .unwrap();
    let confirmation = account.confirmation_token.clone().unwrap();
    manager
        .verify_email("grace@example.com", &confirmation)
        .await
        .unwrap();

    // Login returns an active access/refresh pair
    let first = manager
        .login("grace@example.com", "hopper-compiles", CLIENT_IP)
        .await
        .unwrap();
    let authenticated = manager.authenticate(&first.access_token).await.unwrap();
    assert_eq!(authenticated.id, account.id);

    // Refresh rotates to a new pair and invalidates the old refresh value
    let second = manager
        .refresh_session(&first.refresh_token, CLIENT_IP)
        .await
        .unwrap();
    assert_ne!(first.refresh_token, second.refresh_token);
    assert!(matches!(
        manager.refresh_session(&first.refresh_token, CLIENT_IP).await,
        Err(AuthError::InactiveToken)
    ));

    // Logout revokes the current refresh value; a second logout fails
    manager.logout(&second.refresh_token, CLIENT_IP).await.unwrap();
    assert!(matches!(
        manager.logout(&second.refresh_token, CLIENT_IP).await,
        Err(AuthError::InactiveToken)
    ));
}

#[tokio::test]
async fn password_reset_cuts_all_prior_sessions() {
    let manager = session_manager().await;

    let account = manager
        .register("grace@example.com", "hopper-compiles", "Grace", "Hopper")
        .await
        .unwrap();
    let confirmation = account.confirmation_token.clone().unwrap();
    manager
        .verify_email("grace@example.com", &confirmation)
        .await
        .unwrap();

    let phone = manager
        .login("grace@example.com", "hopper-compiles", "192.0.2.20")
        .await
        .unwrap();
    let laptop = manager
        .login("grace@example.com", "hopper-compiles", "192.0.2.21")
        .await
        .unwrap();

    // Request a reset and consume the issued token
    manager
        .request_password_reset("grace@example.com")
        .await
        .unwrap();
    let reset_token = manager
        .get_account(&account.id)
        .await
        .unwrap()
        .reset_token
        .unwrap();
    manager
        .reset_password("grace@example.com", &reset_token, "new-and-improved")
        .await
        .unwrap();

    // The reset token is cleared and every prior refresh token is dead
    let stored = manager.get_account(&account.id).await.unwrap();
    assert!(stored.reset_token.is_none());
    assert!(stored.reset_expires.is_none());
    for tokens in [&phone, &laptop] {
        assert!(matches!(
            manager.refresh_session(&tokens.refresh_token, CLIENT_IP).await,
            Err(AuthError::InactiveToken)
        ));
    }

    // Only the new password logs in
    assert!(matches!(
        manager
            .login("grace@example.com", "hopper-compiles", CLIENT_IP)
            .await,
        Err(AuthError::InvalidCredentials)
    ));
    manager
        .login("grace@example.com", "new-and-improved", CLIENT_IP)
        .await
        .unwrap();
}
