/// Gatehouse - credential and session-token lifecycle core
///
/// Password-based authentication, signed short-lived access-token issuance,
/// long-lived refresh-token rotation with revocation chains, and time-boxed
/// single-use tokens for email confirmation and password reset. The HTTP
/// surface, resource CRUD, and mail rendering live outside this crate; it
/// talks to a relational store and a clock, nothing else.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod mailer;
pub mod password;
pub mod session;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::account::{Account, RefreshToken};
pub use error::{AuthError, AuthResult};
pub use session::{SessionManager, SessionTokens};
