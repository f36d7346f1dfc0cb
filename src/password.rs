/// Password hashing (Argon2id)
///
/// One-way, salted, adaptive. The work factor comes from configuration; the
/// resulting PHC string is opaque account-owned data. Plaintext is never
/// logged or returned.
use crate::config::PasswordConfig;
use crate::error::{AuthError, AuthResult};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> AuthResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, 1, None).map_err(|e| {
            AuthError::Config(format!("Invalid password hashing parameters: {}", e))
        })?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a plaintext candidate against a stored hash
    pub fn verify(&self, plaintext: &str, hash: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Stored password hash is malformed: {}", e)))?;

        Ok(self
            .argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }
}
