use crate::application_port::CredentialHasher;
use crate::domain_port::CredentialError;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

pub struct Argon2PasswordHasher;

/// Argon2 is CPU-bound, so both operations run on the blocking pool.
#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| CredentialError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| CredentialError::Hash(format!("hash task failed: {e}")))?
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, CredentialError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        tokio::task::spawn_blocking(move || verify_blocking(&password, &password_hash))
            .await
            .map_err(|e| CredentialError::Hash(format!("verify task failed: {e}")))?
    }
}

fn verify_blocking(password: &str, password_hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| CredentialError::Hash(format!("invalid PHC hash: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::Hash(format!("verify error: {e}"))),
    }
}
