use crate::domain_model::SubjectId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: SubjectId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UserLookupError {
    #[error("user not found")]
    NotFound,
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
    #[error("password hash error: {0}")]
    Hash(String),
}

#[async_trait::async_trait]
pub trait UserLookup: Send + Sync {
    async fn resolve(&self, subject: SubjectId) -> Result<Identity, UserLookupError>;
}

#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, CredentialError>;
}
