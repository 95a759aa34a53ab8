use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Errors surfaced to request handlers. Codec and store failures are
/// classified into these before they leave the token service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, forged, expired, revoked or wrong-purpose token.
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("auth backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("token issuance failed: {0}")]
    IssueFailed(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_session_id: SessionId,
    pub refresh_session_id: SessionId,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionMetadata {
    pub subject_id: SubjectId,
    pub session_id: SessionId,
    pub refresh_session_id: SessionId,
    pub token_expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn issue_session(&self, subject: SubjectId) -> Result<TokenPair, AuthError>;

    /// `raw_auth_header` is the verbatim `Authorization` header value, if any.
    async fn authenticate_request(
        &self,
        raw_auth_header: Option<&str>,
    ) -> Result<SessionMetadata, AuthError>;

    /// Single-use: the presented refresh token is retired before a new pair
    /// is issued.
    async fn refresh_session(&self, raw_refresh_token: &str) -> Result<TokenPair, AuthError>;

    async fn terminate_session(
        &self,
        access_session_id: SessionId,
        refresh_session_id: SessionId,
    ) -> Result<(), AuthError>;

    /// Retires the session named by a bearer access token. A missing or
    /// unverifiable token has nothing to revoke and is not an error.
    async fn logout(&self, raw_auth_header: Option<&str>) -> Result<(), AuthError>;
}
