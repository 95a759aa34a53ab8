use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Revocation authority: a session id maps to its subject for as long as the
/// token carrying that id may be used.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a session that expires after `ttl`.
    async fn put(
        &self,
        session_id: SessionId,
        subject: SubjectId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError>;

    async fn get(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError>;

    /// Atomically read and remove a session. Of several concurrent callers
    /// for the same id, at most one gets `Ok`.
    async fn take(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError>;

    /// Idempotent.
    async fn delete(&self, session_id: SessionId) -> Result<(), SessionStoreError>;

    /// Idempotent.
    async fn delete_pair(
        &self,
        access_session_id: SessionId,
        refresh_session_id: SessionId,
    ) -> Result<(), SessionStoreError>;
}
