use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    pub sub: SubjectId,
    pub sid: SessionId,
    /// Session id of the refresh token issued alongside an access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsid: Option<SessionId>,
    pub purpose: Purpose,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Debug, Clone)]
pub struct EncodedToken {
    pub token: String,
    pub session_id: SessionId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token purpose")]
    WrongPurpose,
    #[error("malformed token")]
    Malformed,
    #[error("encode error: {0}")]
    Encode(String),
}

/// Pure signing and verification of session tokens. No I/O.
pub trait ClaimsCodec: Send + Sync {
    /// Mints a fresh session id and signs it with the secret bound to
    /// `purpose`. Access tokens must name their paired refresh session.
    fn encode(
        &self,
        subject: SubjectId,
        purpose: Purpose,
        ttl: Duration,
        refresh_session_id: Option<SessionId>,
    ) -> Result<EncodedToken, CodecError>;

    fn decode(&self, token: &str, purpose: Purpose) -> Result<Claims, CodecError>;

    /// Like `decode` but does not reject expired tokens.
    fn inspect(&self, token: &str, purpose: Purpose) -> Result<Claims, CodecError>;
}
