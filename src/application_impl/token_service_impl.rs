use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        SessionPolicy {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

pub struct RealTokenService {
    codec: Arc<dyn ClaimsCodec>,
    session_store: Arc<dyn SessionStore>,
    user_lookup: Arc<dyn UserLookup>,
    policy: SessionPolicy,
}

impl RealTokenService {
    pub fn new(
        codec: Arc<dyn ClaimsCodec>,
        session_store: Arc<dyn SessionStore>,
        user_lookup: Arc<dyn UserLookup>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            codec,
            session_store,
            user_lookup,
            policy,
        }
    }

    /// Remaining lifetime rounded up to whole seconds, so the store entry
    /// never dies before the token it backs.
    fn ttl_until(until: DateTime<Utc>) -> Duration {
        let millis = (until - Utc::now()).num_milliseconds();
        let secs = (millis + 999) / 1000;
        Duration::from_secs(secs.max(1) as u64)
    }

    async fn create_token_pair(&self, subject: SubjectId) -> Result<TokenPair, AuthError> {
        let refresh = self
            .codec
            .encode(subject, Purpose::Refresh, self.policy.refresh_ttl, None)
            .map_err(|e| AuthError::IssueFailed(e.to_string()))?;
        let access = self
            .codec
            .encode(
                subject,
                Purpose::Access,
                self.policy.access_ttl,
                Some(refresh.session_id),
            )
            .map_err(|e| AuthError::IssueFailed(e.to_string()))?;

        self.session_store
            .put(
                refresh.session_id,
                subject,
                Self::ttl_until(refresh.expires_at),
            )
            .await
            .map_err(|e| AuthError::IssueFailed(e.to_string()))?;

        if let Err(e) = self
            .session_store
            .put(access.session_id, subject, Self::ttl_until(access.expires_at))
            .await
        {
            if let Err(cleanup) = self.session_store.delete(refresh.session_id).await {
                warn!(%subject, sid = %refresh.session_id, "orphaned refresh session left to expire: {}", cleanup);
            }
            return Err(AuthError::IssueFailed(e.to_string()));
        }

        Ok(TokenPair {
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh.token),
            access_session_id: access.session_id,
            refresh_session_id: refresh.session_id,
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}

/// Extracts the credentials of an `Authorization: Bearer <token>` header.
/// The scheme is matched case-insensitively.
pub fn bearer_token(raw_auth_header: Option<&str>) -> Option<&str> {
    let (scheme, token) = raw_auth_header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

fn unauthenticated(reason: impl std::fmt::Display) -> AuthError {
    debug!("authentication rejected: {}", reason);
    AuthError::Unauthenticated
}

fn store_fault(e: String) -> AuthError {
    error!("session store unavailable: {}", e);
    AuthError::BackendUnavailable(e)
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_session(&self, subject: SubjectId) -> Result<TokenPair, AuthError> {
        let pair = self.create_token_pair(subject).await?;
        info!(%subject, access_sid = %pair.access_session_id, refresh_sid = %pair.refresh_session_id, "session issued");
        Ok(pair)
    }

    async fn authenticate_request(
        &self,
        raw_auth_header: Option<&str>,
    ) -> Result<SessionMetadata, AuthError> {
        let token = bearer_token(raw_auth_header)
            .ok_or_else(|| unauthenticated("missing or malformed authorization header"))?;

        let claims = self
            .codec
            .decode(token, Purpose::Access)
            .map_err(unauthenticated)?;

        let stored = match self.session_store.get(claims.sid).await {
            Ok(subject) => subject,
            Err(SessionStoreError::NotFound) => {
                return Err(unauthenticated(format_args!(
                    "access session {} revoked or expired",
                    claims.sid
                )));
            }
            Err(SessionStoreError::Unavailable(e)) => return Err(store_fault(e)),
        };
        if stored != claims.sub {
            return Err(unauthenticated(format_args!(
                "access session {} belongs to another subject",
                claims.sid
            )));
        }

        let refresh_session_id = claims
            .rsid
            .ok_or_else(|| unauthenticated("access token without refresh pairing"))?;
        let token_expires_at = claims
            .expires_at()
            .ok_or_else(|| AuthError::InternalError("expiry out of range".to_string()))?;

        Ok(SessionMetadata {
            subject_id: claims.sub,
            session_id: claims.sid,
            refresh_session_id,
            token_expires_at,
        })
    }

    async fn refresh_session(&self, raw_refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .codec
            .decode(raw_refresh_token.trim(), Purpose::Refresh)
            .map_err(unauthenticated)?;
        let subject = claims.sub;

        match self.user_lookup.resolve(subject).await {
            Ok(_) => {}
            Err(UserLookupError::NotFound) => {
                return Err(unauthenticated(format_args!("subject {subject} no longer exists")));
            }
            Err(UserLookupError::Unavailable(e)) => {
                error!("user lookup unavailable: {}", e);
                return Err(AuthError::BackendUnavailable(e));
            }
        }

        // Rotation: the old refresh session is consumed before anything is issued.
        match self.session_store.take(claims.sid).await {
            Ok(stored) if stored == subject => {}
            Ok(stored) => {
                warn!(%subject, %stored, sid = %claims.sid, "refresh session bound to another subject");
                return Err(AuthError::Unauthenticated);
            }
            Err(SessionStoreError::NotFound) => {
                warn!(%subject, sid = %claims.sid, "refresh token reused or revoked");
                return Err(AuthError::Unauthenticated);
            }
            Err(SessionStoreError::Unavailable(e)) => return Err(store_fault(e)),
        }

        let pair = self.create_token_pair(subject).await.inspect_err(|e| {
            error!(%subject, retired_sid = %claims.sid, "rotation failed after retiring refresh session, re-login required: {}", e);
        })?;
        info!(%subject, retired_sid = %claims.sid, refresh_sid = %pair.refresh_session_id, "session rotated");
        Ok(pair)
    }

    async fn terminate_session(
        &self,
        access_session_id: SessionId,
        refresh_session_id: SessionId,
    ) -> Result<(), AuthError> {
        match self
            .session_store
            .delete_pair(access_session_id, refresh_session_id)
            .await
        {
            Ok(()) | Err(SessionStoreError::NotFound) => {
                info!(access_sid = %access_session_id, refresh_sid = %refresh_session_id, "session terminated");
                Ok(())
            }
            Err(SessionStoreError::Unavailable(e)) => Err(store_fault(e)),
        }
    }

    async fn logout(&self, raw_auth_header: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = bearer_token(raw_auth_header) else {
            debug!("logout without bearer token, nothing to revoke");
            return Ok(());
        };
        let claims = match self.codec.inspect(token, Purpose::Access) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("logout with unverifiable token, nothing to revoke: {}", e);
                return Ok(());
            }
        };
        let Some(refresh_session_id) = claims.rsid else {
            return Ok(());
        };
        self.terminate_session(claims.sid, refresh_session_id).await
    }
}
