#![allow(dead_code)]

use sessiongate::application_impl::*;
use sessiongate::application_port::*;
use sessiongate::domain_model::*;
use sessiongate::domain_port::*;
use sessiongate::infra_memory::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const ACCESS_SECRET: &[u8] = b"integration-access-secret";
pub const REFRESH_SECRET: &[u8] = b"integration-refresh-secret";
pub const ISSUER: &str = "sessiongate.test";
pub const AUDIENCE: &str = "integration";

pub fn codec() -> Arc<JwtHs256Codec> {
    Arc::new(JwtHs256Codec::new(JwtConfig {
        issuer: ISSUER.to_string(),
        audience: AUDIENCE.to_string(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
    }))
}

/// User lookup that knows a fixed list of subject ids.
pub struct KnownSubjects(pub Vec<SubjectId>);

#[async_trait::async_trait]
impl UserLookup for KnownSubjects {
    async fn resolve(&self, subject: SubjectId) -> Result<Identity, UserLookupError> {
        if !self.0.contains(&subject) {
            return Err(UserLookupError::NotFound);
        }
        Ok(Identity {
            id: subject,
            email: format!("user{}@example.com", subject),
            first_name: "Test".to_string(),
            last_name: format!("User{}", subject),
        })
    }
}

pub fn known_subjects() -> Arc<KnownSubjects> {
    Arc::new(KnownSubjects(vec![
        SubjectId(1),
        SubjectId(2),
        SubjectId(3),
        SubjectId(7),
        SubjectId(42),
    ]))
}

pub fn token_service(store: Arc<dyn SessionStore>) -> RealTokenService {
    RealTokenService::new(codec(), store, known_subjects(), SessionPolicy::default())
}

pub fn bearer(pair: &TokenPair) -> String {
    format!("Bearer {}", pair.access_token.0)
}

/// Memory store with switchable failures.
pub struct FaultyStore {
    pub inner: MemorySessionStore,
    pub fail_reads: AtomicBool,
    pub fail_deletes: AtomicBool,
    fail_writes_from: AtomicUsize,
    writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new() -> Self {
        FaultyStore {
            inner: MemorySessionStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_writes_from: AtomicUsize::new(usize::MAX),
            writes: AtomicUsize::new(0),
        }
    }

    /// Every write after the next `allowed` ones fails.
    pub fn fail_writes_after(&self, allowed: usize) {
        let done = self.writes.load(Ordering::SeqCst);
        self.fail_writes_from.store(done + allowed, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_reads.store(false, Ordering::SeqCst);
        self.fail_deletes.store(false, Ordering::SeqCst);
        self.fail_writes_from.store(usize::MAX, Ordering::SeqCst);
    }

    fn unavailable() -> SessionStoreError {
        SessionStoreError::Unavailable("injected fault".to_string())
    }
}

#[async_trait::async_trait]
impl SessionStore for FaultyStore {
    async fn put(
        &self,
        session_id: SessionId,
        subject: SubjectId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        if n >= self.fail_writes_from.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.put(session_id, subject, ttl).await
    }

    async fn get(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get(session_id).await
    }

    async fn take(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.take(session_id).await
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.delete(session_id).await
    }

    async fn delete_pair(
        &self,
        access_session_id: SessionId,
        refresh_session_id: SessionId,
    ) -> Result<(), SessionStoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner
            .delete_pair(access_session_id, refresh_session_id)
            .await
    }
}
