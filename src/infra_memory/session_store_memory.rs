use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Every this many writes, `put` drops all expired entries.
pub const SWEEP_INTERVAL: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Entry {
    subject: SubjectId,
    deadline: Instant,
}

/// Process-local session store. Entries carry their own deadline. They are
/// evicted when read after expiry, and by a sweep every `SWEEP_INTERVAL` puts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<SessionId, Entry>,
    puts: AtomicUsize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.deadline > now);
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        session_id: SessionId,
        subject: SubjectId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| SessionStoreError::Unavailable(format!("ttl out of range: {ttl:?}")))?;
        self.entries.insert(session_id, Entry { subject, deadline });

        if (self.puts.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.sweep_expired();
        }
        Ok(())
    }

    async fn get(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError> {
        let now = Instant::now();
        let found = self
            .entries
            .get(&session_id)
            .map(|entry| (entry.subject, entry.deadline > now));
        match found {
            Some((subject, true)) => Ok(subject),
            Some((_, false)) => {
                self.entries
                    .remove_if(&session_id, |_, entry| entry.deadline <= now);
                Err(SessionStoreError::NotFound)
            }
            None => Err(SessionStoreError::NotFound),
        }
    }

    async fn take(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError> {
        match self.entries.remove(&session_id) {
            Some((_, entry)) if entry.deadline > Instant::now() => Ok(entry.subject),
            _ => Err(SessionStoreError::NotFound),
        }
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        self.entries.remove(&session_id);
        Ok(())
    }

    async fn delete_pair(
        &self,
        access_session_id: SessionId,
        refresh_session_id: SessionId,
    ) -> Result<(), SessionStoreError> {
        self.entries.remove(&access_session_id);
        self.entries.remove(&refresh_session_id);
        Ok(())
    }
}
