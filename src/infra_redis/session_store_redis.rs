use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, FromRedisValue, RedisError, RedisResult, RedisWrite, Script, ToRedisArgs, Value,
};
use std::future::Future;
use std::time::Duration;

const SESSION_TAKE: &str = include_str!("session_take.lua");

pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    timeout: Duration,
    take_script: Script,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, timeout: Duration) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            timeout,
            take_script: Script::new(SESSION_TAKE),
        }
    }

    fn key(&self, session_id: SessionId) -> String {
        format!("{}:{}", self.prefix, session_id)
    }

    async fn round_trip<T>(
        &self,
        op: &str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, SessionStoreError> {
        bounded(op, self.timeout, fut).await
    }
}

/// Runs one store round-trip under `timeout`. Both a Redis error and an
/// elapsed timeout are reported as `Unavailable`, never as `NotFound`.
async fn bounded<T>(
    op: &str,
    timeout: Duration,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<T, SessionStoreError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SessionStoreError::Unavailable(format!("{op}: {e}"))),
        Err(_) => Err(SessionStoreError::Unavailable(format!(
            "{op}: timed out after {timeout:?}"
        ))),
    }
}

/// `SET EX` takes whole seconds; round up so the key outlives `ttl`.
fn expiry_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_millis().div_ceil(1000).max(1);
    u64::try_from(secs).unwrap_or(u64::MAX)
}

impl ToRedisArgs for SubjectId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

impl FromRedisValue for SubjectId {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        let subject = s.parse::<SubjectId>().map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "invalid SubjectId string",
                e.to_string(),
            ))
        })?;
        Ok(subject)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        session_id: SessionId,
        subject: SubjectId,
        ttl: Duration,
    ) -> Result<(), SessionStoreError> {
        let key = self.key(session_id);
        let ttl_secs = expiry_secs(ttl);
        let mut conn = self.conn.clone();
        self.round_trip("SET", conn.set_ex::<_, _, ()>(&key, subject, ttl_secs))
            .await
    }

    async fn get(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError> {
        let key = self.key(session_id);
        let mut conn = self.conn.clone();
        let val: Option<SubjectId> = self
            .round_trip("GET", conn.get::<_, Option<SubjectId>>(&key))
            .await?;
        val.ok_or(SessionStoreError::NotFound)
    }

    async fn take(&self, session_id: SessionId) -> Result<SubjectId, SessionStoreError> {
        let key = self.key(session_id);
        let mut conn = self.conn.clone();
        let invocation = self.take_script.key(&key);
        let val: Option<SubjectId> = self
            .round_trip("TAKE", invocation.invoke_async(&mut conn))
            .await?;
        val.ok_or(SessionStoreError::NotFound)
    }

    async fn delete(&self, session_id: SessionId) -> Result<(), SessionStoreError> {
        let key = self.key(session_id);
        let mut conn = self.conn.clone();
        self.round_trip("DEL", conn.del::<_, ()>(&key)).await
    }

    async fn delete_pair(
        &self,
        access_session_id: SessionId,
        refresh_session_id: SessionId,
    ) -> Result<(), SessionStoreError> {
        let keys = vec![self.key(access_session_id), self.key(refresh_session_id)];
        let mut conn = self.conn.clone();
        self.round_trip("DEL", conn.del::<_, ()>(&keys)).await
    }
}
