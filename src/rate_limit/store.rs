// Rate limit backing stores
//
// Both stores expose a single atomic increment-with-expiry primitive. The
// limiter never reads then writes a counter on its own.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Atomic counter store keyed by client bucket
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Increment `key` by one and return the new value. The key expires
    /// `window` after its first increment.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError>;

    fn backend_name(&self) -> &'static str;
}

const INCREMENT_SCRIPT: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

/// Redis-backed store, shared by every instance of the service
#[derive(Clone)]
pub struct RedisRateLimitStore {
    conn: ConnectionManager,
    script: Script,
}

impl RedisRateLimitStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Rate limiter connected to Redis");
        Ok(Self {
            conn,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let window_ms = window.as_millis().max(1) as u64;
        let count: u64 = self
            .script
            .key(key)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

struct Bucket {
    count: u64,
    expires_at: Instant,
}

/// Past this many live buckets, expired ones are swept on the next increment
const SWEEP_THRESHOLD: usize = 10_000;

/// Process-local store for single-instance deployments and tests
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();

        if buckets.len() > SWEEP_THRESHOLD {
            buckets.retain(|_, bucket| bucket.expires_at > now);
        }

        let bucket = buckets.entry(key.to_owned()).or_insert_with(|| Bucket {
            count: 0,
            expires_at: now + window,
        });

        if bucket.expires_at <= now {
            bucket.count = 0;
            bucket.expires_at = now + window;
        }

        bucket.count += 1;
        Ok(bucket.count)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
