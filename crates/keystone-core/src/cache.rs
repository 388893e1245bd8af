use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Failures talking to the cache. A missing key is never an error; reads
/// return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache operation `{op}` timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Cache backend trait for pluggable caching strategies.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a raw value from the cache.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set a raw value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key. Returns whether it existed.
    async fn del(&self, key: &str) -> Result<bool, CacheError>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Reset the TTL of an existing key. Returns `false` if the key is gone.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Flush all keys (use with caution).
    async fn flush(&self) -> Result<(), CacheError>;
}

/// The cache handle used by the application.
///
/// Every call is bounded by `op_timeout`, so a stalled backend fails the
/// operation instead of holding the request.
///
/// ```rust,ignore
/// let key = format!("CACHE:USER:{id}");
/// if let Some(user) = cache.get_json::<UserRow>(&key).await? {
///     return Ok(user);
/// }
/// ```
#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
}

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

impl CacheService {
    /// Create a new cache service with the given backend.
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        CacheService {
            backend: Arc::new(backend),
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Create an in-memory cache (good for development and testing).
    pub fn in_memory() -> Self {
        CacheService::new(InMemoryCache::new())
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                op,
                timeout: self.op_timeout,
            }),
        }
    }

    /// Get a JSON-deserialized value from the cache.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Set a JSON-serialized value in the cache.
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl).await
    }

    /// Get a raw string from the cache.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded("get", self.backend.get(key)).await
    }

    /// Set a raw string in the cache.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.bounded("set", self.backend.set(key, value, ttl)).await
    }

    /// Delete a key from the cache.
    pub async fn del(&self, key: &str) -> Result<bool, CacheError> {
        self.bounded("del", self.backend.del(key)).await
    }

    /// Check if a key exists in the cache.
    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.bounded("exists", self.backend.exists(key)).await
    }

    /// Reset the TTL of an existing key.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.bounded("expire", self.backend.expire(key, ttl)).await
    }

    /// Flush the entire cache.
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.bounded("flush", self.backend.flush()).await
    }
}

// ── In-Memory Cache Backend ──

/// Writes between two sweeps of expired entries.
const SWEEP_EVERY: usize = 256;

/// In-memory cache using a HashMap. Used when no `REDIS_URL` is configured
/// and by the test harness.
///
/// Expired entries are dropped when read and by a sweep every
/// [`SWEEP_EVERY`] writes, so keys that are never read again do not pile up.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
    writes: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() <= at)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, entry| entry.is_live());
        before - store.len()
    }

    /// Stored entries, expired ones included until they are swept.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining lifetime of a live key, if it has one.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let store = self.store.read().await;
        let entry = store.get(key).filter(|e| e.is_live())?;
        entry
            .expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                drop(store);
                self.store.write().await.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        let mut store = self.store.write().await;
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            store.retain(|_, entry| entry.is_live());
        }
        store.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .store
            .write()
            .await
            .remove(key)
            .is_some_and(|entry| entry.is_live()))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let store = self.store.read().await;
        Ok(store.get(key).is_some_and(|entry| entry.is_live()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut store = self.store.write().await;
        match store.get_mut(key) {
            Some(entry) if entry.is_live() => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.store.write().await.clear();
        Ok(())
    }
}

// ── Redis Cache Backend ──

/// TTL in whole milliseconds for `PSETEX`/`PEXPIRE`. Redis rejects zero, so
/// anything shorter than a millisecond is rounded up.
#[cfg_attr(not(feature = "redis"), allow(dead_code))]
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Redis-backed cache for production use.
///
/// ```rust,ignore
/// let cache = RedisCache::new("redis://127.0.0.1:6379").await?;
/// let service = CacheService::new(cache);
/// ```
#[cfg(feature = "redis")]
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

#[cfg(feature = "redis")]
impl RedisCache {
    /// Connect to Redis. The connection manager reconnects on its own.
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(RedisCache { conn })
    }
}

#[cfg(feature = "redis")]
#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let _: () = match ttl {
            Some(ttl) => conn.pset_ex(key, value, ttl_millis(ttl)).await?,
            None => conn.set(key, value).await?,
        };
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let count: i64 = conn.del(key).await?;
        Ok(count > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let millis = i64::try_from(ttl_millis(ttl)).unwrap_or(i64::MAX);
        Ok(conn.pexpire(key, millis).await?)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
