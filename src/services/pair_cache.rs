//! Cache of private conversation ids keyed by the unordered user pair.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::redis_client::RedisClient;

const KEY_PREFIX: &str = "private_chat";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

impl From<CacheError> for AppError {
    fn from(e: CacheError) -> Self {
        AppError::Cache(e.to_string())
    }
}

/// Two distinct users in canonical (ascending) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: Uuid,
    high: Uuid,
}

impl PairKey {
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, AppError> {
        if a == b {
            return Err(AppError::BadRequest("cannot chat with self".into()));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    pub fn cache_key(&self) -> String {
        format!("{KEY_PREFIX}:{}:{}", self.low, self.high)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Best-effort lookup table; never authoritative for uniqueness.
#[async_trait]
pub trait PairCache: Send + Sync {
    /// `Ok(None)` when the key is absent.
    async fn get(&self, key: &PairKey) -> Result<Option<Uuid>, CacheError>;

    async fn set(&self, key: &PairKey, conversation_id: Uuid, ttl: Duration) -> Result<(), CacheError>;
}

pub struct RedisPairCache {
    redis: RedisClient,
}

impl RedisPairCache {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl PairCache for RedisPairCache {
    async fn get(&self, key: &PairKey) -> Result<Option<Uuid>, CacheError> {
        let Some(raw) = self.redis.get_string(&key.cache_key()).await? else {
            return Ok(None);
        };
        match Uuid::parse_str(&raw) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                // Treat garbage as a miss; the database path rewrites it.
                tracing::warn!(key = %key, error = %e, "ignoring malformed cached conversation id");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &PairKey, conversation_id: Uuid, ttl: Duration) -> Result<(), CacheError> {
        self.redis
            .set_string_ex(&key.cache_key(), &conversation_id.to_string(), ttl)
            .await?;
        Ok(())
    }
}
