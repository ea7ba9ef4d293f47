use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

#[derive(Clone)]
pub struct RedisClient {
    manager: SharedConnectionManager,
}

impl RedisClient {
    pub fn new(manager: SharedConnectionManager) -> Self {
        Self { manager }
    }

    pub async fn from_url(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    /// Clones the multiplexed connection out of the lock so commands never
    /// hold the mutex across a round-trip.
    pub async fn connection(&self) -> ConnectionManager {
        self.manager.lock().await.clone()
    }

    /// `Ok(None)` on a missing key; any other failure is an error.
    pub async fn get_string(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.connection().await;
        conn.get(key).await
    }

    pub async fn set_string_ex(&self, key: &str, value: &str, ttl: Duration) -> RedisResult<()> {
        let mut conn = self.connection().await;
        conn.set_ex(key, value, ttl.as_secs().max(1)).await
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.connection().await;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
