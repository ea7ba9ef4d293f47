use deadpool_postgres::Pool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::services::{commit, new_id};
use crate::services::pair_cache::{PairCache, PairKey};

/// Finds a private conversation with exactly these two participants.
const FIND_PRIVATE_SQL: &str = r#"
    SELECT c.id
    FROM conversations c
    JOIN conversation_participants p1 ON p1.conversation_id = c.id AND p1.user_id = $1
    JOIN conversation_participants p2 ON p2.conversation_id = c.id AND p2.user_id = $2
    WHERE c.type = 'private'
      AND NOT EXISTS (
          SELECT 1 FROM conversation_participants p3
          WHERE p3.conversation_id = c.id AND p3.user_id NOT IN ($1, $2)
      )
    ORDER BY c.created_at
    LIMIT 1
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub conversation_id: Uuid,
    /// True when this call inserted the conversation.
    pub created: bool,
}

/// Cache-first, transaction-backed resolution of "the private conversation
/// between A and B".
#[derive(Clone)]
pub struct ConversationResolver {
    db: Pool,
    cache: Arc<dyn PairCache>,
    cache_ttl: Duration,
    cache_write_timeout: Duration,
}

impl ConversationResolver {
    pub fn new(
        db: Pool,
        cache: Arc<dyn PairCache>,
        cache_ttl: Duration,
        cache_write_timeout: Duration,
    ) -> Self {
        Self {
            db,
            cache,
            cache_ttl,
            cache_write_timeout,
        }
    }

    pub async fn get_or_create(&self, user_id: Uuid, target_id: Uuid) -> AppResult<Resolved> {
        let key = PairKey::new(user_id, target_id)?;

        if let Some(conversation_id) = self.cache.get(&key).await? {
            metrics::record_resolver_lookup("cache");
            return Ok(Resolved {
                conversation_id,
                created: false,
            });
        }

        let resolved = self.resolve_in_db(&key).await?;
        metrics::record_resolver_lookup(if resolved.created { "created" } else { "database" });

        self.populate_cache(key, resolved.conversation_id);
        Ok(resolved)
    }

    async fn resolve_in_db(&self, key: &PairKey) -> AppResult<Resolved> {
        let mut client = self.db.get().await?;
        let tx = client.transaction().await?;

        // Concurrent first contact for the same pair queues here until the
        // winner commits, then finds its row.
        tx.execute(
            "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
            &[&key.cache_key()],
        )
        .await?;

        if let Some(row) = tx
            .query_opt(FIND_PRIVATE_SQL, &[&key.low(), &key.high()])
            .await?
        {
            let conversation_id: Uuid = row.get(0);
            commit(tx).await?;
            return Ok(Resolved {
                conversation_id,
                created: false,
            });
        }

        let known: i64 = tx
            .query_one(
                "SELECT COUNT(*) FROM users WHERE id IN ($1, $2)",
                &[&key.low(), &key.high()],
            )
            .await?
            .get(0);
        if known < 2 {
            return Err(AppError::NotFound("user"));
        }

        let conversation_id = new_id();
        tx.execute(
            "INSERT INTO conversations (id, type) VALUES ($1, 'private')",
            &[&conversation_id],
        )
        .await?;
        tx.execute(
            r#"
            INSERT INTO conversation_participants (id, conversation_id, user_id)
            VALUES ($1, $3, $4), ($2, $3, $5)
            ON CONFLICT (conversation_id, user_id) DO NOTHING
            "#,
            &[&new_id(), &new_id(), &conversation_id, &key.low(), &key.high()],
        )
        .await?;
        commit(tx).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            pair = %key,
            "created private conversation"
        );
        Ok(Resolved {
            conversation_id,
            created: true,
        })
    }

    /// Detached write with its own timeout; never fails the caller.
    fn populate_cache(&self, key: PairKey, conversation_id: Uuid) {
        let cache = Arc::clone(&self.cache);
        let ttl = self.cache_ttl;
        let budget = self.cache_write_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(budget, cache.set(&key, conversation_id, ttl)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    metrics::CACHE_WRITE_FAILURES_TOTAL.inc();
                    tracing::warn!(pair = %key, error = %e, "failed to cache private conversation");
                }
                Err(_) => {
                    metrics::CACHE_WRITE_FAILURES_TOTAL.inc();
                    tracing::warn!(pair = %key, "timed out caching private conversation");
                }
            }
        });
    }
}
