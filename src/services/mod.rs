pub mod conversation_service;
pub mod delivery;
pub mod friend_service;
pub mod message_service;
pub mod pair_cache;
pub mod resolver;
pub mod user_service;

use deadpool_postgres::Transaction;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub use conversation_service::ConversationService;
pub use delivery::DeliveryCoordinator;
pub use friend_service::FriendService;
pub use message_service::MessageService;
pub use pair_cache::{PairCache, PairKey, RedisPairCache};
pub use resolver::{ConversationResolver, Resolved};
pub use user_service::UserService;

/// Fresh time-ordered identifier for any stored row.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

tokio::task_local! {
    /// Set once the operation running under [`with_deadline`] sends COMMIT.
    static COMMIT_STARTED: Arc<AtomicBool>;
}

fn mark_commit_started() {
    let _ = COMMIT_STARTED.try_with(|started| started.store(true, Ordering::SeqCst));
}

/// Commits `tx`. Past this point [`with_deadline`] no longer cancels the
/// operation, so a reported timeout always means nothing was written.
pub async fn commit(tx: Transaction<'_>) -> AppResult<()> {
    mark_commit_started();
    tx.commit().await?;
    Ok(())
}

/// Runs a store operation under `deadline`.
///
/// Expiry before COMMIT drops the future and its transaction rolls back.
/// Expiry during COMMIT waits for the commit so the caller sees its real
/// outcome.
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let started = Arc::new(AtomicBool::new(false));
    let mut fut = std::pin::pin!(COMMIT_STARTED.scope(started.clone(), fut));

    match tokio::time::timeout(deadline, fut.as_mut()).await {
        Ok(result) => result,
        Err(_) if started.load(Ordering::SeqCst) => {
            tracing::warn!(
                deadline_ms = deadline.as_millis() as u64,
                "deadline passed during commit, awaiting outcome"
            );
            fut.await
        }
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "store operation timed out");
            Err(AppError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let ok = with_deadline(Duration::from_secs(1), async { Ok::<_, AppError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_deadline(Duration::from_secs(1), async {
            Err::<(), _>(AppError::NotFound("conversation"))
        })
        .await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let res = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, AppError>(())
        })
        .await;
        assert!(matches!(res, Err(AppError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_waits_out_commit_in_flight() {
        let res = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            mark_commit_started();
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, AppError>(9)
        })
        .await;
        assert_eq!(res.unwrap(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_commit_after_deadline_is_not_a_timeout() {
        let res = with_deadline(Duration::from_millis(50), async {
            mark_commit_started();
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err::<(), _>(AppError::Conflict("serialization failure".into()))
        })
        .await;
        assert!(matches!(res, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_commit_marker_is_noop_outside_deadline() {
        mark_commit_started();
    }

    #[test]
    fn test_new_id_is_time_ordered() {
        let a = new_id();
        std::thread::sleep(Duration::from_millis(2));
        let b = new_id();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }
}
