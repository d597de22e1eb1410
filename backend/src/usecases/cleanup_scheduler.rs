use std::{sync::Arc, time::Duration};

use crates::domain::repositories::storage::BlobStorage;
#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::storage::MockBlobStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_storage(
        deletes: &Arc<AtomicUsize>,
        outcome: fn() -> anyhow::Result<()>,
    ) -> Arc<MockBlobStorage> {
        let deletes = Arc::clone(deletes);
        let mut storage = MockBlobStorage::new();
        storage.expect_delete().returning(move |_| {
            deletes.fetch_add(1, Ordering::SeqCst);
            outcome()
        });
        Arc::new(storage)
    }

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        // Let the woken cleanup task run to completion.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn artifact_is_deleted_only_after_retention() {
        let deletes = Arc::new(AtomicUsize::new(0));
        let storage = counting_storage(&deletes, || Ok(()));
        let scheduler = TokioCleanupScheduler::new(storage, Duration::from_secs(24 * 3600));

        scheduler.schedule_deletion("generations/u/a.png".to_string(), Uuid::new_v4());

        advance(Duration::from_secs(23 * 3600)).await;
        assert_eq!(deletes.load(Ordering::SeqCst), 0);

        advance(Duration::from_secs(2 * 3600)).await;
        assert_eq!(deletes.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(48 * 3600)).await;
        assert_eq!(deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_errors_are_swallowed() {
        let deletes = Arc::new(AtomicUsize::new(0));
        let storage = counting_storage(&deletes, || Err(anyhow::anyhow!("bucket unavailable")));
        let scheduler = TokioCleanupScheduler::new(storage, Duration::from_secs(60));

        scheduler.schedule_deletion("generations/u/b.png".to_string(), Uuid::new_v4());
        scheduler.schedule_deletion("generations/u/c.png".to_string(), Uuid::new_v4());

        advance(Duration::from_secs(61)).await;

        // Both timers fired; the first failure did not take down the second task.
        assert_eq!(deletes.load(Ordering::SeqCst), 2);
    }
}
