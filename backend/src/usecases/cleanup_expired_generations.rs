use anyhow::Result;
use chrono::{Duration, Utc};
use crates::domain::repositories::{generations::GenerationRepository, storage::BlobStorage};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

const MAX_REPORTED_IDS: usize = 20;
pub const MAX_LOOKBACK_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct CleanupExpiredGenerationsParams {
    pub lookback_hours: i64,
    pub limit: i64,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CleanupExpiredGenerationsResult {
    pub scanned: usize,
    pub deleted: usize,
    pub delete_failed: usize,
    pub candidate_ids: Vec<Uuid>,
    pub deleted_ids: Vec<Uuid>,
    pub failed_ids: Vec<Uuid>,
}

/// Deletes artifacts whose retention window has already passed. Catches deletions an
/// in-process timer never performed, e.g. because the process restarted. Generation
/// rows are left untouched.
pub struct CleanupExpiredGenerationsUseCase {
    repository: Arc<dyn GenerationRepository + Send + Sync>,
    storage: Arc<dyn BlobStorage + Send + Sync>,
}

impl CleanupExpiredGenerationsUseCase {
    pub fn new(
        repository: Arc<dyn GenerationRepository + Send + Sync>,
        storage: Arc<dyn BlobStorage + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            storage,
        }
    }

    pub async fn run(
        &self,
        params: CleanupExpiredGenerationsParams,
    ) -> Result<CleanupExpiredGenerationsResult> {
        let now = Utc::now();
        let expired_after = now - Duration::hours(params.lookback_hours.clamp(1, MAX_LOOKBACK_HOURS));
        let limit = params.limit.max(1);

        let generations = self
            .repository
            .list_expired_artifacts(expired_after, now, limit)
            .await?;

        let mut result = CleanupExpiredGenerationsResult {
            scanned: generations.len(),
            ..Default::default()
        };

        for generation in generations {
            let Some(artifact_path) = generation.artifact_path.as_deref() else {
                continue;
            };

            if result.candidate_ids.len() < MAX_REPORTED_IDS {
                result.candidate_ids.push(generation.id);
            }

            if params.dry_run {
                continue;
            }

            // Already-missing objects count as deleted, so reruns are harmless.
            match self.storage.delete(artifact_path).await {
                Ok(()) => {
                    result.deleted += 1;
                    if result.deleted_ids.len() < MAX_REPORTED_IDS {
                        result.deleted_ids.push(generation.id);
                    }
                }
                Err(err) => {
                    error!(
                        generation_id = %generation.id,
                        artifact_path,
                        error = ?err,
                        "cleanup: failed to delete expired artifact"
                    );
                    result.delete_failed += 1;
                    if result.failed_ids.len() < MAX_REPORTED_IDS {
                        result.failed_ids.push(generation.id);
                    }
                }
            }
        }

        info!(
            scanned = result.scanned,
            deleted = result.deleted,
            delete_failed = result.delete_failed,
            dry_run = params.dry_run,
            "cleanup: expired artifact sweep completed"
        );

        Ok(result)
    }
}
