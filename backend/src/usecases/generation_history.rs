use std::sync::Arc;

use crates::domain::{
    entities::generations::GenerationEntity,
    repositories::generations::GenerationRepository,
    value_objects::credits::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT},
};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use super::generation::{GenerationError, GenerationResult};

#[derive(Debug, Clone, Serialize)]
pub struct GenerationHistoryPage {
    pub generations: Vec<GenerationEntity>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

pub struct GenerationHistoryUseCase<G>
where
    G: GenerationRepository + Send + Sync + 'static,
{
    generation_repo: Arc<G>,
}

impl<G> GenerationHistoryUseCase<G>
where
    G: GenerationRepository + Send + Sync + 'static,
{
    pub fn new(generation_repo: Arc<G>) -> Self {
        Self { generation_repo }
    }

    /// Newest first. `page` is 1-based.
    pub async fn list(
        &self,
        user_id: Uuid,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> GenerationResult<GenerationHistoryPage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let (generations, total) = self
            .generation_repo
            .list_user_generations(user_id, (page - 1) * limit, limit)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "generation_history: failed to list generations");
                GenerationError::Internal(err)
            })?;

        Ok(GenerationHistoryPage {
            generations,
            total,
            page,
            limit,
        })
    }

    pub async fn get(&self, user_id: Uuid, generation_id: Uuid) -> GenerationResult<GenerationEntity> {
        self.generation_repo
            .find_user_generation(user_id, generation_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %generation_id,
                    db_error = ?err,
                    "generation_history: failed to load generation"
                );
                GenerationError::Internal(err)
            })?
            .ok_or_else(|| GenerationError::NotFound("Generation".to_string()))
    }
}
