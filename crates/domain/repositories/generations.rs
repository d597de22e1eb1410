use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::generations::{GenerationEntity, InsertGenerationEntity};

#[automock]
#[async_trait]
pub trait GenerationRepository {
    async fn insert_generation(&self, generation: InsertGenerationEntity) -> Result<Uuid>;

    /// Compensation for a success record whose charge could not be collected: flips the
    /// row to failed and clears the artifact columns.
    async fn mark_generation_charge_failed(
        &self,
        generation_id: Uuid,
        error_message: String,
    ) -> Result<()>;

    async fn find_user_generation(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> Result<Option<GenerationEntity>>;

    async fn list_user_generations(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<GenerationEntity>, i64)>;

    /// Success records whose `expires_at` lies in `(expired_after, expired_before]`.
    async fn list_expired_artifacts(
        &self,
        expired_after: DateTime<Utc>,
        expired_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<GenerationEntity>>;
}
