use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::generations::{GenerationEntity, InsertGenerationEntity},
        repositories::generations::GenerationRepository,
        value_objects::enums::generation_statuses::GenerationStatus,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::generations},
};

pub struct GenerationPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl GenerationPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl GenerationRepository for GenerationPostgres {
    async fn insert_generation(&self, generation: InsertGenerationEntity) -> Result<Uuid> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Uuid> {
            let mut conn = db_pool.get()?;

            let generation_id = insert_into(generations::table)
                .values(&generation)
                .returning(generations::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(generation_id)
        })
        .await??)
    }

    async fn mark_generation_charge_failed(
        &self,
        generation_id: Uuid,
        error_message: String,
    ) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            update(generations::table.filter(generations::id.eq(generation_id)))
                .set((
                    generations::status.eq(GenerationStatus::Failed.to_string()),
                    generations::error_message.eq(Some(error_message)),
                    generations::artifact_url.eq::<Option<String>>(None),
                    generations::artifact_path.eq::<Option<String>>(None),
                    generations::expires_at.eq::<Option<DateTime<Utc>>>(None),
                ))
                .execute(&mut conn)?;

            Ok(())
        })
        .await??)
    }

    async fn find_user_generation(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> Result<Option<GenerationEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<GenerationEntity>> {
            let mut conn = db_pool.get()?;

            let generation = generations::table
                .filter(generations::id.eq(generation_id))
                .filter(generations::user_id.eq(user_id))
                .select(GenerationEntity::as_select())
                .first::<GenerationEntity>(&mut conn)
                .optional()?;

            Ok(generation)
        })
        .await??)
    }

    async fn list_user_generations(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<GenerationEntity>, i64)> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<(Vec<GenerationEntity>, i64)> {
            let mut conn = db_pool.get()?;

            let total = generations::table
                .filter(generations::user_id.eq(user_id))
                .select(count_star())
                .get_result::<i64>(&mut conn)?;

            let results = generations::table
                .filter(generations::user_id.eq(user_id))
                .select(GenerationEntity::as_select())
                .order((generations::created_at.desc(), generations::id.desc()))
                .offset(offset)
                .limit(limit)
                .load::<GenerationEntity>(&mut conn)?;

            Ok((results, total))
        })
        .await??)
    }

    async fn list_expired_artifacts(
        &self,
        expired_after: DateTime<Utc>,
        expired_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<GenerationEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<GenerationEntity>> {
            let mut conn = db_pool.get()?;

            let results = generations::table
                .select(GenerationEntity::as_select())
                .filter(generations::status.eq(GenerationStatus::Success.to_string()))
                .filter(generations::artifact_path.is_not_null())
                .filter(generations::expires_at.gt(expired_after))
                .filter(generations::expires_at.le(expired_before))
                .order(generations::expires_at.asc())
                .limit(limit)
                .load::<GenerationEntity>(&mut conn)?;

            Ok(results)
        })
        .await??)
    }
}
