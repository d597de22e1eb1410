use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::{generation_statuses::GenerationStatus, generation_types::GenerationType},
        generations::CatalogReferences,
    },
    infra::db::postgres::schema::generations,
};

/// Permanent audit row for one generation attempt. Outlives the artifact it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = generations)]
pub struct GenerationEntity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub industry_id: Uuid,
    pub category_id: Uuid,
    pub product_type_id: Uuid,
    pub pose_id: Uuid,
    pub theme_id: Uuid,
    pub background_id: Uuid,
    pub ai_face_id: Uuid,
    pub artifact_url: Option<String>,
    pub artifact_path: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub generation_time_ms: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub generation_type: String,
    pub created_at: DateTime<Utc>,
}

impl GenerationEntity {
    pub fn status(&self) -> GenerationStatus {
        GenerationStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = generations)]
pub struct InsertGenerationEntity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub industry_id: Uuid,
    pub category_id: Uuid,
    pub product_type_id: Uuid,
    pub pose_id: Uuid,
    pub theme_id: Uuid,
    pub background_id: Uuid,
    pub ai_face_id: Uuid,
    pub artifact_url: Option<String>,
    pub artifact_path: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub generation_time_ms: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub generation_type: String,
    pub created_at: DateTime<Utc>,
}

impl InsertGenerationEntity {
    #[allow(clippy::too_many_arguments)]
    pub fn succeeded(
        id: Uuid,
        user_id: Uuid,
        references: &CatalogReferences,
        generation_type: GenerationType,
        artifact_url: String,
        artifact_path: String,
        generation_time_ms: i64,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            artifact_url: Some(artifact_url),
            artifact_path: Some(artifact_path),
            status: GenerationStatus::Success.to_string(),
            error_message: None,
            expires_at: Some(expires_at),
            ..Self::base(id, user_id, references, generation_type, generation_time_ms, created_at)
        }
    }

    pub fn failed(
        id: Uuid,
        user_id: Uuid,
        references: &CatalogReferences,
        generation_type: GenerationType,
        error_message: String,
        generation_time_ms: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: GenerationStatus::Failed.to_string(),
            error_message: Some(error_message),
            ..Self::base(id, user_id, references, generation_type, generation_time_ms, created_at)
        }
    }

    fn base(
        id: Uuid,
        user_id: Uuid,
        references: &CatalogReferences,
        generation_type: GenerationType,
        generation_time_ms: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: Some(user_id),
            industry_id: references.industry_id,
            category_id: references.category_id,
            product_type_id: references.product_type_id,
            pose_id: references.pose_id,
            theme_id: references.theme_id,
            background_id: references.background_id,
            ai_face_id: references.ai_face_id,
            artifact_url: None,
            artifact_path: None,
            status: GenerationStatus::Failed.to_string(),
            error_message: None,
            generation_time_ms,
            expires_at: None,
            generation_type: generation_type.to_string(),
            created_at,
        }
    }
}
