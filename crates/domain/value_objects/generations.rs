use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_RETENTION_HOURS: i64 = 24;
pub const MAX_RETENTION_HOURS: i64 = 24 * 365;
pub const DEFAULT_BULK_MAX_POSES: usize = 10;
pub const DEFAULT_BULK_MAX_CONCURRENCY: usize = 4;

/// A binary image handed to the external generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

/// Every catalog id a single generation points at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogReferences {
    pub industry_id: Uuid,
    pub category_id: Uuid,
    pub product_type_id: Uuid,
    pub pose_id: Uuid,
    pub theme_id: Uuid,
    pub background_id: Uuid,
    pub ai_face_id: Uuid,
}

/// The references a bulk request shares across all of its poses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SharedReferences {
    pub industry_id: Uuid,
    pub category_id: Uuid,
    pub product_type_id: Uuid,
    pub theme_id: Uuid,
    pub background_id: Uuid,
    pub ai_face_id: Uuid,
}

impl SharedReferences {
    pub fn with_pose(&self, pose_id: Uuid) -> CatalogReferences {
        CatalogReferences {
            industry_id: self.industry_id,
            category_id: self.category_id,
            product_type_id: self.product_type_id,
            pose_id,
            theme_id: self.theme_id,
            background_id: self.background_id,
            ai_face_id: self.ai_face_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub references: CatalogReferences,
    pub product_image: ReferenceImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkGenerationRequest {
    pub shared: SharedReferences,
    pub pose_ids: Vec<Uuid>,
    pub product_image: ReferenceImage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedImage {
    pub generation_id: Uuid,
    pub pose_id: Uuid,
    pub artifact_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoseFailure {
    pub pose_id: Uuid,
    pub generation_id: Option<Uuid>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkGenerationResult {
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<PoseFailure>,
    pub credits_charged: i32,
}

/// Non-price knobs of the generation pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationSettings {
    pub retention_hours: i64,
    pub bulk_max_poses: usize,
    pub bulk_max_concurrency: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            retention_hours: DEFAULT_RETENTION_HOURS,
            bulk_max_poses: DEFAULT_BULK_MAX_POSES,
            bulk_max_concurrency: DEFAULT_BULK_MAX_CONCURRENCY,
        }
    }
}

impl GenerationSettings {
    /// `None` unless `retention_hours` lies in `1..=MAX_RETENTION_HOURS`.
    pub fn retention(&self) -> Option<chrono::Duration> {
        if !(1..=MAX_RETENTION_HOURS).contains(&self.retention_hours) {
            return None;
        }
        chrono::Duration::try_hours(self.retention_hours)
    }
}
