use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::generations::InsertGenerationEntity,
    repositories::{
        generations::GenerationRepository, image_generator::ImageGenerator, storage::BlobStorage,
    },
    value_objects::{
        enums::generation_types::GenerationType,
        generations::{CatalogReferences, GeneratedImage, ReferenceImage},
    },
};
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    generation::{GenerationError, GenerationResult},
    prompt::build_prompt,
};

/// Inputs of one generation attempt. Single requests run one; a bulk request runs one
/// per pose with the shared face and background.
pub struct GenerationAttempt<'a> {
    pub user_id: Uuid,
    pub references: CatalogReferences,
    pub generation_type: GenerationType,
    pub product_type_name: &'a str,
    pub pose_description: &'a str,
    pub face: &'a ReferenceImage,
    pub background: &'a ReferenceImage,
    pub product_image: &'a ReferenceImage,
    pub started_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub generation_id: Uuid,
    pub pose_id: Uuid,
    pub artifact_url: String,
    pub artifact_path: String,
    pub expires_at: DateTime<Utc>,
}

impl From<StoredArtifact> for GeneratedImage {
    fn from(artifact: StoredArtifact) -> Self {
        GeneratedImage {
            generation_id: artifact.generation_id,
            pose_id: artifact.pose_id,
            artifact_url: artifact.artifact_url,
            expires_at: artifact.expires_at,
        }
    }
}

/// A failed attempt. `generation_id` is set when its failed record was written.
#[derive(Debug)]
pub struct AttemptFailure {
    pub generation_id: Option<Uuid>,
    pub error: GenerationError,
}

/// Prompt, external generation, artifact upload and the generation record. Every
/// attempt that reaches this stage leaves exactly one record behind, success or failed.
pub struct GenerationPipeline<G, B, I>
where
    G: GenerationRepository + Send + Sync + 'static,
    B: BlobStorage + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
{
    generation_repo: Arc<G>,
    storage: Arc<B>,
    image_generator: Arc<I>,
    retention: chrono::Duration,
}

impl<G, B, I> GenerationPipeline<G, B, I>
where
    G: GenerationRepository + Send + Sync + 'static,
    B: BlobStorage + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
{
    pub fn new(
        generation_repo: Arc<G>,
        storage: Arc<B>,
        image_generator: Arc<I>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            generation_repo,
            storage,
            image_generator,
            retention,
        }
    }

    pub async fn run(&self, attempt: GenerationAttempt<'_>) -> Result<StoredArtifact, AttemptFailure> {
        let generation_id = Uuid::new_v4();

        match self.produce(generation_id, &attempt).await {
            Ok(artifact) => Ok(artifact),
            Err(error) => {
                let recorded = self.record_failure(generation_id, &attempt, &error).await;
                Err(AttemptFailure {
                    generation_id: recorded.then_some(generation_id),
                    error,
                })
            }
        }
    }

    /// Undoes a stored artifact whose charge could not be collected: the object is
    /// removed right away and the success record is flipped to failed. Both steps are
    /// best effort.
    pub async fn compensate(&self, artifact: &StoredArtifact, reason: &str) {
        self.discard_artifact(&artifact.artifact_path, artifact.generation_id)
            .await;

        if let Err(err) = self
            .generation_repo
            .mark_generation_charge_failed(artifact.generation_id, reason.to_string())
            .await
        {
            error!(
                generation_id = %artifact.generation_id,
                db_error = ?err,
                "generation: failed to mark uncharged generation as failed"
            );
        }
    }

    async fn produce(
        &self,
        generation_id: Uuid,
        attempt: &GenerationAttempt<'_>,
    ) -> GenerationResult<StoredArtifact> {
        let prompt = build_prompt(attempt.pose_description, attempt.product_type_name);
        let reference_images = vec![
            attempt.face.clone(),
            attempt.background.clone(),
            attempt.product_image.clone(),
        ];

        let image = self
            .image_generator
            .generate(reference_images, prompt)
            .await
            .map_err(|err| {
                warn!(
                    user_id = %attempt.user_id,
                    %generation_id,
                    error = ?err,
                    "generation: image generator failed"
                );
                GenerationError::ExternalService {
                    operation: "image generation",
                    message: format!("{:#}", err),
                }
            })?;

        if image.is_empty() {
            return Err(GenerationError::ExternalService {
                operation: "image generation",
                message: "generator returned an empty image".to_string(),
            });
        }

        let (content_type, extension) = sniff_image_format(&image);
        let artifact_path = artifact_path(
            attempt.user_id,
            generation_id,
            &attempt.references,
            attempt.product_image,
            extension,
        );

        let artifact_url = self
            .storage
            .upload(image, &artifact_path, content_type)
            .await
            .map_err(|err| {
                warn!(
                    user_id = %attempt.user_id,
                    %generation_id,
                    artifact_path = %artifact_path,
                    error = ?err,
                    "generation: artifact upload failed"
                );
                GenerationError::ExternalService {
                    operation: "artifact upload",
                    message: format!("{:#}", err),
                }
            })?;

        let created_at = Utc::now();
        let Some(expires_at) = created_at.checked_add_signed(self.retention) else {
            error!(
                user_id = %attempt.user_id,
                %generation_id,
                retention = %self.retention,
                "generation: artifact expiry is out of range"
            );
            self.discard_artifact(&artifact_path, generation_id).await;
            return Err(GenerationError::Internal(anyhow!(
                "artifact expiry is out of range for retention {}",
                self.retention
            )));
        };
        let record = InsertGenerationEntity::succeeded(
            generation_id,
            attempt.user_id,
            &attempt.references,
            attempt.generation_type,
            artifact_url.clone(),
            artifact_path.clone(),
            elapsed_ms(attempt.started_at),
            created_at,
            expires_at,
        );

        if let Err(err) = self.generation_repo.insert_generation(record).await {
            error!(
                user_id = %attempt.user_id,
                %generation_id,
                db_error = ?err,
                "generation: failed to record successful generation"
            );
            // Nothing would ever point at the object again.
            self.discard_artifact(&artifact_path, generation_id).await;
            return Err(GenerationError::Internal(err));
        }

        info!(
            user_id = %attempt.user_id,
            %generation_id,
            pose_id = %attempt.references.pose_id,
            generation_type = %attempt.generation_type,
            artifact_path = %artifact_path,
            "generation: artifact stored"
        );

        Ok(StoredArtifact {
            generation_id,
            pose_id: attempt.references.pose_id,
            artifact_url,
            artifact_path,
            expires_at,
        })
    }

    async fn record_failure(
        &self,
        generation_id: Uuid,
        attempt: &GenerationAttempt<'_>,
        failure: &GenerationError,
    ) -> bool {
        let record = InsertGenerationEntity::failed(
            generation_id,
            attempt.user_id,
            &attempt.references,
            attempt.generation_type,
            failure.detail(),
            elapsed_ms(attempt.started_at),
            Utc::now(),
        );

        match self.generation_repo.insert_generation(record).await {
            Ok(_) => true,
            Err(err) => {
                error!(
                    user_id = %attempt.user_id,
                    %generation_id,
                    db_error = ?err,
                    "generation: failed to record failed generation"
                );
                false
            }
        }
    }

    async fn discard_artifact(&self, artifact_path: &str, generation_id: Uuid) {
        if let Err(err) = self.storage.delete(artifact_path).await {
            warn!(
                %generation_id,
                artifact_path,
                error = ?err,
                "generation: failed to delete artifact"
            );
        }
    }
}

fn elapsed_ms(started_at: Instant) -> i64 {
    i64::try_from(started_at.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// `generations/{user}/{request digest}/{generation}.{ext}`. The digest covers every
/// reference id and the product image, so retries of one request share a directory.
fn artifact_path(
    user_id: Uuid,
    generation_id: Uuid,
    references: &CatalogReferences,
    product_image: &ReferenceImage,
    extension: &str,
) -> String {
    let mut hasher = Sha256::new();
    for id in [
        user_id,
        references.industry_id,
        references.category_id,
        references.product_type_id,
        references.pose_id,
        references.theme_id,
        references.background_id,
        references.ai_face_id,
    ] {
        hasher.update(id.as_bytes());
    }
    hasher.update(&product_image.bytes);

    let digest = hex::encode(hasher.finalize());

    format!(
        "generations/{}/{}/{}.{}",
        user_id,
        &digest[..32],
        generation_id,
        extension
    )
}

fn sniff_image_format(bytes: &[u8]) -> (&'static str, &'static str) {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ("image/jpeg", "jpg")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        ("image/webp", "webp")
    } else {
        ("image/png", "png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{InMemoryBlobStorage, InMemoryGenerations, PNG_BYTES};
    use crates::domain::{
        repositories::image_generator::MockImageGenerator,
        value_objects::enums::generation_statuses::GenerationStatus,
    };

    fn references() -> CatalogReferences {
        CatalogReferences {
            industry_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            product_type_id: Uuid::new_v4(),
            pose_id: Uuid::new_v4(),
            theme_id: Uuid::new_v4(),
            background_id: Uuid::new_v4(),
            ai_face_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn identical_requests_share_a_digest_but_not_a_path() {
        let user_id = Uuid::new_v4();
        let references = references();
        let product = ReferenceImage::new(vec![1, 2, 3], "image/png");

        let first = artifact_path(user_id, Uuid::new_v4(), &references, &product, "png");
        let second = artifact_path(user_id, Uuid::new_v4(), &references, &product, "png");

        assert_ne!(first, second);
        assert_eq!(first.rsplit_once('/').unwrap().0, second.rsplit_once('/').unwrap().0);
        assert!(first.starts_with(&format!("generations/{}/", user_id)));
        assert!(first.ends_with(".png"));
    }

    #[test]
    fn different_poses_get_different_digests() {
        let user_id = Uuid::new_v4();
        let references = references();
        let other_pose = CatalogReferences {
            pose_id: Uuid::new_v4(),
            ..references
        };
        let product = ReferenceImage::new(vec![1, 2, 3], "image/png");
        let generation_id = Uuid::new_v4();

        assert_ne!(
            artifact_path(user_id, generation_id, &references, &product, "png"),
            artifact_path(user_id, generation_id, &other_pose, &product, "png")
        );
    }

    #[test]
    fn sniffs_common_image_formats() {
        assert_eq!(sniff_image_format(&[0xFF, 0xD8, 0xFF, 0xE0]), ("image/jpeg", "jpg"));
        assert_eq!(
            sniff_image_format(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            ("image/webp", "webp")
        );
        assert_eq!(sniff_image_format(&[0x89, b'P', b'N', b'G']), ("image/png", "png"));
        assert_eq!(sniff_image_format(b"????"), ("image/png", "png"));
    }

    #[tokio::test]
    async fn unrepresentable_expiry_fails_the_attempt_and_discards_the_artifact() {
        let generations = Arc::new(InMemoryGenerations::default());
        let storage = Arc::new(InMemoryBlobStorage::default());
        let mut generator = MockImageGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(PNG_BYTES.to_vec()));
        let pipeline = GenerationPipeline::new(
            Arc::clone(&generations),
            Arc::clone(&storage),
            Arc::new(generator),
            chrono::Duration::MAX,
        );
        let face = ReferenceImage::new(vec![1], "image/webp");
        let background = ReferenceImage::new(vec![2], "image/jpeg");
        let product = ReferenceImage::new(vec![3], "image/jpeg");

        let failure = pipeline
            .run(GenerationAttempt {
                user_id: Uuid::new_v4(),
                references: references(),
                generation_type: GenerationType::Single,
                product_type_name: "Saree",
                pose_description: "standing",
                face: &face,
                background: &background,
                product_image: &product,
                started_at: Instant::now(),
            })
            .await
            .unwrap_err();

        assert!(matches!(failure.error, GenerationError::Internal(_)));
        assert_eq!(storage.object_count(), 0);
        assert_eq!(storage.deleted().len(), 1);

        let rows = generations.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status(), GenerationStatus::Failed);
    }
}
