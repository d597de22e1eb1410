use std::{collections::HashSet, sync::Arc};

use anyhow::anyhow;
use crates::domain::{
    repositories::{
        catalog::CatalogRepository, credit_ledger::CreditLedgerRepository,
        generations::GenerationRepository, image_generator::ImageGenerator, storage::BlobStorage,
    },
    value_objects::{
        enums::{credit_operation_types::CreditOperationType, generation_types::GenerationType},
        generations::{BulkGenerationRequest, BulkGenerationResult, GenerationSettings, PoseFailure},
    },
};
use futures_util::future::join_all;
use tokio::{sync::Semaphore, time::Instant};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    cleanup_scheduler::CleanupScheduler,
    credit_ledger::CreditLedgerUseCase,
    generation::{GenerationError, GenerationResult},
    generation_pipeline::{AttemptFailure, GenerationAttempt, GenerationPipeline, StoredArtifact},
    reference_resolver::ReferenceResolver,
};

pub struct BulkGenerationUseCase<L, C, G, B, I, S>
where
    L: CreditLedgerRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
    B: BlobStorage + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
    S: CleanupScheduler + Send + Sync + 'static,
{
    ledger: Arc<CreditLedgerUseCase<L>>,
    resolver: Arc<ReferenceResolver<C, B>>,
    pipeline: Arc<GenerationPipeline<G, B, I>>,
    cleanup_scheduler: Arc<S>,
    settings: GenerationSettings,
}

impl<L, C, G, B, I, S> BulkGenerationUseCase<L, C, G, B, I, S>
where
    L: CreditLedgerRepository + Send + Sync + 'static,
    C: CatalogRepository + Send + Sync + 'static,
    G: GenerationRepository + Send + Sync + 'static,
    B: BlobStorage + Send + Sync + 'static,
    I: ImageGenerator + Send + Sync + 'static,
    S: CleanupScheduler + Send + Sync + 'static,
{
    pub fn new(
        ledger: Arc<CreditLedgerUseCase<L>>,
        resolver: Arc<ReferenceResolver<C, B>>,
        pipeline: Arc<GenerationPipeline<G, B, I>>,
        cleanup_scheduler: Arc<S>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            ledger,
            resolver,
            pipeline,
            cleanup_scheduler,
            settings,
        }
    }

    /// Runs one generation per pose against the shared references. Branch failures are
    /// isolated; the user is charged once, for the images that were produced.
    pub async fn generate_bulk(
        &self,
        request: BulkGenerationRequest,
        user_id: Uuid,
    ) -> GenerationResult<BulkGenerationResult> {
        self.validate_pose_ids(&request.pose_ids)?;

        let unit_cost = self.ledger.costs().bulk_image;
        let pose_count = request.pose_ids.len();
        let required = i32::try_from(pose_count)
            .ok()
            .and_then(|count| count.checked_mul(unit_cost))
            .ok_or_else(|| GenerationError::Validation("too many poses".to_string()))?;

        let available = self.ledger.check_balance(user_id).await?;
        if available < required {
            warn!(
                %user_id,
                pose_count,
                required,
                available,
                "bulk_generation: balance below bulk cost"
            );
            return Err(GenerationError::InsufficientCredits {
                required,
                available,
            });
        }

        let resolved = self
            .resolver
            .validate_bulk(&request.shared, &request.pose_ids)
            .await?;
        let shared_assets = self.resolver.fetch_shared_assets(&resolved).await?;

        let limiter = Semaphore::new(self.settings.bulk_max_concurrency.max(1));
        let branches = resolved.poses.iter().map(|pose| {
            let limiter = &limiter;
            let request = &request;
            let shared_assets = &shared_assets;
            let product_type_name = resolved.product_type.name.as_str();

            async move {
                let _permit = limiter.acquire().await.map_err(|err| AttemptFailure {
                    generation_id: None,
                    error: GenerationError::Internal(anyhow!(err)),
                })?;
                // Timed from the permit so queueing behind other poses is not counted.
                self.pipeline
                    .run(GenerationAttempt {
                        user_id,
                        references: request.shared.with_pose(pose.id),
                        generation_type: GenerationType::Bulk,
                        product_type_name,
                        pose_description: pose.prompt_description(),
                        face: &shared_assets.face,
                        background: &shared_assets.background,
                        product_image: &request.product_image,
                        started_at: Instant::now(),
                    })
                    .await
            }
        });

        let outcomes = join_all(branches).await;

        let mut artifacts: Vec<StoredArtifact> = Vec::with_capacity(pose_count);
        let mut failures = Vec::new();
        for (pose, outcome) in resolved.poses.iter().zip(outcomes) {
            match outcome {
                Ok(artifact) => artifacts.push(artifact),
                Err(failure) => {
                    warn!(
                        %user_id,
                        pose_id = %pose.id,
                        error = %failure.error,
                        "bulk_generation: pose failed"
                    );
                    failures.push(PoseFailure {
                        pose_id: pose.id,
                        generation_id: failure.generation_id,
                        error: failure.error.to_string(),
                    });
                }
            }
        }

        if artifacts.is_empty() {
            warn!(%user_id, pose_count, "bulk_generation: every pose failed");
            return Err(GenerationError::AllGenerationsFailed);
        }

        // Bounded by `required`, which already fit in an i32.
        let credits_charged = unit_cost * artifacts.len() as i32;
        let description = format!(
            "Bulk generation: {} of {} images",
            artifacts.len(),
            pose_count
        );

        if let Err(err) = self
            .ledger
            .deduct_credits_or_fail(
                user_id,
                credits_charged,
                CreditOperationType::BulkGeneration,
                &description,
                None,
            )
            .await
        {
            warn!(
                %user_id,
                credits_charged,
                error = %err,
                "bulk_generation: charge failed after generation, withdrawing artifacts"
            );
            let reason = format!("credit charge failed: {}", err);
            join_all(
                artifacts
                    .iter()
                    .map(|artifact| self.pipeline.compensate(artifact, &reason)),
            )
            .await;
            return Err(err.into());
        }

        for artifact in &artifacts {
            self.cleanup_scheduler
                .schedule_deletion(artifact.artifact_path.clone(), artifact.generation_id);
        }

        info!(
            %user_id,
            pose_count,
            succeeded = artifacts.len(),
            failed = failures.len(),
            credits_charged,
            "bulk_generation: completed"
        );

        Ok(BulkGenerationResult {
            images: artifacts.into_iter().map(Into::into).collect(),
            failures,
            credits_charged,
        })
    }

    fn validate_pose_ids(&self, pose_ids: &[Uuid]) -> GenerationResult<()> {
        if pose_ids.is_empty() {
            return Err(GenerationError::Validation(
                "at least one pose is required".to_string(),
            ));
        }

        if pose_ids.len() > self.settings.bulk_max_poses {
            return Err(GenerationError::Validation(format!(
                "at most {} poses are allowed per request",
                self.settings.bulk_max_poses
            )));
        }

        let mut seen = HashSet::with_capacity(pose_ids.len());
        if let Some(duplicate) = pose_ids.iter().find(|pose_id| !seen.insert(**pose_id)) {
            return Err(GenerationError::Validation(format!(
                "duplicate pose id {}",
                duplicate
            )));
        }

        Ok(())
    }
}
