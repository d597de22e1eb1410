use std::sync::Arc;

use crates::domain::{
    repositories::{
        catalog::CatalogRepository, credit_ledger::CreditLedgerRepository,
        generations::GenerationRepository, image_generator::ImageGenerator, storage::BlobStorage,
    },
    value_objects::{
        credits::BalanceInvariantViolation,
        enums::{credit_operation_types::CreditOperationType, generation_types::GenerationType},
        generations::{GeneratedImage, GenerationRequest},
    },
};
use http::StatusCode;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    cleanup_scheduler::CleanupScheduler,
    credit_ledger::{CreditLedgerError, CreditLedgerUseCase},
    generation_pipeline::{GenerationAttempt, GenerationPipeline},
    reference_resolver::ReferenceResolver,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i32, available: i32 },
    #[error("{operation} failed")]
    ExternalService {
        operation: &'static str,
        message: String,
    },
    #[error("all generations failed")]
    AllGenerationsFailed,
    #[error(transparent)]
    InvariantViolation(BalanceInvariantViolation),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GenerationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Validation(_) | GenerationError::AllGenerationsFailed => {
                StatusCode::BAD_REQUEST
            }
            GenerationError::NotFound(_) => StatusCode::NOT_FOUND,
            GenerationError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            GenerationError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            GenerationError::InvariantViolation(_) | GenerationError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Full message kept on the generation record. Callers only see `Display`.
    pub fn detail(&self) -> String {
        match self {
            GenerationError::ExternalService { operation, message } => {
                format!("{} failed: {}", operation, message)
            }
            GenerationError::Internal(err) => format!("{:#}", err),
            other => other.to_string(),
        }
    }
}

impl From<CreditLedgerError> for GenerationError {
    fn from(err: CreditLedgerError) -> Self {
        match err {
            CreditLedgerError::Validation(message) => GenerationError::Validation(message),
            CreditLedgerError::UserNotFound(_) => {
                GenerationError::NotFound("Credit account".to_string())
            }
            CreditLedgerError::InsufficientCredits {
                required,
                available,
            } => GenerationError::InsufficientCredits {
                required,
                available,
            },
            CreditLedgerError::InvariantViolation(violation) => {
                GenerationError::InvariantViolation(violation)
            }
            CreditLedgerError::Internal(err) => GenerationError::Internal(err),
        }
    }
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

pub struct GenerationUseCase<L, C, G, B, I, S>
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
}

impl<L, C, G, B, I, S> GenerationUseCase<L, C, G, B, I, S>
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
    ) -> Self {
        Self {
            ledger,
            resolver,
            pipeline,
            cleanup_scheduler,
        }
    }

    /// Generates one image and charges for it. Credits are only taken once the artifact
    /// and its success record exist; if that charge fails the artifact is withdrawn.
    pub async fn generate_single(
        &self,
        request: GenerationRequest,
        user_id: Uuid,
    ) -> GenerationResult<GeneratedImage> {
        let started_at = Instant::now();
        let cost = self.ledger.costs().image_generation;

        let available = self.ledger.check_balance(user_id).await?;
        if available < cost {
            warn!(
                %user_id,
                required = cost,
                available,
                "generation: balance below generation cost"
            );
            return Err(GenerationError::InsufficientCredits {
                required: cost,
                available,
            });
        }

        let references = request.references;
        let resolved = self.resolver.validate(&references).await?;
        let assets = self.resolver.fetch_reference_assets(&resolved).await?;

        let artifact = self
            .pipeline
            .run(GenerationAttempt {
                user_id,
                references,
                generation_type: GenerationType::Single,
                product_type_name: &resolved.product_type.name,
                pose_description: &assets.pose_description,
                face: &assets.face,
                background: &assets.background,
                product_image: &request.product_image,
                started_at,
            })
            .await
            .map_err(|failure| failure.error)?;

        if let Err(err) = self
            .ledger
            .deduct_credits_or_fail(
                user_id,
                cost,
                CreditOperationType::ImageGeneration,
                "Image generation",
                Some(artifact.generation_id),
            )
            .await
        {
            warn!(
                %user_id,
                generation_id = %artifact.generation_id,
                error = %err,
                "generation: charge failed after generation, withdrawing artifact"
            );
            self.pipeline
                .compensate(&artifact, &format!("credit charge failed: {}", err))
                .await;
            return Err(err.into());
        }

        self.cleanup_scheduler
            .schedule_deletion(artifact.artifact_path.clone(), artifact.generation_id);

        info!(
            %user_id,
            generation_id = %artifact.generation_id,
            credits_charged = cost,
            "generation: single generation completed"
        );

        Ok(artifact.into())
    }
}
