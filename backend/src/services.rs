use std::sync::Arc;

use anyhow::{Context, Result};
use crates::infra::{
    db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            catalog::CatalogPostgres, credit_ledger::CreditLedgerPostgres,
            generations::GenerationPostgres,
        },
    },
    image_generation::gemini::GeminiImageGenerator,
    storages::object_storage::ObjectStorageClient,
};
use tracing::info;

use crate::{
    config::config_model::DotEnvyConfig,
    usecases::{
        bulk_generation::BulkGenerationUseCase,
        cleanup_expired_generations::{
            CleanupExpiredGenerationsParams, CleanupExpiredGenerationsUseCase,
        },
        cleanup_scheduler::TokioCleanupScheduler,
        credit_ledger::CreditLedgerUseCase,
        generation::GenerationUseCase,
        generation_history::GenerationHistoryUseCase,
        generation_pipeline::GenerationPipeline,
        reference_resolver::ReferenceResolver,
    },
};

pub type ArtifactCleanupScheduler = TokioCleanupScheduler<ObjectStorageClient>;

pub type CreditLedgerService = CreditLedgerUseCase<CreditLedgerPostgres>;

pub type GenerationService = GenerationUseCase<
    CreditLedgerPostgres,
    CatalogPostgres,
    GenerationPostgres,
    ObjectStorageClient,
    GeminiImageGenerator,
    ArtifactCleanupScheduler,
>;

pub type BulkGenerationService = BulkGenerationUseCase<
    CreditLedgerPostgres,
    CatalogPostgres,
    GenerationPostgres,
    ObjectStorageClient,
    GeminiImageGenerator,
    ArtifactCleanupScheduler,
>;

pub type GenerationHistoryService = GenerationHistoryUseCase<GenerationPostgres>;

/// Every use case of the generation core, wired against Postgres, the object store and
/// the image generator. Route handlers hold on to these.
pub struct Services {
    pub credit_ledger: Arc<CreditLedgerService>,
    pub generation: Arc<GenerationService>,
    pub bulk_generation: Arc<BulkGenerationService>,
    pub generation_history: Arc<GenerationHistoryService>,
    pub cleanup_expired_generations: Arc<CleanupExpiredGenerationsUseCase>,
}

impl Services {
    pub async fn build(config: &DotEnvyConfig, db_pool: Arc<PgPoolSquad>) -> Result<Self> {
        let storage = Arc::new(ObjectStorageClient::new(config.object_storage.clone()).await?);
        info!(bucket = %config.object_storage.bucket, "Object storage client has been created");

        let image_generator = Arc::new(GeminiImageGenerator::new(config.image_generator.clone())?);
        info!(model = %config.image_generator.model, "Image generator client has been created");

        let ledger_repository = Arc::new(CreditLedgerPostgres::new(Arc::clone(&db_pool)));
        let catalog_repository = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool)));
        let generation_repository = Arc::new(GenerationPostgres::new(Arc::clone(&db_pool)));

        let retention = config
            .generation
            .retention()
            .context("GENERATION_RETENTION_HOURS is out of range")?;

        let credit_ledger = Arc::new(CreditLedgerUseCase::new(ledger_repository, config.credits));
        let resolver = Arc::new(ReferenceResolver::new(
            catalog_repository,
            Arc::clone(&storage),
        ));
        let pipeline = Arc::new(GenerationPipeline::new(
            Arc::clone(&generation_repository),
            Arc::clone(&storage),
            image_generator,
            retention,
        ));
        let cleanup_scheduler = Arc::new(TokioCleanupScheduler::new(
            Arc::clone(&storage),
            retention
                .to_std()
                .context("GENERATION_RETENTION_HOURS is out of range")?,
        ));

        let generation = Arc::new(GenerationUseCase::new(
            Arc::clone(&credit_ledger),
            Arc::clone(&resolver),
            Arc::clone(&pipeline),
            Arc::clone(&cleanup_scheduler),
        ));
        let bulk_generation = Arc::new(BulkGenerationUseCase::new(
            Arc::clone(&credit_ledger),
            resolver,
            pipeline,
            cleanup_scheduler,
            config.generation,
        ));
        let generation_history =
            Arc::new(GenerationHistoryUseCase::new(Arc::clone(&generation_repository)));
        let cleanup_expired_generations = Arc::new(CleanupExpiredGenerationsUseCase::new(
            generation_repository,
            storage,
        ));

        Ok(Self {
            credit_ledger,
            generation,
            bulk_generation,
            generation_history,
            cleanup_expired_generations,
        })
    }
}

pub fn sweep_params(config: &DotEnvyConfig) -> CleanupExpiredGenerationsParams {
    CleanupExpiredGenerationsParams {
        lookback_hours: config.cleanup.sweep_lookback_hours,
        limit: config.cleanup.sweep_limit,
        dry_run: false,
    }
}
