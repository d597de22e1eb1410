use crates::{
    domain::value_objects::{credits::CreditCosts, generations::GenerationSettings},
    infra::{image_generation::gemini::GeminiConfig, storages::object_storage::ObjectStorageConfig},
};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub database: Database,
    pub object_storage: ObjectStorageConfig,
    pub image_generator: GeminiConfig,
    pub credits: CreditCosts,
    pub generation: GenerationSettings,
    pub cleanup: Cleanup,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Cleanup {
    pub sweep_interval_secs: u64,
    pub sweep_lookback_hours: i64,
    pub sweep_limit: i64,
}
