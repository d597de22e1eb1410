use std::{fmt::Display, str::FromStr};

use anyhow::{Context, Result, bail};
use crates::{
    domain::value_objects::{
        credits::CreditCosts,
        generations::{
            DEFAULT_BULK_MAX_CONCURRENCY, DEFAULT_BULK_MAX_POSES, DEFAULT_RETENTION_HOURS,
            GenerationSettings, MAX_RETENTION_HOURS,
        },
    },
    infra::{image_generation::gemini::GeminiConfig, storages::object_storage::ObjectStorageConfig},
};

use super::config_model::{Cleanup, Database, DotEnvyConfig};
use crate::usecases::cleanup_expired_generations::MAX_LOOKBACK_HOURS;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let database = Database {
        url: env.required("DATABASE_URL")?,
    };

    let object_storage = ObjectStorageConfig {
        endpoint: env.required("OBJECT_STORAGE_ENDPOINT")?,
        region: env.required("OBJECT_STORAGE_REGION")?,
        bucket: env.required("OBJECT_STORAGE_BUCKET")?,
        access_key: env.required("OBJECT_STORAGE_ACCESS_KEY")?,
        secret_key: env.required("OBJECT_STORAGE_SECRET_KEY")?,
        prefix: env.optional("OBJECT_STORAGE_PREFIX").unwrap_or_default(),
        public_base_url: env.required("OBJECT_STORAGE_PUBLIC_BASE_URL")?,
        timeout_secs: env.parsed_or("OBJECT_STORAGE_TIMEOUT_SECS", 60)?,
    };

    let image_generator = GeminiConfig {
        base_url: env
            .optional("IMAGE_GENERATOR_BASE_URL")
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
        api_key: env.required("IMAGE_GENERATOR_API_KEY")?,
        model: env
            .optional("IMAGE_GENERATOR_MODEL")
            .unwrap_or_else(|| "gemini-2.5-flash-image".to_string()),
        timeout_secs: env.parsed_or("IMAGE_GENERATOR_TIMEOUT_SECS", 120)?,
    };

    let defaults = CreditCosts::default();
    let credits = CreditCosts {
        signup_bonus: env.parsed_or("CREDITS_SIGNUP_BONUS", defaults.signup_bonus)?,
        image_generation: env
            .parsed_or("CREDITS_IMAGE_GENERATION_COST", defaults.image_generation)?,
        bulk_image: env.parsed_or("CREDITS_BULK_IMAGE_COST", defaults.bulk_image)?,
    };

    if credits.image_generation <= 0 || credits.bulk_image <= 0 {
        bail!("credit costs must be positive");
    }
    if credits.signup_bonus < 0 {
        bail!("CREDITS_SIGNUP_BONUS must not be negative");
    }

    let generation = GenerationSettings {
        retention_hours: env.parsed_or("GENERATION_RETENTION_HOURS", DEFAULT_RETENTION_HOURS)?,
        bulk_max_poses: env.parsed_or("BULK_MAX_POSES", DEFAULT_BULK_MAX_POSES)?,
        bulk_max_concurrency: env.parsed_or("BULK_MAX_CONCURRENCY", DEFAULT_BULK_MAX_CONCURRENCY)?,
    };

    if generation.retention().is_none() {
        bail!("GENERATION_RETENTION_HOURS must be between 1 and {MAX_RETENTION_HOURS}");
    }
    if generation.bulk_max_poses == 0 || generation.bulk_max_concurrency == 0 {
        bail!("BULK_MAX_POSES and BULK_MAX_CONCURRENCY must be positive");
    }

    let cleanup = Cleanup {
        sweep_interval_secs: env.parsed_or("CLEANUP_SWEEP_INTERVAL_SECS", 900)?,
        sweep_lookback_hours: env.parsed_or("CLEANUP_SWEEP_LOOKBACK_HOURS", 48)?,
        sweep_limit: env.parsed_or("CLEANUP_SWEEP_LIMIT", 500)?,
    };

    if !(1..=MAX_LOOKBACK_HOURS).contains(&cleanup.sweep_lookback_hours) {
        bail!("CLEANUP_SWEEP_LOOKBACK_HOURS must be between 1 and {MAX_LOOKBACK_HOURS}");
    }

    Ok(DotEnvyConfig {
        database,
        object_storage,
        image_generator,
        credits,
        generation,
        cleanup,
    })
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("{key} is missing"))
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|err| anyhow::anyhow!("{key} is invalid (value: {raw}): {err}")),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/studio"),
            ("OBJECT_STORAGE_ENDPOINT", "https://s3.example.com"),
            ("OBJECT_STORAGE_REGION", "us-east-1"),
            ("OBJECT_STORAGE_BUCKET", "studio"),
            ("OBJECT_STORAGE_ACCESS_KEY", "key"),
            ("OBJECT_STORAGE_SECRET_KEY", "secret"),
            ("OBJECT_STORAGE_PUBLIC_BASE_URL", "https://cdn.example.com"),
            ("IMAGE_GENERATOR_API_KEY", "api-key"),
        ])
    }

    fn load_map(env: &HashMap<&'static str, &'static str>) -> Result<DotEnvyConfig> {
        load_from(|key| env.get(key).map(|value| value.to_string()))
    }

    #[test]
    fn applies_defaults_when_optional_values_are_missing() {
        let config = load_map(&base_env()).unwrap();

        assert_eq!(config.credits, CreditCosts::default());
        assert_eq!(config.generation, GenerationSettings::default());
        assert_eq!(config.cleanup.sweep_interval_secs, 900);
        assert_eq!(config.image_generator.model, "gemini-2.5-flash-image");
    }

    #[test]
    fn reads_overrides() {
        let mut env = base_env();
        env.insert("CREDITS_IMAGE_GENERATION_COST", "7");
        env.insert("GENERATION_RETENTION_HOURS", "72");
        env.insert("BULK_MAX_CONCURRENCY", "2");

        let config = load_map(&env).unwrap();

        assert_eq!(config.credits.image_generation, 7);
        assert_eq!(config.generation.retention_hours, 72);
        assert_eq!(config.generation.bulk_max_concurrency, 2);
    }

    #[test]
    fn missing_required_value_names_the_key() {
        let mut env = base_env();
        env.remove("DATABASE_URL");

        let err = load_map(&env).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn rejects_non_positive_costs() {
        let mut env = base_env();
        env.insert("CREDITS_BULK_IMAGE_COST", "0");

        assert!(load_map(&env).is_err());
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let mut env = base_env();
        env.insert("GENERATION_RETENTION_HOURS", "a day");

        let err = load_map(&env).unwrap_err();
        assert!(err.to_string().contains("GENERATION_RETENTION_HOURS"));
    }

    #[test]
    fn rejects_retention_and_lookback_beyond_their_limits() {
        let mut env = base_env();
        env.insert("GENERATION_RETENTION_HOURS", "100000000000");
        let err = load_map(&env).unwrap_err();
        assert!(err.to_string().contains("GENERATION_RETENTION_HOURS"));

        let mut env = base_env();
        env.insert("CLEANUP_SWEEP_LOOKBACK_HOURS", "100000000000");
        let err = load_map(&env).unwrap_err();
        assert!(err.to_string().contains("CLEANUP_SWEEP_LOOKBACK_HOURS"));

        let mut env = base_env();
        env.insert("GENERATION_RETENTION_HOURS", "8760");
        env.insert("CLEANUP_SWEEP_LOOKBACK_HOURS", "8760");
        assert!(load_map(&env).is_ok());
    }
}
