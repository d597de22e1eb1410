use anyhow::Result;
use backend::{
    config::config_loader,
    services::{Services, sweep_params},
};
use crates::infra::db::postgres::postgres_connection;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let services = Services::build(&dotenvy_env, Arc::new(postgres_pool)).await?;
    info!(
        image_generation_cost = dotenvy_env.credits.image_generation,
        bulk_image_cost = dotenvy_env.credits.bulk_image,
        retention_hours = dotenvy_env.generation.retention_hours,
        "Generation services are ready"
    );

    // Startup sweep picks up artifacts whose in-process timers died with the last process.
    let mut sweep_interval = tokio::time::interval(Duration::from_secs(
        dotenvy_env.cleanup.sweep_interval_secs.max(1),
    ));
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                if let Err(err) = services
                    .cleanup_expired_generations
                    .run(sweep_params(&dotenvy_env))
                    .await
                {
                    error!(error = ?err, "cleanup: expired artifact sweep failed");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
