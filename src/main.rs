use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

use episode_api::{AppConfig, ApplicationServer, Logger, RedisDatabase, server::AppServices};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // guards are kept alive to flush logs and keep the sentry client around
    let _guards = Logger::init(config.cargo_env, config.sentry_dsn.clone());

    info!("logger and env prepped...");

    // a missing recorder just means the counters are no-ops
    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("failed to install prometheus recorder: {}", e);
            None
        }
    };

    let redis_db = match config.redis_url.as_deref() {
        Some(url) => {
            info!("connecting to redis...");
            Some(
                RedisDatabase::connect(url)
                    .await
                    .context("redis_url is set but the connection failed")?,
            )
        }
        None => None,
    };

    let services = AppServices::new(redis_db, config.clone()).context("failed to build services")?;

    info!("services ok, starting server...");

    ApplicationServer::serve(config, services, metrics)
        .await
        .context("server failed to start")?;

    Ok(())
}
