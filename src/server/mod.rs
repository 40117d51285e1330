pub mod api;
pub mod dtos;
pub mod error;
pub mod extractors;
pub mod services;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{
    Extension, Router, ServiceExt,
    extract::Request,
    http::{HeaderValue, Method},
    routing::get,
};
use lazy_static::lazy_static;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::Layer;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;
use api::{
    episode_controller::EpisodeController, health_controller::health_endpoint,
    metrics_controller::metrics_endpoint,
};
pub use services::AppServices;

lazy_static! {
    static ref START_TIME: Instant = Instant::now();
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub struct ApplicationServer;

impl ApplicationServer {
    /// all routes with their layers, split out of `serve` so tests can drive it directly
    pub fn router(services: AppServices, metrics: Option<PrometheusHandle>) -> Router {
        let cors = Self::cors_layer(&services.config.cors_origin);

        let mut router = Router::new()
            .nest("/api", EpisodeController::app())
            .route("/health", get(health_endpoint));

        if let Some(handle) = metrics {
            router = router.route("/metrics", get(metrics_endpoint).layer(Extension(handle)));
        }

        router
            .layer(Extension(services))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(
        config: Arc<AppConfig>,
        services: AppServices,
        metrics: Option<PrometheusHandle>,
    ) -> anyhow::Result<()> {
        lazy_static::initialize(&START_TIME);

        let router = Self::router(services, metrics);
        // trailing slashes have to be trimmed before routing, so this wraps the router itself
        let app = NormalizePathLayer::trim_trailing_slash().layer(router);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind to {}", addr))?;

        info!("listening on {}", addr);

        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

        Ok(())
    }

    fn cors_layer(cors_origin: &str) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any);

        if cors_origin.trim() == "*" {
            return layer.allow_origin(Any);
        }

        let origins = cors_origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect::<Vec<_>>();

        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    info!("shutdown signal received, stopping server");
}
