use axum::Extension;
use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::error;

use crate::server::dtos::health_dto::{CacheHealth, HealthResponse, HealthStatus, ServiceHealthDetails};
use crate::server::services::AppServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// health endpoint, the cache is the only dependency worth pinging
/// a dead cache only degrades the service since resolution still works without it
pub async fn health_endpoint(
    Extension(services): Extension<AppServices>,
) -> (StatusCode, Json<HealthResponse>) {
    let cache_health = check_cache_health(&services).await;

    let overall_status = match cache_health.status {
        HealthStatus::Unhealthy => HealthStatus::Degraded,
        status => status,
    };

    let response = HealthResponse {
        status: overall_status,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: format!("{:?}", services.config.cargo_env).to_lowercase(),
        services: ServiceHealthDetails {
            cache: cache_health,
        },
    };

    let http_status = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(response))
}

async fn check_cache_health(services: &AppServices) -> CacheHealth {
    let Some(redis) = services.redis.as_ref() else {
        return CacheHealth {
            status: HealthStatus::Healthy,
            enabled: false,
            response_time_ms: 0.0,
        };
    };

    match redis.health_check().await {
        Ok(response_time) => CacheHealth {
            status: HealthStatus::Healthy,
            enabled: true,
            response_time_ms: response_time,
        },
        Err(e) => {
            error!("Redis health check failed: {}", e);
            CacheHealth {
                status: HealthStatus::Unhealthy,
                enabled: true,
                response_time_ms: 0.0,
            }
        }
    }
}
