use axum::Extension;
use metrics_exporter_prometheus::PrometheusHandle;

/// prometheus text format, only mounted when the recorder was installed
pub async fn metrics_endpoint(Extension(handle): Extension<PrometheusHandle>) -> String {
    handle.render()
}
