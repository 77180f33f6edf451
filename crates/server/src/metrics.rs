//! Prometheus metrics

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

/// Install the global Prometheus recorder (idempotent)
///
/// Returns `None` when another recorder was already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Prometheus recorder not installed");
                None
            },
        })
        .clone()
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get().and_then(|h| h.as_ref()) {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Count one request by matched route and response status
pub fn record_request(route: &str, status: StatusCode) {
    metrics::counter!(
        "creditai_http_requests_total",
        "route" => route.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

/// Scoring outcome: `computed` or `default`
pub fn record_score(outcome: &'static str) {
    metrics::counter!("creditai_scores_total", "outcome" => outcome).increment(1);
}

/// Chat outcome: `ok` or `error`
pub fn record_chat(outcome: &'static str) {
    metrics::counter!("creditai_chat_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_llm_latency(ms: u64) {
    metrics::histogram!("creditai_llm_latency_ms").record(ms as f64);
}
