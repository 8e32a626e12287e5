use crate::infra::AppState;
use appraisal_valuation::valuation::{
    valuation_router, AppraisalValuationService, ComparableSource, ValuationConfig,
    ValuationStore,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_valuation_routes<S, R>(
    service: Arc<AppraisalValuationService<S, R>>,
) -> axum::Router
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    valuation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/valuation/parameters",
            axum::routing::get(parameters_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Active parameter set, so callers can tell which weights produced a valuation.
pub(crate) async fn parameters_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<ValuationConfig> {
    Json(state.parameters.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;

    fn state(ready: bool, parameters: ValuationConfig) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            parameters: Arc::new(parameters),
        }
    }

    #[tokio::test]
    async fn parameters_endpoint_reports_active_set() {
        let parameters = ValuationConfig {
            parameter_set: "coastal-2025.2".to_string(),
            ..ValuationConfig::default()
        };

        let Json(body) = parameters_endpoint(Extension(state(true, parameters.clone()))).await;

        assert_eq!(body, parameters);
        assert_eq!(body.similarity.max_radius_km, 5.0);
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        let pending = readiness_endpoint(Extension(state(false, ValuationConfig::default())))
            .await
            .into_response();
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = readiness_endpoint(Extension(state(true, ValuationConfig::default())))
            .await
            .into_response();
        assert_eq!(ready.status(), StatusCode::OK);
    }
}
