use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{AppraisalId, PropertyDetails, ValuationRequest};
use super::engine::ValuationError;
use super::repository::{ComparableSource, StoreError, ValuationStore};
use super::service::{AppraisalValuationService, ValuationServiceError};

/// Router builder exposing valuation endpoints.
pub fn valuation_router<S, R>(service: Arc<AppraisalValuationService<S, R>>) -> Router
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    Router::new()
        .route("/api/v1/appraisals/valuations", post(valuate_handler::<S, R>))
        .route(
            "/api/v1/appraisals/:appraisal_id/valuation",
            get(valuation_handler::<S, R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/valuation/audit",
            get(audit_handler::<S, R>),
        )
        .route(
            "/api/v1/appraisals/:appraisal_id/valuation/from-source",
            post(source_valuation_handler::<S, R>),
        )
        .with_state(service)
}

/// Subject of a valuation whose comparables come from the configured source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceValuationRequest {
    pub property_details: PropertyDetails,
    #[serde(default)]
    pub valuation_date: Option<NaiveDate>,
}

pub(crate) async fn valuate_handler<S, R>(
    State(service): State<Arc<AppraisalValuationService<S, R>>>,
    payload: Result<axum::Json<ValuationRequest>, JsonRejection>,
) -> Response
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    let axum::Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.valuate(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn valuation_handler<S, R>(
    State(service): State<Arc<AppraisalValuationService<S, R>>>,
    Path(appraisal_id): Path<Uuid>,
) -> Response
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    match service.get(&AppraisalId(appraisal_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn audit_handler<S, R>(
    State(service): State<Arc<AppraisalValuationService<S, R>>>,
    Path(appraisal_id): Path<Uuid>,
) -> Response
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    match service.get(&AppraisalId(appraisal_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn source_valuation_handler<S, R>(
    State(service): State<Arc<AppraisalValuationService<S, R>>>,
    Path(appraisal_id): Path<Uuid>,
    payload: Result<axum::Json<SourceValuationRequest>, JsonRejection>,
) -> Response
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    let axum::Json(SourceValuationRequest {
        property_details,
        valuation_date,
    }) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };

    match service.valuate_from_source(AppraisalId(appraisal_id), property_details, valuation_date)
    {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => error_response(err),
    }
}

/// Undecodable bodies are bad data, reported like any other `InvalidInput`.
fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": rejection.body_text(),
        "kind": "invalid_input",
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn error_response(err: ValuationServiceError) -> Response {
    let (status, kind) = classify(&err);
    let payload = json!({
        "error": err.to_string(),
        "kind": kind,
    });
    (status, axum::Json(payload)).into_response()
}

/// HTTP status and stable label for a service error.
pub fn classify(err: &ValuationServiceError) -> (StatusCode, &'static str) {
    match err {
        ValuationServiceError::Valuation(inner @ ValuationError::InvalidInput(_)) => {
            (StatusCode::BAD_REQUEST, inner.kind())
        }
        ValuationServiceError::Valuation(inner @ ValuationError::InsufficientComparables { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, inner.kind())
        }
        ValuationServiceError::Valuation(inner @ ValuationError::DegenerateAggregation(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, inner.kind())
        }
        ValuationServiceError::Store(StoreError::NotFound) => (StatusCode::NOT_FOUND, "not_found"),
        ValuationServiceError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable"),
        ValuationServiceError::Source(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "source_unavailable")
        }
    }
}
