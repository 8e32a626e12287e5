use super::common::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;
use tower::ServiceExt;

use crate::valuation::router::{
    audit_handler, source_valuation_handler, valuate_handler, valuation_handler,
    SourceValuationRequest,
};
use crate::valuation::{AppraisalValuationService, ValuationConfig};

fn post_valuation(body: Vec<u8>) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post("/api/v1/appraisals/valuations")
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .expect("request builds")
}

#[tokio::test]
async fn valuation_route_returns_created_view() {
    let (service, _, _) = build_service(Vec::new());
    let router = router_for(service);

    let response = router
        .oneshot(post_valuation(
            serde_json::to_vec(&request(reference_comparables())).expect("serializes"),
        ))
        .await
        .expect("router responds");

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appraisalId"], appraisal_id().0.to_string());
    assert_eq!(body["parameterSet"], "baseline-2024.1");
    assert_eq!(body["valuatedOn"], "2025-07-01");
    assert_eq!(body["comparablesUsed"], 3);
    let low = body["valuationLow"].as_u64().expect("low is integer");
    let high = body["valuationHigh"].as_u64().expect("high is integer");
    assert!(low <= high);
}

#[tokio::test]
async fn camel_case_payloads_are_accepted() {
    let (service, _, _) = build_service(Vec::new());
    let router = router_for(service);

    let payload = serde_json::json!({
        "appraisalId": appraisal_id().0,
        "valuationDate": "2025-07-01",
        "propertyDetails": {
            "address": "12 Kauri Street",
            "suburb": "Ponsonby",
            "city": "Auckland",
            "propertyType": "house",
            "bedrooms": 3,
            "bathrooms": 2,
            "floorArea": 150
        },
        "comparableProperties": [
            {
                "id": "00000000-0000-0000-0000-00000000000a",
                "address": "10 Rata Lane", "suburb": "Ponsonby", "city": "Auckland",
                "propertyType": "house", "bedrooms": 3, "bathrooms": 2, "floorArea": 150,
                "salePrice": 800000
            },
            {
                "id": "00000000-0000-0000-0000-00000000000b",
                "address": "11 Rata Lane", "suburb": "Ponsonby", "city": "Auckland",
                "propertyType": "house", "bedrooms": 3, "bathrooms": 2, "floorArea": 155,
                "salePrice": 820000, "similarityScore": 12
            },
            {
                "id": "00000000-0000-0000-0000-00000000000c",
                "address": "12 Rata Lane", "suburb": "Ponsonby", "city": "Auckland",
                "propertyType": "house", "bedrooms": 2, "bathrooms": 1, "floorArea": 120,
                "salePrice": 790000
            }
        ]
    });

    let response = router
        .oneshot(post_valuation(serde_json::to_vec(&payload).expect("serializes")))
        .await
        .expect("router responds");

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body {body}");
    let confidence = body["valuationConfidence"].as_u64().expect("confidence");
    assert!((60..=80).contains(&confidence));
}

#[tokio::test]
async fn insufficient_comparables_map_to_unprocessable() {
    let (service, _, _) = build_service(Vec::new());
    let mut comparables = reference_comparables();
    comparables.truncate(2);

    let response = valuate_handler::<MemorySource, MemoryStore>(
        State(service),
        Ok(axum::Json(request(comparables))),
    )
    .await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "insufficient_comparables");
}

#[tokio::test]
async fn invalid_input_maps_to_bad_request() {
    let (service, _, _) = build_service(Vec::new());
    let mut invalid = request(reference_comparables());
    invalid.property_details.city = String::new();

    let response =
        valuate_handler::<MemorySource, MemoryStore>(State(service), Ok(axum::Json(invalid))).await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn store_failure_maps_to_internal_error() {
    let service = Arc::new(AppraisalValuationService::new(
        Arc::new(MemorySource::default()),
        Arc::new(UnavailableStore),
        ValuationConfig::default(),
    ));

    let response = valuate_handler::<MemorySource, UnavailableStore>(
        State(service),
        Ok(axum::Json(request(reference_comparables()))),
    )
    .await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "store_unavailable");
}

#[tokio::test]
async fn unknown_appraisal_returns_not_found() {
    let (service, _, _) = build_service(Vec::new());

    let response =
        valuation_handler::<MemorySource, MemoryStore>(State(service), Path(appraisal_id().0))
            .await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn stored_valuation_and_audit_are_retrievable() {
    let (service, _, _) = build_service(Vec::new());
    let mut comparables = reference_comparables();
    comparables.push(inflated_comparable());
    service
        .valuate(request(comparables))
        .expect("valuation stored");

    let view = valuation_handler::<MemorySource, MemoryStore>(
        State(service.clone()),
        Path(appraisal_id().0),
    )
    .await;
    let (status, body) = json_body(view).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["comparablesUsed"], 3);

    let audit =
        audit_handler::<MemorySource, MemoryStore>(State(service), Path(appraisal_id().0)).await;
    let (status, body) = json_body(audit).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["screening"]["screening"]["status"], "screened");
    assert_eq!(body["parameter_set"], "baseline-2024.1");
}

#[tokio::test]
async fn undecodable_bodies_map_to_bad_request() {
    let mut missing_address =
        serde_json::to_value(request(reference_comparables())).expect("serializes");
    missing_address["propertyDetails"]
        .as_object_mut()
        .expect("details object")
        .remove("address");

    let mut negative_bedrooms =
        serde_json::to_value(request(reference_comparables())).expect("serializes");
    negative_bedrooms["propertyDetails"]["bedrooms"] = serde_json::json!(-2);

    for payload in [missing_address, negative_bedrooms] {
        let (service, _, store) = build_service(Vec::new());
        let response = router_for(service)
            .oneshot(post_valuation(
                serde_json::to_vec(&payload).expect("serializes"),
            ))
            .await
            .expect("router responds");

        let (status, body) = json_body(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_input");
        assert!(body["error"].as_str().is_some_and(|message| !message.is_empty()));
        assert_eq!(store.len(), 0);
    }
}

#[tokio::test]
async fn source_route_valuates_stored_sales() {
    let mut comparables = reference_comparables();
    comparables.push(inflated_comparable());
    let (service, source, store) = build_service(comparables);
    let router = router_for(service);

    let payload = serde_json::json!({
        "propertyDetails": serde_json::to_value(subject()).expect("serializes"),
        "valuationDate": "2025-07-01",
    });
    let response = router
        .oneshot(
            axum::http::Request::post(format!(
                "/api/v1/appraisals/{}/valuation/from-source",
                appraisal_id().0
            ))
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(
                serde_json::to_vec(&payload).expect("serializes"),
            ))
            .expect("request builds"),
        )
        .await
        .expect("router responds");

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body {body}");
    assert_eq!(body["comparablesUsed"], 3);
    assert_eq!(body["valuatedOn"], "2025-07-01");
    assert_eq!(source.requested_radius(), Some(5.0));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn source_route_without_sales_is_unprocessable() {
    let (service, _, _) = build_service(Vec::new());

    let response = source_valuation_handler::<MemorySource, MemoryStore>(
        State(service),
        Path(appraisal_id().0),
        Ok(axum::Json(SourceValuationRequest {
            property_details: subject(),
            valuation_date: Some(valuation_date()),
        })),
    )
    .await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "insufficient_comparables");
}
