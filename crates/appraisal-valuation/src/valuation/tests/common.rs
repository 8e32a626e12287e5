use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::valuation::domain::{
    AppraisalId, ComparableProperty, PropertyDetails, PropertyType, ValuationRequest,
};
use crate::valuation::repository::{
    ComparableSource, SourceError, StoreError, ValuationRecord, ValuationStore,
};
use crate::valuation::{valuation_router, AppraisalValuationService, ValuationConfig};

pub(super) fn appraisal_id() -> AppraisalId {
    AppraisalId(Uuid::from_u128(0xA11CE))
}

pub(super) fn valuation_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date")
}

pub(super) fn subject() -> PropertyDetails {
    PropertyDetails {
        address: "12 Kauri Street".to_string(),
        suburb: "Ponsonby".to_string(),
        city: "Auckland".to_string(),
        property_type: PropertyType::House,
        bedrooms: Some(3),
        bathrooms: Some(2.0),
        land_size: None,
        floor_area: Some(150.0),
        year_built: None,
    }
}

pub(super) fn comparable(
    id: u128,
    price: Option<f64>,
    bedrooms: u32,
    bathrooms: f64,
    floor_area: f64,
) -> ComparableProperty {
    ComparableProperty {
        id: Uuid::from_u128(id),
        details: PropertyDetails {
            address: format!("{id} Rata Lane"),
            bedrooms: Some(bedrooms),
            bathrooms: Some(bathrooms),
            floor_area: Some(floor_area),
            ..subject()
        },
        sale_date: None,
        sale_price: price,
        similarity_score: None,
        distance_km: None,
    }
}

/// Comparables A, B, and C from the reference scenario.
pub(super) fn reference_comparables() -> Vec<ComparableProperty> {
    vec![
        comparable(0xA, Some(800_000.0), 3, 2.0, 150.0),
        comparable(0xB, Some(820_000.0), 3, 2.0, 155.0),
        comparable(0xC, Some(790_000.0), 2, 1.0, 120.0),
    ]
}

/// Comparable D: identical to the subject but priced far above the cluster.
pub(super) fn inflated_comparable() -> ComparableProperty {
    comparable(0xD, Some(2_500_000.0), 3, 2.0, 150.0)
}

pub(super) fn request(comparables: Vec<ComparableProperty>) -> ValuationRequest {
    ValuationRequest {
        appraisal_id: appraisal_id(),
        property_details: subject(),
        comparable_properties: comparables,
        valuation_date: Some(valuation_date()),
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<HashMap<AppraisalId, ValuationRecord>>,
}

impl MemoryStore {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("store mutex poisoned").len()
    }
}

impl ValuationStore for MemoryStore {
    fn save(&self, record: ValuationRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.insert(record.appraisal_id(), record);
        Ok(())
    }

    fn fetch(&self, id: &AppraisalId) -> Result<Option<ValuationRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableStore;

impl ValuationStore for UnavailableStore {
    fn save(&self, _record: ValuationRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("maintenance window".to_string()))
    }

    fn fetch(&self, _id: &AppraisalId) -> Result<Option<ValuationRecord>, StoreError> {
        Err(StoreError::Unavailable("maintenance window".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemorySource {
    comparables: Vec<ComparableProperty>,
    requested_radius: Mutex<Option<f64>>,
}

impl MemorySource {
    pub(super) fn with(comparables: Vec<ComparableProperty>) -> Self {
        Self {
            comparables,
            requested_radius: Mutex::new(None),
        }
    }

    pub(super) fn requested_radius(&self) -> Option<f64> {
        *self.requested_radius.lock().expect("source mutex poisoned")
    }
}

impl ComparableSource for MemorySource {
    fn candidates(
        &self,
        _subject: &PropertyDetails,
        radius_km: f64,
    ) -> Result<Vec<ComparableProperty>, SourceError> {
        *self.requested_radius.lock().expect("source mutex poisoned") = Some(radius_km);
        Ok(self.comparables.clone())
    }
}

pub(super) struct OfflineSource;

impl ComparableSource for OfflineSource {
    fn candidates(
        &self,
        _subject: &PropertyDetails,
        _radius_km: f64,
    ) -> Result<Vec<ComparableProperty>, SourceError> {
        Err(SourceError::Unavailable("provider timeout".to_string()))
    }
}

pub(super) type MemoryService = AppraisalValuationService<MemorySource, MemoryStore>;

pub(super) fn build_service(
    comparables: Vec<ComparableProperty>,
) -> (Arc<MemoryService>, Arc<MemorySource>, Arc<MemoryStore>) {
    let source = Arc::new(MemorySource::with(comparables));
    let store = Arc::new(MemoryStore::default());
    let service = Arc::new(AppraisalValuationService::new(
        source.clone(),
        store.clone(),
        ValuationConfig::default(),
    ));
    (service, source, store)
}

pub(super) fn router_for(service: Arc<MemoryService>) -> axum::Router {
    valuation_router(service)
}

pub(super) async fn json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
