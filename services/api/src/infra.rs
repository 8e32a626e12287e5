use appraisal_valuation::valuation::{
    AppraisalId, ComparableProperty, ComparableSource, PropertyDetails, SourceError, StoreError,
    ValuationConfig, ValuationRecord, ValuationStore,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) parameters: Arc<ValuationConfig>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryValuationStore {
    records: Arc<Mutex<HashMap<AppraisalId, ValuationRecord>>>,
}

impl ValuationStore for InMemoryValuationStore {
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

/// Comparable sales held in memory, typically loaded from a CSV export.
#[derive(Default, Clone)]
pub(crate) struct StaticComparableSource {
    sales: Arc<Vec<ComparableProperty>>,
}

impl StaticComparableSource {
    pub(crate) fn new(sales: Vec<ComparableProperty>) -> Self {
        Self {
            sales: Arc::new(sales),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sales.len()
    }
}

impl ComparableSource for StaticComparableSource {
    /// Sales of the subject's property type; those without a recorded distance are kept.
    fn candidates(
        &self,
        subject: &PropertyDetails,
        radius_km: f64,
    ) -> Result<Vec<ComparableProperty>, SourceError> {
        Ok(self
            .sales
            .iter()
            .filter(|sale| sale.details.property_type == subject.property_type)
            .filter(|sale| sale.distance_km.map_or(true, |distance| distance <= radius_km))
            .cloned()
            .collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
