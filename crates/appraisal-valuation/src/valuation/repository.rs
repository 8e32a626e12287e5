use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{AppraisalId, ComparableProperty, PropertyDetails, ValuationResult};
use super::engine::ValuationReport;

/// Stored outcome of a valuation run, including its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub report: ValuationReport,
    pub valuated_on: NaiveDate,
}

impl ValuationRecord {
    pub fn appraisal_id(&self) -> AppraisalId {
        self.report.appraisal_id
    }

    pub fn result(&self) -> ValuationResult {
        self.report.result
    }

    pub fn view(&self) -> ValuationView {
        let result = self.report.result;
        ValuationView {
            appraisal_id: self.report.appraisal_id,
            valuation_low: result.valuation_low,
            valuation_high: result.valuation_high,
            valuation_confidence: result.valuation_confidence,
            parameter_set: self.report.parameter_set.clone(),
            valuated_on: self.valuated_on,
            comparables_used: self.report.survivors.len(),
        }
    }
}

/// Public representation of a stored valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationView {
    pub appraisal_id: AppraisalId,
    pub valuation_low: u64,
    pub valuation_high: u64,
    pub valuation_confidence: u8,
    pub parameter_set: String,
    pub valuated_on: NaiveDate,
    pub comparables_used: usize,
}

/// Provider of candidate comparable sales near a subject property.
pub trait ComparableSource: Send + Sync {
    fn candidates(
        &self,
        subject: &PropertyDetails,
        radius_km: f64,
    ) -> Result<Vec<ComparableProperty>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("comparable source unavailable: {0}")]
    Unavailable(String),
}

/// Persistence of valuation results against their appraisal.
pub trait ValuationStore: Send + Sync {
    /// Stores the record, replacing any earlier valuation of the same appraisal.
    fn save(&self, record: ValuationRecord) -> Result<(), StoreError>;
    fn fetch(&self, id: &AppraisalId) -> Result<Option<ValuationRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("valuation store unavailable: {0}")]
    Unavailable(String),
}
