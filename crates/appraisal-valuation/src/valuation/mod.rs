//! Comparable-sales valuation: similarity scoring, itemized price adjustments,
//! robust outlier screening, similarity-weighted aggregation, and confidence
//! scoring, plus the service, storage seams, and HTTP routes around them.

pub mod domain;
pub mod engine;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AppraisalId, ComparableProperty, PropertyAttribute, PropertyDetails, PropertyType,
    ValuationRequest, ValuationResult,
};
pub use engine::{
    ComparableStage, ValuationConfig, ValuationEngine, ValuationError, ValuationReport,
    MINIMUM_COMPARABLES,
};
pub use import::{ComparableCsvImporter, ComparableImportError};
pub use repository::{
    ComparableSource, SourceError, StoreError, ValuationRecord, ValuationStore, ValuationView,
};
pub use router::{classify, valuation_router, SourceValuationRequest};
pub use service::{AppraisalValuationService, ValuationServiceError};
pub use validation::InputViolation;
