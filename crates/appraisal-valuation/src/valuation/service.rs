use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use super::domain::{AppraisalId, PropertyDetails, ValuationRequest};
use super::engine::{ValuationConfig, ValuationEngine, ValuationError};
use super::repository::{
    ComparableSource, SourceError, StoreError, ValuationRecord, ValuationStore,
};

/// Service composing the valuation engine with its comparable source and store.
pub struct AppraisalValuationService<S, R> {
    engine: Arc<ValuationEngine>,
    source: Arc<S>,
    store: Arc<R>,
}

impl<S, R> AppraisalValuationService<S, R>
where
    S: ComparableSource + 'static,
    R: ValuationStore + 'static,
{
    pub fn new(source: Arc<S>, store: Arc<R>, config: ValuationConfig) -> Self {
        Self {
            engine: Arc::new(ValuationEngine::new(config)),
            source,
            store,
        }
    }

    pub fn engine(&self) -> &ValuationEngine {
        &self.engine
    }

    /// Valuate a caller-assembled request and persist the outcome.
    ///
    /// Requests without a valuation date are stamped with today's date before
    /// entering the engine.
    pub fn valuate(
        &self,
        mut request: ValuationRequest,
    ) -> Result<ValuationRecord, ValuationServiceError> {
        let valuated_on = *request
            .valuation_date
            .get_or_insert_with(|| Local::now().date_naive());

        let report = match self.engine.appraise(&request) {
            Ok(report) => report,
            Err(err) => {
                warn!(
                    appraisal_id = %request.appraisal_id,
                    kind = err.kind(),
                    error = %err,
                    "valuation rejected"
                );
                return Err(err.into());
            }
        };

        let record = ValuationRecord {
            report,
            valuated_on,
        };
        self.store.save(record.clone())?;
        Ok(record)
    }

    /// Pull candidates for the subject from the comparable source, then valuate them.
    pub fn valuate_from_source(
        &self,
        appraisal_id: AppraisalId,
        subject: PropertyDetails,
        valuation_date: Option<NaiveDate>,
    ) -> Result<ValuationRecord, ValuationServiceError> {
        let radius_km = self.engine.config().similarity.max_radius_km;
        let comparable_properties = self.source.candidates(&subject, radius_km)?;
        debug!(
            %appraisal_id,
            candidates = comparable_properties.len(),
            radius_km,
            "comparable candidates retrieved"
        );

        self.valuate(ValuationRequest {
            appraisal_id,
            property_details: subject,
            comparable_properties,
            valuation_date,
        })
    }

    /// Fetch the latest stored valuation for an appraisal.
    pub fn get(&self, appraisal_id: &AppraisalId) -> Result<ValuationRecord, ValuationServiceError> {
        let record = self
            .store
            .fetch(appraisal_id)?
            .ok_or(StoreError::NotFound)?;
        Ok(record)
    }
}

/// Error raised by the valuation service.
#[derive(Debug, thiserror::Error)]
pub enum ValuationServiceError {
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
