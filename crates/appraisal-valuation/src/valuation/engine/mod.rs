mod adjustment;
mod aggregate;
mod config;
mod confidence;
mod outlier;
mod similarity;

pub use adjustment::{
    AdjustedComparable, AdjustmentEngine, AdjustmentEntry, AdjustmentOutcome, SkipReason,
};
pub use aggregate::{ValueRange, WeightedAggregator, WeightedMoments};
pub use config::{
    AdjustmentRates, AggregationConfig, ConfidenceConfig, InvalidParameter, OutlierConfig,
    PenaltyWeight, SimilarityConfig, ValuationConfig,
};
pub use confidence::{
    ConfidenceAssessment, ConfidenceFactor, ConfidenceFactorKind, ConfidenceScorer,
};
pub use outlier::{
    OutlierDetector, OutlierScreening, RemovalReason, RemovedComparable, ScreenedStatistics,
    ScreeningStatus,
};
pub use similarity::{
    Disqualification, SimilarityBreakdown, SimilarityFactor, SimilarityPenalty, SimilarityScorer,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::domain::{AppraisalId, ComparableProperty, ValuationRequest, ValuationResult};
use super::validation::{validate_request, InputViolation};

/// Smallest number of priced comparables a valuation may rest on.
pub const MINIMUM_COMPARABLES: usize = 3;

/// Failure modes surfaced to callers; "not enough data" is kept distinct from "bad data".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("invalid valuation input: {0}")]
    InvalidInput(#[from] InputViolation),
    #[error("insufficient comparables {stage}: {found} usable, at least {required} required")]
    InsufficientComparables {
        required: usize,
        found: usize,
        stage: ComparableStage,
    },
    /// Indicates a defect; the pipeline's preconditions should make it unreachable.
    #[error("degenerate aggregation: {0}")]
    DegenerateAggregation(String),
}

impl ValuationError {
    pub const fn kind(&self) -> &'static str {
        match self {
            ValuationError::InvalidInput(_) => "invalid_input",
            ValuationError::InsufficientComparables { .. } => "insufficient_comparables",
            ValuationError::DegenerateAggregation(_) => "degenerate_aggregation",
        }
    }
}

/// Point in the pipeline at which the comparable count was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparableStage {
    Submitted,
    AfterExclusions,
}

impl std::fmt::Display for ComparableStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparableStage::Submitted => write!(f, "in request"),
            ComparableStage::AfterExclusions => write!(f, "after excluding ineligible sales"),
        }
    }
}

/// Why a submitted comparable never reached the outlier screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingSalePrice,
    Disqualified { disqualification: Disqualification },
    ZeroSimilarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedComparable {
    pub comparable: ComparableProperty,
    pub reason: ExclusionReason,
}

/// Similarity computed for one submitted comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableSimilarity {
    pub comparable_id: Uuid,
    pub breakdown: SimilarityBreakdown,
}

/// Full audit trail of a successful valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub appraisal_id: AppraisalId,
    pub parameter_set: String,
    pub result: ValuationResult,
    pub similarities: Vec<ComparableSimilarity>,
    pub excluded: Vec<ExcludedComparable>,
    pub survivors: Vec<AdjustedComparable>,
    pub removed: Vec<RemovedComparable>,
    pub screening: ScreenedStatistics,
    pub range: ValueRange,
    pub confidence: ConfidenceAssessment,
}

/// Stateless orchestrator running the valuation pipeline.
///
/// Pure and synchronous: identical requests always yield identical reports,
/// and a shared engine can serve concurrent requests without locking.
pub struct ValuationEngine {
    config: ValuationConfig,
    similarity: SimilarityScorer,
    adjustment: AdjustmentEngine,
    outliers: OutlierDetector,
    aggregator: WeightedAggregator,
    confidence: ConfidenceScorer,
}

impl ValuationEngine {
    pub fn new(config: ValuationConfig) -> Self {
        Self {
            similarity: SimilarityScorer::new(config.similarity.clone()),
            adjustment: AdjustmentEngine::new(config.adjustment.clone()),
            outliers: OutlierDetector::new(config.outlier.clone()),
            aggregator: WeightedAggregator::new(config.aggregation.clone()),
            confidence: ConfidenceScorer::new(config.confidence.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn valuate(&self, request: &ValuationRequest) -> Result<ValuationResult, ValuationError> {
        self.appraise(request).map(|report| report.result)
    }

    pub fn appraise(&self, request: &ValuationRequest) -> Result<ValuationReport, ValuationError> {
        validate_request(request)?;

        let priced = request
            .comparable_properties
            .iter()
            .filter(|comparable| comparable.usable_sale_price().is_some())
            .count();
        if priced < MINIMUM_COMPARABLES {
            return Err(ValuationError::InsufficientComparables {
                required: MINIMUM_COMPARABLES,
                found: priced,
                stage: ComparableStage::Submitted,
            });
        }

        let subject = &request.property_details;
        let mut similarities = Vec::with_capacity(request.comparable_properties.len());
        let mut excluded = Vec::new();
        let mut adjusted = Vec::with_capacity(priced);

        for comparable in &request.comparable_properties {
            let breakdown = self
                .similarity
                .breakdown(subject, comparable, request.valuation_date);
            let score = breakdown.score;
            let disqualification = breakdown.disqualification.clone();
            similarities.push(ComparableSimilarity {
                comparable_id: comparable.id,
                breakdown,
            });

            // The audit trail carries the score computed here, not the caller's.
            let mut candidate = comparable.clone();
            candidate.similarity_score = Some(score);

            match self.adjustment.adjust(subject, candidate, score) {
                AdjustmentOutcome::Ineligible(comparable) => excluded.push(ExcludedComparable {
                    comparable,
                    reason: ExclusionReason::MissingSalePrice,
                }),
                AdjustmentOutcome::Adjusted(candidate) if score <= 0.0 => {
                    let reason = match disqualification {
                        Some(disqualification) => ExclusionReason::Disqualified { disqualification },
                        None => ExclusionReason::ZeroSimilarity,
                    };
                    excluded.push(ExcludedComparable {
                        comparable: candidate.comparable().clone(),
                        reason,
                    });
                }
                AdjustmentOutcome::Adjusted(candidate) => adjusted.push(candidate),
            }
        }

        debug!(
            appraisal_id = %request.appraisal_id,
            eligible = adjusted.len(),
            excluded = excluded.len(),
            "comparables scored and adjusted"
        );

        if adjusted.len() < MINIMUM_COMPARABLES {
            return Err(ValuationError::InsufficientComparables {
                required: MINIMUM_COMPARABLES,
                found: adjusted.len(),
                stage: ComparableStage::AfterExclusions,
            });
        }

        let OutlierScreening {
            survivors,
            removed,
            statistics,
        } = self.outliers.filter(adjusted);
        debug!(
            appraisal_id = %request.appraisal_id,
            survivors = survivors.len(),
            removed = removed.len(),
            screening = ?statistics.screening,
            "outlier screen complete"
        );

        let range = self.aggregator.aggregate(&survivors)?;
        let confidence = self
            .confidence
            .assess(&survivors, removed.len(), statistics.screening);

        let result = ValuationResult {
            valuation_low: range.low.round() as u64,
            valuation_high: range.high.round() as u64,
            valuation_confidence: confidence.score,
        };

        info!(
            appraisal_id = %request.appraisal_id,
            parameter_set = %self.config.parameter_set,
            low = result.valuation_low,
            high = result.valuation_high,
            confidence = result.valuation_confidence,
            "valuation complete"
        );

        Ok(ValuationReport {
            appraisal_id: request.appraisal_id,
            parameter_set: self.config.parameter_set.clone(),
            result,
            similarities,
            excluded,
            survivors,
            removed,
            screening: statistics,
            range,
            confidence,
        })
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new(ValuationConfig::default())
    }
}
