use serde::{Deserialize, Serialize};

use super::adjustment::{AdjustedComparable, AdjustmentEntry};
use super::aggregate::WeightedMoments;
use super::config::ConfidenceConfig;
use super::outlier::ScreeningStatus;
use super::MINIMUM_COMPARABLES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceFactorKind {
    Dispersion,
    Similarity,
    OutlierRemoval,
    OutlierScreening,
    MissingData,
}

/// Multiplicative penalty applied to the count-driven base score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub kind: ConfidenceFactorKind,
    /// Measured input: dispersion ratio, average similarity, or share of items.
    pub observed: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    pub base: f64,
    pub factors: Vec<ConfidenceFactor>,
    pub score: u8,
}

pub struct ConfidenceScorer {
    config: ConfidenceConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        survivors: &[AdjustedComparable],
        removed_count: usize,
        screening: ScreeningStatus,
    ) -> u8 {
        self.assess(survivors, removed_count, screening).score
    }

    pub fn assess(
        &self,
        survivors: &[AdjustedComparable],
        removed_count: usize,
        screening: ScreeningStatus,
    ) -> ConfidenceAssessment {
        let config = &self.config;
        let base = self.count_base(survivors.len());

        let mut factors = Vec::with_capacity(5);

        let dispersion = WeightedMoments::from_comparables(survivors)
            .map(|moments| moments.relative_dispersion())
            .unwrap_or(0.0);
        let excess = ((dispersion - config.dispersion_tolerance)
            / (config.dispersion_ceiling - config.dispersion_tolerance))
            .clamp(0.0, 1.0);
        factors.push(ConfidenceFactor {
            kind: ConfidenceFactorKind::Dispersion,
            observed: dispersion,
            multiplier: 1.0 - config.dispersion_weight * excess,
        });

        let average_similarity = if survivors.is_empty() {
            0.0
        } else {
            survivors
                .iter()
                .map(|comparable| comparable.similarity().clamp(0.0, 100.0))
                .sum::<f64>()
                / survivors.len() as f64
        };
        factors.push(ConfidenceFactor {
            kind: ConfidenceFactorKind::Similarity,
            observed: average_similarity,
            multiplier: 1.0 - config.similarity_weight * (1.0 - average_similarity / 100.0),
        });

        let offered = survivors.len() + removed_count;
        let removed_share = if offered == 0 {
            0.0
        } else {
            removed_count as f64 / offered as f64
        };
        factors.push(ConfidenceFactor {
            kind: ConfidenceFactorKind::OutlierRemoval,
            observed: removed_share,
            multiplier: 1.0 - config.removal_weight * removed_share,
        });

        factors.push(ConfidenceFactor {
            kind: ConfidenceFactorKind::OutlierScreening,
            observed: if screening.applied() { 1.0 } else { 0.0 },
            multiplier: if screening.applied() {
                1.0
            } else {
                config.unscreened_multiplier
            },
        });

        let gap_share = comparable_gap_share(survivors);
        factors.push(ConfidenceFactor {
            kind: ConfidenceFactorKind::MissingData,
            observed: gap_share,
            multiplier: 1.0 - config.missing_data_weight * gap_share,
        });

        let raw = factors
            .iter()
            .fold(base, |score, factor| score * factor.multiplier.clamp(0.0, 1.0));
        let score = raw.clamp(0.0, 100.0).round() as u8;

        ConfidenceAssessment {
            base,
            factors,
            score,
        }
    }

    /// Rises linearly from `min_count_score` at the minimum sample to
    /// `max_count_score` at `saturation_count`, flat thereafter.
    fn count_base(&self, count: usize) -> f64 {
        let config = &self.config;
        if count < MINIMUM_COMPARABLES {
            return config.min_count_score * count as f64 / MINIMUM_COMPARABLES as f64;
        }
        if config.saturation_count <= MINIMUM_COMPARABLES {
            return config.max_count_score;
        }
        let span = (config.saturation_count - MINIMUM_COMPARABLES) as f64;
        let progress = ((count - MINIMUM_COMPARABLES) as f64 / span).min(1.0);
        config.min_count_score + (config.max_count_score - config.min_count_score) * progress
    }
}

/// Share of subject-relevant adjustment terms the comparables could not supply.
fn comparable_gap_share(survivors: &[AdjustedComparable]) -> f64 {
    let (relevant, gaps) = survivors
        .iter()
        .flat_map(AdjustedComparable::adjustments)
        .fold((0usize, 0usize), |(relevant, gaps), entry| match entry {
            AdjustmentEntry::Applied { .. } => (relevant + 1, gaps),
            entry if entry.is_comparable_gap() => (relevant + 1, gaps + 1),
            AdjustmentEntry::Skipped { .. } => (relevant, gaps),
        });

    if relevant == 0 {
        0.0
    } else {
        gaps as f64 / relevant as f64
    }
}
