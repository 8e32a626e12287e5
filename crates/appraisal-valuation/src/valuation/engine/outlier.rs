use serde::{Deserialize, Serialize};

use super::adjustment::AdjustedComparable;
use super::config::OutlierConfig;
use super::MINIMUM_COMPARABLES;

/// Audit entry for a comparable dropped by the outlier screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedComparable {
    pub comparable: AdjustedComparable,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemovalReason {
    DeviatesFromMedian {
        median: f64,
        deviation: f64,
        threshold: f64,
    },
}

/// Whether the outlier screen was allowed to run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScreeningStatus {
    Screened,
    /// Fewer comparables than the minimum sample were offered.
    NotScreenedTooFew,
    /// Removing the flagged comparables would have breached the minimum sample.
    NotScreenedWouldBreachMinimum { flagged: usize },
}

impl ScreeningStatus {
    pub fn applied(self) -> bool {
        matches!(self, ScreeningStatus::Screened)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierScreening {
    pub survivors: Vec<AdjustedComparable>,
    pub removed: Vec<RemovedComparable>,
    pub statistics: ScreenedStatistics,
}

/// Statistics the screen was evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenedStatistics {
    pub screening: ScreeningStatus,
    pub median: Option<f64>,
    pub median_absolute_deviation: Option<f64>,
    pub threshold: Option<f64>,
}

impl ScreenedStatistics {
    fn skipped() -> Self {
        Self {
            screening: ScreeningStatus::NotScreenedTooFew,
            median: None,
            median_absolute_deviation: None,
            threshold: None,
        }
    }
}

/// Robust median/MAD filter over adjusted prices.
pub struct OutlierDetector {
    config: OutlierConfig,
}

impl OutlierDetector {
    pub fn new(config: OutlierConfig) -> Self {
        Self { config }
    }

    pub fn filter(&self, adjusted: Vec<AdjustedComparable>) -> OutlierScreening {
        let prices: Vec<f64> = adjusted.iter().map(AdjustedComparable::adjusted_price).collect();
        let (Some(median), Some(mad)) = (median(&prices), median_absolute_deviation(&prices))
        else {
            return unscreened(adjusted, ScreenedStatistics::skipped());
        };
        if adjusted.len() < MINIMUM_COMPARABLES {
            return unscreened(adjusted, ScreenedStatistics::skipped());
        }

        let threshold = (self.config.mad_multiplier * self.config.mad_scale * mad)
            .max(self.config.min_deviation_ratio * median.abs());
        let statistics = |screening| ScreenedStatistics {
            screening,
            median: Some(median),
            median_absolute_deviation: Some(mad),
            threshold: Some(threshold),
        };

        let flagged = prices
            .iter()
            .filter(|price| (*price - median).abs() > threshold)
            .count();
        if flagged > 0 && adjusted.len() - flagged < MINIMUM_COMPARABLES {
            return unscreened(
                adjusted,
                statistics(ScreeningStatus::NotScreenedWouldBreachMinimum { flagged }),
            );
        }

        let (survivors, removed): (Vec<_>, Vec<_>) = adjusted
            .into_iter()
            .partition(|comparable| (comparable.adjusted_price() - median).abs() <= threshold);

        let removed = removed
            .into_iter()
            .map(|comparable| {
                let deviation = (comparable.adjusted_price() - median).abs();
                RemovedComparable {
                    comparable,
                    reason: RemovalReason::DeviatesFromMedian {
                        median,
                        deviation,
                        threshold,
                    },
                }
            })
            .collect();

        OutlierScreening {
            survivors,
            removed,
            statistics: statistics(ScreeningStatus::Screened),
        }
    }
}

fn unscreened(adjusted: Vec<AdjustedComparable>, statistics: ScreenedStatistics) -> OutlierScreening {
    OutlierScreening {
        survivors: adjusted,
        removed: Vec::new(),
        statistics,
    }
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub(crate) fn median_absolute_deviation(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|value| (value - center).abs()).collect();
    median(&deviations)
}
