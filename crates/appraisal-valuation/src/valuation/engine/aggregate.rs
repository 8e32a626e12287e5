use serde::{Deserialize, Serialize};

use super::adjustment::AdjustedComparable;
use super::config::AggregationConfig;
use super::outlier::median;
use super::ValuationError;

/// Similarity-weighted mean and spread of adjusted prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedMoments {
    pub mean: f64,
    pub std_dev: f64,
    pub total_weight: f64,
}

impl WeightedMoments {
    /// Weights are similarity scores renormalised to sum to one; zero-similarity
    /// comparables carry no weight. Returns `None` when no weight remains.
    pub fn from_comparables(comparables: &[AdjustedComparable]) -> Option<Self> {
        let weights: Vec<f64> = comparables.iter().map(weight_of).collect();
        let total_weight: f64 = weights.iter().sum();
        if !(total_weight.is_finite() && total_weight > 0.0) {
            return None;
        }

        let mean = comparables
            .iter()
            .zip(&weights)
            .map(|(comparable, weight)| comparable.adjusted_price() * weight)
            .sum::<f64>()
            / total_weight;
        let variance = comparables
            .iter()
            .zip(&weights)
            .map(|(comparable, weight)| {
                let delta = comparable.adjusted_price() - mean;
                delta * delta * weight
            })
            .sum::<f64>()
            / total_weight;

        if !(mean.is_finite() && variance.is_finite()) {
            return None;
        }

        Some(Self {
            mean,
            std_dev: variance.max(0.0).sqrt(),
            total_weight,
        })
    }

    /// Coefficient of variation; zero when the mean is not positive.
    pub fn relative_dispersion(&self) -> f64 {
        if self.mean > 0.0 {
            self.std_dev / self.mean
        } else {
            0.0
        }
    }
}

fn weight_of(comparable: &AdjustedComparable) -> f64 {
    let similarity = comparable.similarity();
    if similarity.is_finite() {
        similarity.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Low/high bounds produced from the weighted moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub moments: WeightedMoments,
    pub low: f64,
    pub high: f64,
    /// Set when the spread was narrower than the minimum band and got widened.
    pub band_widened: bool,
    /// Set when the band collapsed at zero and `high` was re-anchored on the
    /// median sale price.
    pub floored_at_zero: bool,
}

pub struct WeightedAggregator {
    config: AggregationConfig,
}

impl WeightedAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn aggregate(&self, survivors: &[AdjustedComparable]) -> Result<ValueRange, ValuationError> {
        if survivors.is_empty() {
            return Err(ValuationError::DegenerateAggregation(
                "no comparables reached aggregation".to_string(),
            ));
        }
        let moments = WeightedMoments::from_comparables(survivors).ok_or_else(|| {
            ValuationError::DegenerateAggregation("similarity weights sum to zero".to_string())
        })?;

        let spread = self.config.std_dev_multiplier * moments.std_dev;
        let min_band = self.config.min_band_ratio * moments.mean.abs();
        let band_widened = spread < min_band;
        let half_width = spread.max(min_band);

        let low = (moments.mean - half_width).max(0.0);
        let mut high = (moments.mean + half_width).max(low);

        // Adjustments can drive every price to or below zero; the band must
        // still have width.
        let floored_at_zero = high <= low;
        if floored_at_zero {
            let sale_prices: Vec<f64> = survivors
                .iter()
                .map(AdjustedComparable::sale_price)
                .collect();
            let anchor = median(&sale_prices)
                .unwrap_or(0.0)
                .max(moments.mean.abs());
            high = low + self.config.min_band_ratio * anchor;
            if high <= low {
                return Err(ValuationError::DegenerateAggregation(
                    "value band collapsed to a single point".to_string(),
                ));
            }
        }

        Ok(ValueRange {
            moments,
            low,
            high,
            band_widened,
            floored_at_zero,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> WeightedAggregator {
        WeightedAggregator::new(AggregationConfig::default())
    }

    #[test]
    fn weights_follow_similarity() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 100.0, 800_000.0),
            AdjustedComparable::for_tests(2, 50.0, 900_000.0),
        ];
        let moments = WeightedMoments::from_comparables(&survivors).expect("weights present");
        let expected = (800_000.0 * 100.0 + 900_000.0 * 50.0) / 150.0;
        assert!((moments.mean - expected).abs() < 1e-6);
    }

    #[test]
    fn zero_similarity_contributes_nothing() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 80.0, 600_000.0),
            AdjustedComparable::for_tests(2, 80.0, 600_000.0),
            AdjustedComparable::for_tests(3, 0.0, 9_000_000.0),
        ];
        let range = aggregator().aggregate(&survivors).expect("aggregates");
        assert_eq!(range.moments.mean, 600_000.0);
        assert_eq!(range.moments.std_dev, 0.0);
    }

    #[test]
    fn zero_spread_is_widened_to_minimum_band() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 90.0, 500_000.0),
            AdjustedComparable::for_tests(2, 70.0, 500_000.0),
            AdjustedComparable::for_tests(3, 60.0, 500_000.0),
        ];
        let range = aggregator().aggregate(&survivors).expect("aggregates");
        assert!(range.band_widened);
        assert_eq!(range.low, 487_500.0);
        assert_eq!(range.high, 512_500.0);
        assert!(range.high > range.low);
    }

    #[test]
    fn wide_spread_uses_standard_deviation() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 100.0, 400_000.0),
            AdjustedComparable::for_tests(2, 100.0, 600_000.0),
        ];
        let range = aggregator().aggregate(&survivors).expect("aggregates");
        assert!(!range.band_widened);
        assert!((range.moments.std_dev - 100_000.0).abs() < 1e-6);
        assert!((range.low - 400_000.0).abs() < 1e-6);
        assert!((range.high - 600_000.0).abs() < 1e-6);
    }

    #[test]
    fn bounds_are_clamped_at_zero() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 100.0, 10_000.0),
            AdjustedComparable::for_tests(2, 100.0, 190_000.0),
            AdjustedComparable::for_tests(3, 10.0, -50_000.0),
        ];
        let range = aggregator().aggregate(&survivors).expect("aggregates");
        assert_eq!(range.low, 0.0);
        assert!(range.high >= range.low);
    }

    #[test]
    fn negative_adjusted_prices_still_yield_a_band() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 60.0, -50_000.0),
            AdjustedComparable::for_tests(2, 60.0, -49_000.0),
            AdjustedComparable::for_tests(3, 60.0, -48_000.0),
        ];
        let range = aggregator().aggregate(&survivors).expect("aggregates");
        assert!(range.floored_at_zero);
        assert_eq!(range.low, 0.0);
        assert!(range.high > range.low);
    }

    #[test]
    fn all_zero_weights_are_degenerate() {
        let survivors = vec![
            AdjustedComparable::for_tests(1, 0.0, 500_000.0),
            AdjustedComparable::for_tests(2, 0.0, 510_000.0),
        ];
        let err = aggregator().aggregate(&survivors).expect_err("degenerate");
        assert!(matches!(err, ValuationError::DegenerateAggregation(_)));
        assert!(matches!(
            aggregator().aggregate(&[]),
            Err(ValuationError::DegenerateAggregation(_))
        ));
    }

    #[test]
    fn raising_similarity_never_reduces_influence() {
        let base = |similarity: f64| {
            let survivors = vec![
                AdjustedComparable::for_tests(1, 80.0, 700_000.0),
                AdjustedComparable::for_tests(2, 80.0, 720_000.0),
                AdjustedComparable::for_tests(3, similarity, 900_000.0),
            ];
            WeightedMoments::from_comparables(&survivors)
                .expect("weights present")
                .mean
        };

        let mut previous = base(0.0);
        for similarity in [10.0, 25.0, 50.0, 75.0, 100.0] {
            let mean = base(similarity);
            assert!(mean >= previous);
            previous = mean;
        }
    }
}
