use serde::{Deserialize, Serialize};

/// Versioned parameter set driving every stage of the valuation.
///
/// Every rate and weight is a named field so an appraiser can trace each
/// dollar and each confidence point back to a documented constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Label recorded against every valuation produced with these parameters.
    pub parameter_set: String,
    pub similarity: SimilarityConfig,
    pub adjustment: AdjustmentRates,
    pub outlier: OutlierConfig,
    pub aggregation: AggregationConfig,
    pub confidence: ConfidenceConfig,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            parameter_set: "baseline-2024.1".to_string(),
            similarity: SimilarityConfig::default(),
            adjustment: AdjustmentRates::default(),
            outlier: OutlierConfig::default(),
            aggregation: AggregationConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

/// Maximum penalty a factor can take and the difference at which it saturates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeight {
    pub weight: f64,
    pub scale: f64,
}

impl PenaltyWeight {
    pub const fn new(weight: f64, scale: f64) -> Self {
        Self { weight, scale }
    }

    /// `weight * min(difference / scale, 1)`.
    pub fn penalty(&self, difference: f64) -> f64 {
        if self.scale <= 0.0 {
            return if difference > 0.0 { self.weight } else { 0.0 };
        }
        self.weight * (difference.abs() / self.scale).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Absolute difference in bedroom count; defaults to 20 points over 3 rooms.
    pub bedrooms: PenaltyWeight,
    /// Absolute difference in bathroom count; defaults to 15 points over 2 rooms.
    pub bathrooms: PenaltyWeight,
    /// Relative land size difference; defaults to 10 points at a 50% gap.
    pub land_size: PenaltyWeight,
    /// Relative floor area difference; defaults to 20 points at a 50% gap.
    pub floor_area: PenaltyWeight,
    /// Absolute difference in construction year; defaults to 10 points over 50 years.
    pub year_built: PenaltyWeight,
    /// Linear distance penalty reaching `distance_weight` at `max_radius_km`.
    pub distance_weight: f64,
    /// Comparables further away than this score zero.
    pub max_radius_km: f64,
    /// Age of the sale relative to the valuation date; defaults to 10 points over 730 days.
    pub sale_recency: PenaltyWeight,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            bedrooms: PenaltyWeight::new(20.0, 3.0),
            bathrooms: PenaltyWeight::new(15.0, 2.0),
            land_size: PenaltyWeight::new(10.0, 0.5),
            floor_area: PenaltyWeight::new(20.0, 0.5),
            year_built: PenaltyWeight::new(10.0, 50.0),
            distance_weight: 15.0,
            max_radius_km: 5.0,
            sale_recency: PenaltyWeight::new(10.0, 730.0),
        }
    }
}

/// Dollar value of one unit of difference per attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentRates {
    pub per_bedroom: f64,
    pub per_bathroom: f64,
    pub per_land_sqm: f64,
    pub per_floor_sqm: f64,
    pub per_year_built: f64,
}

impl Default for AdjustmentRates {
    fn default() -> Self {
        Self {
            per_bedroom: 15_000.0,
            per_bathroom: 10_000.0,
            per_land_sqm: 150.0,
            per_floor_sqm: 300.0,
            per_year_built: 1_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Multiple of the scaled median absolute deviation tolerated around the median.
    pub mad_multiplier: f64,
    /// Scaling applied to the raw MAD so it estimates a standard deviation.
    pub mad_scale: f64,
    /// Deviation always tolerated, as a fraction of the median.
    pub min_deviation_ratio: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            mad_multiplier: 3.0,
            mad_scale: 1.4826,
            min_deviation_ratio: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Number of weighted standard deviations either side of the mean.
    pub std_dev_multiplier: f64,
    /// Smallest half-width of the range, as a fraction of the weighted mean.
    pub min_band_ratio: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            std_dev_multiplier: 1.0,
            min_band_ratio: 0.025,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Base score with the minimum number of survivors.
    pub min_count_score: f64,
    /// Base score once `saturation_count` survivors are available.
    pub max_count_score: f64,
    pub saturation_count: usize,
    /// Coefficient of variation tolerated without penalty.
    pub dispersion_tolerance: f64,
    /// Coefficient of variation at which the full dispersion penalty applies.
    pub dispersion_ceiling: f64,
    pub dispersion_weight: f64,
    /// Penalty scaled by `1 - average_similarity / 100`.
    pub similarity_weight: f64,
    /// Penalty scaled by the share of comparables removed as outliers.
    pub removal_weight: f64,
    /// Multiplier applied when the outlier screen could not run.
    pub unscreened_multiplier: f64,
    /// Penalty scaled by the share of adjustment terms the comparables could not supply.
    pub missing_data_weight: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            min_count_score: 70.0,
            max_count_score: 100.0,
            saturation_count: 6,
            dispersion_tolerance: 0.05,
            dispersion_ceiling: 0.25,
            dispersion_weight: 0.6,
            similarity_weight: 0.5,
            removal_weight: 0.5,
            unscreened_multiplier: 0.85,
            missing_data_weight: 0.3,
        }
    }
}

/// Parameter rejected by [`ValuationConfig::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("valuation parameter `{name}` is invalid ({value})")]
pub struct InvalidParameter {
    pub name: &'static str,
    pub value: f64,
}

impl ValuationConfig {
    pub fn validate(&self) -> Result<(), InvalidParameter> {
        let similarity = &self.similarity;
        let non_negative = [
            ("similarity.bedrooms.weight", similarity.bedrooms.weight),
            ("similarity.bedrooms.scale", similarity.bedrooms.scale),
            ("similarity.bathrooms.weight", similarity.bathrooms.weight),
            ("similarity.bathrooms.scale", similarity.bathrooms.scale),
            ("similarity.land_size.weight", similarity.land_size.weight),
            ("similarity.land_size.scale", similarity.land_size.scale),
            ("similarity.floor_area.weight", similarity.floor_area.weight),
            ("similarity.floor_area.scale", similarity.floor_area.scale),
            ("similarity.year_built.weight", similarity.year_built.weight),
            ("similarity.year_built.scale", similarity.year_built.scale),
            ("similarity.distance_weight", similarity.distance_weight),
            ("similarity.sale_recency.weight", similarity.sale_recency.weight),
            ("similarity.sale_recency.scale", similarity.sale_recency.scale),
            ("adjustment.per_bedroom", self.adjustment.per_bedroom),
            ("adjustment.per_bathroom", self.adjustment.per_bathroom),
            ("adjustment.per_land_sqm", self.adjustment.per_land_sqm),
            ("adjustment.per_floor_sqm", self.adjustment.per_floor_sqm),
            ("adjustment.per_year_built", self.adjustment.per_year_built),
            ("outlier.min_deviation_ratio", self.outlier.min_deviation_ratio),
            ("aggregation.std_dev_multiplier", self.aggregation.std_dev_multiplier),
            ("confidence.min_count_score", self.confidence.min_count_score),
            ("confidence.max_count_score", self.confidence.max_count_score),
            ("confidence.dispersion_tolerance", self.confidence.dispersion_tolerance),
            ("confidence.dispersion_weight", self.confidence.dispersion_weight),
            ("confidence.similarity_weight", self.confidence.similarity_weight),
            ("confidence.removal_weight", self.confidence.removal_weight),
            ("confidence.unscreened_multiplier", self.confidence.unscreened_multiplier),
            ("confidence.missing_data_weight", self.confidence.missing_data_weight),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidParameter { name, value });
            }
        }

        let positive = [
            ("similarity.max_radius_km", similarity.max_radius_km),
            ("outlier.mad_multiplier", self.outlier.mad_multiplier),
            ("outlier.mad_scale", self.outlier.mad_scale),
            ("aggregation.min_band_ratio", self.aggregation.min_band_ratio),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(InvalidParameter { name, value });
            }
        }

        let confidence = &self.confidence;
        if confidence.dispersion_ceiling <= confidence.dispersion_tolerance
            || !confidence.dispersion_ceiling.is_finite()
        {
            return Err(InvalidParameter {
                name: "confidence.dispersion_ceiling",
                value: confidence.dispersion_ceiling,
            });
        }
        if confidence.max_count_score > 100.0 {
            return Err(InvalidParameter {
                name: "confidence.max_count_score",
                value: confidence.max_count_score,
            });
        }

        Ok(())
    }
}
