use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{ComparableProperty, PropertyAttribute, PropertyDetails, PropertyType};
use super::config::{PenaltyWeight, SimilarityConfig};

/// Factor contributing a similarity penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityFactor {
    Attribute(PropertyAttribute),
    Distance,
    SaleRecency,
}

/// Points deducted from 100 for one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPenalty {
    pub factor: SimilarityFactor,
    pub difference: f64,
    pub penalty: f64,
}

/// Reason a comparable is forced to zero similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disqualification {
    PropertyTypeMismatch {
        subject: PropertyType,
        comparable: PropertyType,
    },
    BeyondSearchRadius {
        distance_km: f64,
        max_radius_km: f64,
    },
}

/// Itemized similarity score for one comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub score: f64,
    pub penalties: Vec<SimilarityPenalty>,
    /// Factors skipped because either side lacked the value.
    pub unscored: Vec<SimilarityFactor>,
    pub disqualification: Option<Disqualification>,
}

impl SimilarityBreakdown {
    fn disqualified(reason: Disqualification) -> Self {
        Self {
            score: 0.0,
            penalties: Vec::new(),
            unscored: Vec::new(),
            disqualification: Some(reason),
        }
    }
}

/// Scores how closely a comparable resembles the subject on a 0–100 scale.
///
/// A factor missing on either side contributes neither penalty nor bonus;
/// it is listed in [`SimilarityBreakdown::unscored`] instead.
pub struct SimilarityScorer {
    config: SimilarityConfig,
}

impl SimilarityScorer {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, subject: &PropertyDetails, comparable: &ComparableProperty) -> f64 {
        self.breakdown(subject, comparable, None).score
    }

    pub fn breakdown(
        &self,
        subject: &PropertyDetails,
        comparable: &ComparableProperty,
        valuation_date: Option<NaiveDate>,
    ) -> SimilarityBreakdown {
        if subject.property_type != comparable.details.property_type {
            return SimilarityBreakdown::disqualified(Disqualification::PropertyTypeMismatch {
                subject: subject.property_type,
                comparable: comparable.details.property_type,
            });
        }

        let max_radius_km = self.config.max_radius_km;
        if let Some(distance_km) = comparable.distance_km.filter(|d| d.is_finite()) {
            if distance_km > max_radius_km {
                return SimilarityBreakdown::disqualified(Disqualification::BeyondSearchRadius {
                    distance_km,
                    max_radius_km,
                });
            }
        }

        let mut penalties = Vec::new();
        let mut unscored = Vec::new();

        for attribute in PropertyAttribute::ALL {
            let factor = SimilarityFactor::Attribute(attribute);
            match (
                subject.attribute(attribute),
                comparable.details.attribute(attribute),
            ) {
                (Some(subject_value), Some(comparable_value)) => {
                    let difference = match attribute {
                        PropertyAttribute::LandSize | PropertyAttribute::FloorArea => {
                            relative_difference(subject_value, comparable_value)
                        }
                        _ => (subject_value - comparable_value).abs(),
                    };
                    let weight = self.attribute_weight(attribute);
                    penalties.push(SimilarityPenalty {
                        factor,
                        difference,
                        penalty: weight.penalty(difference),
                    });
                }
                _ => unscored.push(factor),
            }
        }

        match comparable.distance_km.filter(|d| d.is_finite()) {
            Some(distance_km) => {
                let penalty = self.config.distance_weight * (distance_km / max_radius_km).max(0.0);
                penalties.push(SimilarityPenalty {
                    factor: SimilarityFactor::Distance,
                    difference: distance_km,
                    penalty,
                });
            }
            None => unscored.push(SimilarityFactor::Distance),
        }

        match (valuation_date, comparable.sale_date) {
            (Some(valuation_date), Some(sale_date)) => {
                let age_days = (valuation_date - sale_date).num_days().max(0) as f64;
                penalties.push(SimilarityPenalty {
                    factor: SimilarityFactor::SaleRecency,
                    difference: age_days,
                    penalty: self.config.sale_recency.penalty(age_days),
                });
            }
            _ => unscored.push(SimilarityFactor::SaleRecency),
        }

        let total_penalty: f64 = penalties.iter().map(|p| p.penalty).sum();
        let score = (100.0 - total_penalty).clamp(0.0, 100.0);

        SimilarityBreakdown {
            score,
            penalties,
            unscored,
            disqualification: None,
        }
    }

    fn attribute_weight(&self, attribute: PropertyAttribute) -> &PenaltyWeight {
        match attribute {
            PropertyAttribute::Bedrooms => &self.config.bedrooms,
            PropertyAttribute::Bathrooms => &self.config.bathrooms,
            PropertyAttribute::LandSize => &self.config.land_size,
            PropertyAttribute::FloorArea => &self.config.floor_area,
            PropertyAttribute::YearBuilt => &self.config.year_built,
        }
    }
}

fn relative_difference(a: f64, b: f64) -> f64 {
    let largest = a.abs().max(b.abs());
    if largest == 0.0 {
        0.0
    } else {
        (a - b).abs() / largest
    }
}
