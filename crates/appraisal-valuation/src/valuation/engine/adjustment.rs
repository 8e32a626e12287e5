use serde::{Deserialize, Serialize};

use super::super::domain::{ComparableProperty, PropertyAttribute, PropertyDetails};
use super::config::AdjustmentRates;

/// Why an adjustment term could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SubjectMissing,
    ComparableMissing,
    BothMissing,
}

/// One line of the itemized adjustment trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentEntry {
    Applied {
        attribute: PropertyAttribute,
        /// Subject value minus comparable value.
        difference: f64,
        rate: f64,
        delta: f64,
    },
    Skipped {
        attribute: PropertyAttribute,
        reason: SkipReason,
    },
}

impl AdjustmentEntry {
    pub fn attribute(&self) -> PropertyAttribute {
        match self {
            AdjustmentEntry::Applied { attribute, .. } | AdjustmentEntry::Skipped { attribute, .. } => {
                *attribute
            }
        }
    }

    pub fn delta(&self) -> f64 {
        match self {
            AdjustmentEntry::Applied { delta, .. } => *delta,
            AdjustmentEntry::Skipped { .. } => 0.0,
        }
    }

    /// True when the subject carries the attribute but the comparable does not.
    pub fn is_comparable_gap(&self) -> bool {
        matches!(
            self,
            AdjustmentEntry::Skipped {
                reason: SkipReason::ComparableMissing,
                ..
            }
        )
    }
}

/// A priced comparable with its sale price adjusted toward the subject.
///
/// Built only by [`AdjustmentEngine`]; the fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedComparable {
    comparable: ComparableProperty,
    similarity: f64,
    sale_price: f64,
    adjusted_price: f64,
    adjustments: Vec<AdjustmentEntry>,
}

impl AdjustedComparable {
    pub fn comparable(&self) -> &ComparableProperty {
        &self.comparable
    }

    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    pub fn sale_price(&self) -> f64 {
        self.sale_price
    }

    pub fn adjusted_price(&self) -> f64 {
        self.adjusted_price
    }

    pub fn adjustments(&self) -> &[AdjustmentEntry] {
        &self.adjustments
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: u128, similarity: f64, adjusted_price: f64) -> Self {
        use super::super::domain::PropertyType;

        Self {
            comparable: ComparableProperty {
                id: uuid::Uuid::from_u128(id),
                details: PropertyDetails {
                    address: format!("{id} Test Road"),
                    suburb: "Testville".to_string(),
                    city: "Testopolis".to_string(),
                    property_type: PropertyType::House,
                    bedrooms: None,
                    bathrooms: None,
                    land_size: None,
                    floor_area: None,
                    year_built: None,
                },
                sale_date: None,
                sale_price: Some(adjusted_price),
                similarity_score: Some(similarity),
                distance_km: None,
            },
            similarity,
            sale_price: adjusted_price,
            adjusted_price,
            adjustments: Vec::new(),
        }
    }
}

/// Result of attempting to adjust a comparable.
#[derive(Debug, Clone, PartialEq)]
pub enum AdjustmentOutcome {
    Adjusted(AdjustedComparable),
    /// No usable sale price; the comparable is returned untouched.
    Ineligible(ComparableProperty),
}

/// Converts attribute differences into dollar adjustments at fixed per-unit rates.
pub struct AdjustmentEngine {
    rates: AdjustmentRates,
}

impl AdjustmentEngine {
    pub fn new(rates: AdjustmentRates) -> Self {
        Self { rates }
    }

    pub fn adjust(
        &self,
        subject: &PropertyDetails,
        comparable: ComparableProperty,
        similarity: f64,
    ) -> AdjustmentOutcome {
        let Some(sale_price) = comparable.usable_sale_price() else {
            return AdjustmentOutcome::Ineligible(comparable);
        };

        let adjustments: Vec<AdjustmentEntry> = PropertyAttribute::ALL
            .into_iter()
            .map(|attribute| self.entry(attribute, subject, &comparable.details))
            .collect();
        let adjusted_price = sale_price + adjustments.iter().map(AdjustmentEntry::delta).sum::<f64>();

        AdjustmentOutcome::Adjusted(AdjustedComparable {
            comparable,
            similarity,
            sale_price,
            adjusted_price,
            adjustments,
        })
    }

    pub fn rate(&self, attribute: PropertyAttribute) -> f64 {
        match attribute {
            PropertyAttribute::Bedrooms => self.rates.per_bedroom,
            PropertyAttribute::Bathrooms => self.rates.per_bathroom,
            PropertyAttribute::LandSize => self.rates.per_land_sqm,
            PropertyAttribute::FloorArea => self.rates.per_floor_sqm,
            PropertyAttribute::YearBuilt => self.rates.per_year_built,
        }
    }

    fn entry(
        &self,
        attribute: PropertyAttribute,
        subject: &PropertyDetails,
        comparable: &PropertyDetails,
    ) -> AdjustmentEntry {
        match (subject.attribute(attribute), comparable.attribute(attribute)) {
            (Some(subject_value), Some(comparable_value)) => {
                let difference = subject_value - comparable_value;
                let rate = self.rate(attribute);
                AdjustmentEntry::Applied {
                    attribute,
                    difference,
                    rate,
                    delta: difference * rate,
                }
            }
            (Some(_), None) => AdjustmentEntry::Skipped {
                attribute,
                reason: SkipReason::ComparableMissing,
            },
            (None, Some(_)) => AdjustmentEntry::Skipped {
                attribute,
                reason: SkipReason::SubjectMissing,
            },
            (None, None) => AdjustmentEntry::Skipped {
                attribute,
                reason: SkipReason::BothMissing,
            },
        }
    }
}
