use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the appraisal a valuation is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppraisalId(pub Uuid);

impl std::fmt::Display for AppraisalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Broad property category; comparables must share the subject's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Townhouse,
    Land,
    Commercial,
    Other,
}

impl PropertyType {
    pub const fn label(self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Land => "land",
            PropertyType::Commercial => "commercial",
            PropertyType::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "house" => Some(Self::House),
            "apartment" | "unit" => Some(Self::Apartment),
            "townhouse" => Some(Self::Townhouse),
            "land" | "vacant_land" => Some(Self::Land),
            "commercial" => Some(Self::Commercial),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Attributes describing the subject property (and, flattened, each comparable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    pub address: String,
    pub suburb: String,
    pub city: String,
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    /// Land size in square metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_size: Option<f64>,
    /// Floor area in square metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
}

impl PropertyDetails {
    pub fn attribute(&self, attribute: PropertyAttribute) -> Option<f64> {
        match attribute {
            PropertyAttribute::Bedrooms => self.bedrooms.map(f64::from),
            PropertyAttribute::Bathrooms => self.bathrooms,
            PropertyAttribute::LandSize => self.land_size,
            PropertyAttribute::FloorArea => self.floor_area,
            PropertyAttribute::YearBuilt => self.year_built.map(f64::from),
        }
    }
}

/// Numeric attributes compared between subject and comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyAttribute {
    Bedrooms,
    Bathrooms,
    LandSize,
    FloorArea,
    YearBuilt,
}

impl PropertyAttribute {
    pub const ALL: [PropertyAttribute; 5] = [
        PropertyAttribute::Bedrooms,
        PropertyAttribute::Bathrooms,
        PropertyAttribute::LandSize,
        PropertyAttribute::FloorArea,
        PropertyAttribute::YearBuilt,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            PropertyAttribute::Bedrooms => "bedrooms",
            PropertyAttribute::Bathrooms => "bathrooms",
            PropertyAttribute::LandSize => "land_size",
            PropertyAttribute::FloorArea => "floor_area",
            PropertyAttribute::YearBuilt => "year_built",
        }
    }
}

/// A candidate sale offered as evidence for the subject's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableProperty {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: PropertyDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    /// Caller-supplied score; the engine always recomputes it against the subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl ComparableProperty {
    /// Sale price when present and strictly positive.
    pub fn usable_sale_price(&self) -> Option<f64> {
        self.sale_price.filter(|price| price.is_finite() && *price > 0.0)
    }
}

/// Input aggregate for a single valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub appraisal_id: AppraisalId,
    pub property_details: PropertyDetails,
    pub comparable_properties: Vec<ComparableProperty>,
    /// Effective date of the appraisal; bounds `yearBuilt` and drives sale recency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_date: Option<NaiveDate>,
}

/// Value range and confidence returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    pub valuation_low: u64,
    pub valuation_high: u64,
    pub valuation_confidence: u8,
}
