use std::collections::HashSet;

use chrono::Datelike;
use uuid::Uuid;

use super::domain::{PropertyDetails, ValuationRequest};

/// Earliest construction year accepted for any property.
pub const EARLIEST_YEAR_BUILT: i32 = 1800;

/// Malformed request data; surfaced to the caller without retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputViolation {
    #[error("{field} is required")]
    MissingField { field: String },
    #[error("{field} is out of range (found {value})")]
    OutOfRange { field: String, value: String },
    #[error("comparable {0} appears more than once")]
    DuplicateComparable(Uuid),
}

pub(crate) fn validate_request(request: &ValuationRequest) -> Result<(), InputViolation> {
    let latest_year = request.valuation_date.map(|date| date.year());

    validate_details("propertyDetails", &request.property_details, latest_year)?;

    let mut seen = HashSet::with_capacity(request.comparable_properties.len());
    for (index, comparable) in request.comparable_properties.iter().enumerate() {
        let prefix = format!("comparableProperties[{index}]");
        if !seen.insert(comparable.id) {
            return Err(InputViolation::DuplicateComparable(comparable.id));
        }
        validate_details(&prefix, &comparable.details, latest_year)?;
        non_negative(&prefix, "salePrice", comparable.sale_price)?;
        non_negative(&prefix, "distanceKm", comparable.distance_km)?;
    }

    Ok(())
}

fn validate_details(
    prefix: &str,
    details: &PropertyDetails,
    latest_year: Option<i32>,
) -> Result<(), InputViolation> {
    for (name, value) in [
        ("address", &details.address),
        ("suburb", &details.suburb),
        ("city", &details.city),
    ] {
        if value.trim().is_empty() {
            return Err(InputViolation::MissingField {
                field: format!("{prefix}.{name}"),
            });
        }
    }

    non_negative(prefix, "bathrooms", details.bathrooms)?;
    non_negative(prefix, "landSize", details.land_size)?;
    non_negative(prefix, "floorArea", details.floor_area)?;

    if let Some(year) = details.year_built {
        let too_late = latest_year.is_some_and(|latest| year > latest);
        if year < EARLIEST_YEAR_BUILT || too_late {
            return Err(InputViolation::OutOfRange {
                field: format!("{prefix}.yearBuilt"),
                value: year.to_string(),
            });
        }
    }

    Ok(())
}

fn non_negative(prefix: &str, name: &str, value: Option<f64>) -> Result<(), InputViolation> {
    match value {
        Some(value) if !value.is_finite() || value < 0.0 => Err(InputViolation::OutOfRange {
            field: format!("{prefix}.{name}"),
            value: value.to_string(),
        }),
        _ => Ok(()),
    }
}
