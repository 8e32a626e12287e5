use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::str::FromStr;
use uuid::Uuid;

use super::super::domain::{ComparableProperty, PropertyDetails, PropertyType};
use super::ComparableImportError;

#[derive(Debug, Deserialize)]
struct ComparableRow {
    id: String,
    address: String,
    #[serde(default)]
    suburb: String,
    #[serde(default)]
    city: String,
    property_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    bedrooms: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    bathrooms: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    land_size: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    floor_area: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    year_built: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    sale_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    sale_price: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    distance_km: Option<String>,
}

pub(crate) fn parse_comparables<R: Read>(
    reader: R,
) -> Result<Vec<ComparableProperty>, ComparableImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut comparables = Vec::new();

    for (index, record) in csv_reader.deserialize::<ComparableRow>().enumerate() {
        let row = record?;
        // Header occupies line 1.
        let line = index + 2;
        comparables.push(row.into_comparable(line)?);
    }

    Ok(comparables)
}

impl ComparableRow {
    fn into_comparable(self, line: usize) -> Result<ComparableProperty, ComparableImportError> {
        let invalid = |column: &'static str, value: &str| ComparableImportError::InvalidField {
            line,
            column,
            value: value.to_string(),
        };

        let id = Uuid::parse_str(&self.id).map_err(|_| invalid("id", &self.id))?;
        let property_type = PropertyType::parse(&self.property_type)
            .ok_or_else(|| invalid("property_type", &self.property_type))?;
        let sale_date = self
            .sale_date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid("sale_date", raw))
            })
            .transpose()?;

        Ok(ComparableProperty {
            id,
            details: PropertyDetails {
                address: self.address,
                suburb: self.suburb,
                city: self.city,
                property_type,
                bedrooms: parse_field(self.bedrooms.as_deref(), "bedrooms", &invalid)?,
                bathrooms: parse_field(self.bathrooms.as_deref(), "bathrooms", &invalid)?,
                land_size: parse_field(self.land_size.as_deref(), "land_size", &invalid)?,
                floor_area: parse_field(self.floor_area.as_deref(), "floor_area", &invalid)?,
                year_built: parse_field(self.year_built.as_deref(), "year_built", &invalid)?,
            },
            sale_date,
            sale_price: parse_field(self.sale_price.as_deref(), "sale_price", &invalid)?,
            similarity_score: None,
            distance_km: parse_field(self.distance_km.as_deref(), "distance_km", &invalid)?,
        })
    }
}

fn parse_field<T, F>(
    raw: Option<&str>,
    column: &'static str,
    invalid: &F,
) -> Result<Option<T>, ComparableImportError>
where
    T: FromStr,
    F: Fn(&'static str, &str) -> ComparableImportError,
{
    raw.map(|value| {
        value
            .replace(',', "")
            .trim_start_matches('$')
            .parse::<T>()
            .map_err(|_| invalid(column, value))
    })
    .transpose()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
