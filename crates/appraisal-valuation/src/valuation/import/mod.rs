mod parser;

use super::domain::ComparableProperty;
use std::io::Read;
use std::path::Path;

/// Failure while loading comparable sales from CSV.
#[derive(Debug)]
pub enum ComparableImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidField {
        line: usize,
        column: &'static str,
        value: String,
    },
}

impl std::fmt::Display for ComparableImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparableImportError::Io(err) => write!(f, "failed to read comparables: {}", err),
            ComparableImportError::Csv(err) => write!(f, "invalid comparables CSV: {}", err),
            ComparableImportError::InvalidField {
                line,
                column,
                value,
            } => write!(f, "line {line}: invalid {column} value '{value}'"),
        }
    }
}

impl std::error::Error for ComparableImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComparableImportError::Io(err) => Some(err),
            ComparableImportError::Csv(err) => Some(err),
            ComparableImportError::InvalidField { .. } => None,
        }
    }
}

impl From<std::io::Error> for ComparableImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ComparableImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads comparable sales from CSV exports.
///
/// Expected columns: `id, address, suburb, city, property_type, bedrooms, bathrooms,
/// land_size, floor_area, year_built, sale_date, sale_price, distance_km`. Blank cells
/// become missing values.
pub struct ComparableCsvImporter;

impl ComparableCsvImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<ComparableProperty>, ComparableImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<ComparableProperty>, ComparableImportError> {
        parser::parse_comparables(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::domain::PropertyType;
    use std::io::Cursor;

    const HEADER: &str = "id,address,suburb,city,property_type,bedrooms,bathrooms,land_size,floor_area,year_built,sale_date,sale_price,distance_km\n";

    #[test]
    fn parses_rows_with_blank_cells() {
        let csv = format!(
            "{HEADER}00000000-0000-0000-0000-00000000000a,4 Rata Lane,Ponsonby,Auckland,House,3,2,,150,1998,2025-03-14,\"$812,000\",1.2\n\
             00000000-0000-0000-0000-00000000000b,9 Nikau Road,Ponsonby,Auckland,house,,,,,,,,\n"
        );

        let comparables = ComparableCsvImporter::from_reader(Cursor::new(csv)).expect("parses");
        assert_eq!(comparables.len(), 2);

        let first = &comparables[0];
        assert_eq!(first.details.property_type, PropertyType::House);
        assert_eq!(first.details.bedrooms, Some(3));
        assert_eq!(first.details.land_size, None);
        assert_eq!(first.sale_price, Some(812_000.0));
        assert_eq!(
            first.sale_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 14)
        );

        let second = &comparables[1];
        assert_eq!(second.sale_price, None);
        assert_eq!(second.distance_km, None);
        assert_eq!(second.details.bedrooms, None);
    }

    #[test]
    fn reports_line_of_invalid_value() {
        let csv = format!(
            "{HEADER}00000000-0000-0000-0000-00000000000a,4 Rata Lane,Ponsonby,Auckland,House,three,2,,150,1998,,800000,\n"
        );

        let err = ComparableCsvImporter::from_reader(Cursor::new(csv)).expect_err("invalid");
        match err {
            ComparableImportError::InvalidField { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "bedrooms");
            }
            other => panic!("expected invalid field, got {other}"),
        }
    }

    #[test]
    fn rejects_unknown_property_types() {
        let csv = format!(
            "{HEADER}00000000-0000-0000-0000-00000000000a,4 Rata Lane,Ponsonby,Auckland,castle,3,2,,150,1998,,800000,\n"
        );
        assert!(matches!(
            ComparableCsvImporter::from_reader(Cursor::new(csv)),
            Err(ComparableImportError::InvalidField {
                column: "property_type",
                ..
            })
        ));
    }
}
