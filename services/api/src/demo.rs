use crate::infra::{InMemoryValuationStore, StaticComparableSource};
use appraisal_valuation::config::load_valuation_parameters;
use appraisal_valuation::error::AppError;
use appraisal_valuation::valuation::engine::{AdjustmentEntry, RemovalReason};
use appraisal_valuation::valuation::{
    AppraisalId, AppraisalValuationService, ComparableCsvImporter, ComparableProperty,
    PropertyDetails, PropertyType, ValuationConfig, ValuationRecord, ValuationRequest,
};
use chrono::{Local, NaiveDate};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Args, Debug, Default)]
pub(crate) struct ValuateArgs {
    /// JSON valuation request (camelCase wire format)
    #[arg(long, conflicts_with_all = ["subject", "comparables"])]
    pub(crate) request: Option<PathBuf>,
    /// JSON property details of the subject; candidates come from --comparables
    #[arg(long, requires = "comparables")]
    pub(crate) subject: Option<PathBuf>,
    /// CSV export of comparable sales to search for candidates
    #[arg(long, requires = "subject")]
    pub(crate) comparables: Option<PathBuf>,
    /// Appraisal identifier used with --subject (defaults to a fresh id)
    #[arg(long)]
    pub(crate) appraisal_id: Option<Uuid>,
    /// Valuation date used with --subject (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) valuation_date: Option<NaiveDate>,
    /// JSON parameter set overriding the defaults
    #[arg(long)]
    pub(crate) parameters: Option<PathBuf>,
    /// Print the full audit trail instead of the summary view
    #[arg(long)]
    pub(crate) audit: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Valuation date for the scenario (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) valuation_date: Option<NaiveDate>,
    /// Leave out the inflated sale that the outlier screen should reject.
    #[arg(long)]
    pub(crate) skip_outlier: bool,
    /// Print the audit trail as JSON after the summary.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_valuate(args: ValuateArgs) -> Result<(), AppError> {
    let ValuateArgs {
        request,
        subject,
        comparables,
        appraisal_id,
        valuation_date,
        parameters,
        audit,
    } = args;

    let config = match parameters {
        Some(path) => load_valuation_parameters(&path)?,
        None => ValuationConfig::default(),
    };

    let record = match (request, subject, comparables) {
        (Some(path), _, _) => {
            let request: ValuationRequest = read_json(&path)?;
            service(StaticComparableSource::default(), config).valuate(request)?
        }
        (None, Some(subject), Some(comparables)) => {
            let subject: PropertyDetails = read_json(&subject)?;
            let source = StaticComparableSource::new(ComparableCsvImporter::from_path(comparables)?);
            let appraisal_id = AppraisalId(appraisal_id.unwrap_or_else(Uuid::new_v4));
            service(source, config).valuate_from_source(appraisal_id, subject, valuation_date)?
        }
        _ => {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "provide --request, or --subject together with --comparables",
            )))
        }
    };

    if audit {
        print_json(&record.report)
    } else {
        print_json(&record.view())
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        valuation_date,
        skip_outlier,
        json,
    } = args;

    let valuation_date = valuation_date.unwrap_or_else(|| Local::now().date_naive());
    let mut comparables = demo_comparables();
    if skip_outlier {
        comparables.retain(|comparable| comparable.id != INFLATED_SALE);
    }

    let request = ValuationRequest {
        appraisal_id: AppraisalId(Uuid::new_v4()),
        property_details: demo_subject(),
        comparable_properties: comparables,
        valuation_date: Some(valuation_date),
    };

    println!("Comparable-sales valuation demo");
    println!(
        "- Subject: {}, {} ({}, {} bed / {} bath, {} m²)",
        request.property_details.address,
        request.property_details.suburb,
        request.property_details.property_type.label(),
        request.property_details.bedrooms.unwrap_or_default(),
        request.property_details.bathrooms.unwrap_or_default(),
        request.property_details.floor_area.unwrap_or_default(),
    );

    let record = match service(StaticComparableSource::default(), ValuationConfig::default())
        .valuate(request)
    {
        Ok(record) => record,
        Err(err) => {
            println!("  Valuation rejected: {}", err);
            return Ok(());
        }
    };

    render_report(&record);

    if json {
        print_json(&record.report)?;
    }
    Ok(())
}

fn render_report(record: &ValuationRecord) {
    let report = &record.report;
    println!(
        "- Parameter set {} | valuated on {}",
        report.parameter_set, record.valuated_on
    );

    println!("\nComparables used");
    for comparable in &report.survivors {
        println!(
            "  - {}: sold {:.0} -> adjusted {:.0} (similarity {:.1})",
            comparable.comparable().details.address,
            comparable.sale_price(),
            comparable.adjusted_price(),
            comparable.similarity()
        );
        for entry in comparable.adjustments() {
            if let AdjustmentEntry::Applied {
                attribute,
                difference,
                delta,
                ..
            } = entry
            {
                if *delta != 0.0 {
                    println!(
                        "      {} {:+} -> {:+.0}",
                        attribute.label(),
                        difference,
                        delta
                    );
                }
            }
        }
    }

    if !report.excluded.is_empty() {
        println!("\nExcluded before screening");
        for excluded in &report.excluded {
            println!(
                "  - {}: {:?}",
                excluded.comparable.details.address, excluded.reason
            );
        }
    }

    if !report.removed.is_empty() {
        println!("\nRemoved as outliers");
        for removed in &report.removed {
            let RemovalReason::DeviatesFromMedian {
                median,
                deviation,
                threshold,
            } = removed.reason;
            println!(
                "  - {}: adjusted {:.0} deviates {:.0} from median {:.0} (threshold {:.0})",
                removed.comparable.comparable().details.address,
                removed.comparable.adjusted_price(),
                deviation,
                median,
                threshold
            );
        }
    }

    println!("\nResult");
    println!(
        "- Range {} – {} (weighted mean {:.0}, std dev {:.0})",
        report.result.valuation_low,
        report.result.valuation_high,
        report.range.moments.mean,
        report.range.moments.std_dev
    );
    println!(
        "- Confidence {} (base {:.0})",
        report.result.valuation_confidence, report.confidence.base
    );
    for factor in &report.confidence.factors {
        println!(
            "    {:?}: observed {:.3}, multiplier {:.3}",
            factor.kind, factor.observed, factor.multiplier
        );
    }
}

fn service(
    source: StaticComparableSource,
    config: ValuationConfig,
) -> AppraisalValuationService<StaticComparableSource, InMemoryValuationStore> {
    AppraisalValuationService::new(
        Arc::new(source),
        Arc::new(InMemoryValuationStore::default()),
        config,
    )
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn demo_subject() -> PropertyDetails {
    PropertyDetails {
        address: "12 Kauri Street".to_string(),
        suburb: "Ponsonby".to_string(),
        city: "Auckland".to_string(),
        property_type: PropertyType::House,
        bedrooms: Some(3),
        bathrooms: Some(2.0),
        land_size: None,
        floor_area: Some(150.0),
        year_built: None,
    }
}

const INFLATED_SALE: Uuid = Uuid::from_u128(0xD);

fn demo_comparables() -> Vec<ComparableProperty> {
    let sale = |id: u128, address: &str, price: f64, bedrooms: u32, bathrooms: f64, floor_area: f64| {
        ComparableProperty {
            id: Uuid::from_u128(id),
            details: PropertyDetails {
                address: address.to_string(),
                bedrooms: Some(bedrooms),
                bathrooms: Some(bathrooms),
                floor_area: Some(floor_area),
                ..demo_subject()
            },
            sale_date: None,
            sale_price: Some(price),
            similarity_score: None,
            distance_km: None,
        }
    };

    vec![
        sale(0xA, "4 Rata Lane", 800_000.0, 3, 2.0, 150.0),
        sale(0xB, "18 Rata Lane", 820_000.0, 3, 2.0, 155.0),
        sale(0xC, "7 Totara Road", 790_000.0, 2, 1.0, 120.0),
        sale(0xD, "31 Jervois Road", 2_500_000.0, 3, 2.0, 150.0),
    ]
}
