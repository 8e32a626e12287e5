use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryValuationStore, StaticComparableSource};
use crate::routes::with_valuation_routes;
use appraisal_valuation::config::AppConfig;
use appraisal_valuation::error::AppError;
use appraisal_valuation::telemetry;
use appraisal_valuation::valuation::{AppraisalValuationService, ComparableCsvImporter};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let source = match &config.comparables_csv {
        Some(path) => {
            let source = StaticComparableSource::new(ComparableCsvImporter::from_path(path)?);
            info!(path = %path.display(), sales = source.len(), "comparable sales loaded");
            source
        }
        None => StaticComparableSource::default(),
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        parameters: Arc::new(config.valuation.clone()),
    };

    let valuation_service = Arc::new(AppraisalValuationService::new(
        Arc::new(source),
        Arc::new(InMemoryValuationStore::default()),
        config.valuation.clone(),
    ));

    let app = with_valuation_routes(valuation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        parameter_set = %config.valuation.parameter_set,
        "appraisal valuation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
