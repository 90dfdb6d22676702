use crate::cli::ServeArgs;
use crate::infra::{load_store, AppState};
use crate::routes::with_assessment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cmmc_tracker::assessment::{AssessmentApi, AssessmentService};
use cmmc_tracker::config::AppConfig;
use cmmc_tracker::error::AppError;
use cmmc_tracker::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(load_store(config.assessment.seed_path.as_deref())?);
    let api = Arc::new(AssessmentApi {
        service: AssessmentService::new(store),
        default_session: config.assessment.default_session.clone(),
        reference_date: config.assessment.reference_date,
    });

    let app = with_assessment_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        session = %config.assessment.default_session,
        "assessment tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
