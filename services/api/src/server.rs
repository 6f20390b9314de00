use crate::cli::ServeArgs;
use crate::infra::{AppState, Workflows};
use crate::routes::with_workflow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pothole_tracker::config::AppConfig;
use pothole_tracker::error::AppError;
use pothole_tracker::telemetry;
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

    let workflows = Workflows::in_memory(&config.intake);
    let app = with_workflow_routes(workflows.intake, workflows.repairs)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        reward_amount = config.intake.reward_amount,
        duplicate_radius_m = config.intake.duplicate_radius_meters,
        "pothole tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
