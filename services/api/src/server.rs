use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AppState, PredictionContext};
use crate::routes::api_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rankcast::config::AppConfig;
use rankcast::error::AppError;
use rankcast::telemetry;
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
    if let Some(model_dir) = args.model_dir.take() {
        config.models.model_dir = Some(model_dir);
    }

    telemetry::init(&config.telemetry)?;

    let catalog = load_catalog(&config.models)?;
    info!(exams = catalog.len(), "exam model catalog loaded");
    let context = PredictionContext::new(catalog);

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = api_router(context)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "rank prediction service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
