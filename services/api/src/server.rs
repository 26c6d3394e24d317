use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fleetdesk::config::AppConfig;
use fleetdesk::error::AppError;
use fleetdesk::http::Responder;
use fleetdesk::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, Backoffice};
use crate::routes::with_backoffice_routes;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backoffice = Backoffice::bootstrap(config.verification())?;
    info!(
        admin_id = %backoffice.seed.bootstrap.admin.id,
        email = %backoffice.seed.bootstrap.admin.email,
        "bootstrap super admin available"
    );
    let responder = Responder::new(config.environment.exposes_internal_errors());

    let app = with_backoffice_routes(&backoffice, responder)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, bulk_limit = config.workflows.bulk_limit, "fleet back office ready");

    axum::serve(listener, app).await?;
    Ok(())
}
