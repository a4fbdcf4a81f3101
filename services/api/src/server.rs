use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryBusinessRepository};
use crate::routes::with_offer_routes;
use approval_desk::config::AppConfig;
use approval_desk::error::AppError;
use approval_desk::offers::OfferDeskService;
use approval_desk::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryBusinessRepository::default());
    let offer_service = Arc::new(OfferDeskService::new(repository, config.offers));

    let app = with_offer_routes(offer_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        palette_size = config.offers.palette_size,
        offer_slots = config.offers.import.offer_slots,
        "approval desk ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
