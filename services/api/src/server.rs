use crate::cli::ServeArgs;
use crate::infra::{engine_gateway, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fraud_decision::config::AppConfig;
use fraud_decision::decision::DecisionService;
use fraud_decision::error::AppError;
use fraud_decision::store::SqliteConfigStore;
use fraud_decision::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let store = Arc::new(SqliteConfigStore::open(&config.store.path)?);
    let gateway = Arc::new(engine_gateway(config.engine.clone()).await?);
    let service = Arc::new(DecisionService::new(store, gateway, &config.cache));

    let app = with_service_routes(Arc::clone(&service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let warm_up = Arc::clone(&service);
    match tokio::task::spawn_blocking(move || warm_up.refresh_all()).await {
        Ok(report) if report.all_succeeded() => info!("rule configuration caches warmed"),
        Ok(report) => {
            let failed: Vec<&str> = report
                .caches
                .iter()
                .filter(|outcome| !outcome.refreshed)
                .map(|outcome| outcome.cache)
                .collect();
            warn!(?failed, "some caches failed to warm; they load on first use");
        }
        Err(err) => warn!(error = %err, "cache warm-up was interrupted"),
    }
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        engine = %config.engine.base_url,
        store = %config.store.path.display(),
        "fraud decision service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
