use fraud_decision::config::EngineConfig;
use fraud_decision::decision::naming::ALL_MODELS;
use fraud_decision::decision::DecisionService;
use fraud_decision::error::AppError;
use fraud_decision::gateway::KogitoGateway;
use fraud_decision::store::SqliteConfigStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type FraudService = DecisionService<SqliteConfigStore, KogitoGateway>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The blocking HTTP client owns its own runtime, so it is built off the async executor.
pub(crate) async fn engine_gateway(config: EngineConfig) -> Result<KogitoGateway, AppError> {
    let built = tokio::task::spawn_blocking(move || KogitoGateway::new(&config, ALL_MODELS))
        .await
        .map_err(|err| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
    Ok(built?)
}
