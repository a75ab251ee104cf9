use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use super::error::DecisionError;
use super::inputs::Payload;
use super::naming::{MYPRIME_MODEL, MYPRIME_SIMPLE_MODEL};
use super::service::DecisionService;
use crate::gateway::{DecisionGateway, ModelRef};
use crate::store::{ConfigStore, ThresholdSet};

type SharedService<S, G> = Arc<DecisionService<S, G>>;

#[derive(Debug, Deserialize)]
pub(crate) struct DebugParams {
    #[serde(default)]
    debug: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountryParams {
    name: Option<String>,
}

/// Decision, health, admin and debug endpoints over one [`DecisionService`].
pub fn decision_router<S, G>(service: SharedService<S, G>) -> Router
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    Router::new()
        .route("/fraud/card/decision", post(card_handler::<S, G>))
        .route("/myprime/decision", post(myprime_handler::<S, G>))
        .route("/myprime-simple/decision", post(myprime_simple_handler::<S, G>))
        .route("/fraud/myprime/decision", post(orchestrated_handler::<S, G>))
        .route("/fraud/decision", post(staged_handler::<S, G>))
        .route("/myprime/health", get(myprime_health_handler::<S, G>))
        .route("/myprime/verify-all-rules", get(verify_rules_handler::<S, G>))
        .route("/myprime/run-all-tests", get(smoke_tests_handler::<S, G>))
        .route(
            "/myprime/thresholds/reload",
            post(reload_myprime_thresholds_handler::<S, G>),
        )
        .route("/myprime/risk-rules", get(risk_rules_handler::<S, G>))
        .route("/myprime/cache-stats", get(myprime_cache_stats_handler::<S, G>))
        .route("/myprime-simple/test", get(myprime_simple_test_handler::<S, G>))
        .route(
            "/myprime-simple/health",
            get(myprime_simple_health_handler::<S, G>),
        )
        .route("/admin/fraud/refresh-cache", post(refresh_handler::<S, G>))
        .route("/admin/fraud/cache-status", get(cache_status_handler::<S, G>))
        .route(
            "/fraud/debug/thresholds/:set",
            get(thresholds_handler::<S, G>),
        )
        .route(
            "/fraud/debug/threshold/:set/:key",
            get(threshold_handler::<S, G>),
        )
        .route("/fraud/debug/country", get(country_handler::<S, G>))
        .with_state(service)
}

/// Runs a blocking service call on the blocking pool and renders its outcome.
async fn run_blocking<S, G, T, F>(service: SharedService<S, G>, call: F) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
    T: Serialize + Send + 'static,
    F: FnOnce(&DecisionService<S, G>) -> Result<T, DecisionError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || call(service.as_ref())).await {
        Ok(Ok(body)) => (StatusCode::OK, Json(body)).into_response(),
        Ok(Err(err)) => {
            warn!(kind = err.kind(), error = %err, "decision request failed");
            err.into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, "decision task aborted");
            let payload = json!({
                "error": "INTERNAL_ERROR",
                "message": "request processing was interrupted",
                "timestamp": Utc::now().to_rfc3339(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn card_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Query(params): Query<DebugParams>,
    Json(payload): Json<Payload>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, move |svc| svc.decide_card(&payload, params.debug)).await
}

pub(crate) async fn myprime_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Query(params): Query<DebugParams>,
    Json(payload): Json<Payload>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, move |svc| svc.decide_myprime(&payload, params.debug)).await
}

pub(crate) async fn myprime_simple_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Query(params): Query<DebugParams>,
    Json(payload): Json<Payload>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, move |svc| {
        svc.decide_myprime_simple(&payload, params.debug)
    })
    .await
}

pub(crate) async fn orchestrated_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Query(params): Query<DebugParams>,
    Json(payload): Json<Payload>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, move |svc| {
        svc.orchestrate_myprime(&payload, params.debug)
    })
    .await
}

pub(crate) async fn staged_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Json(payload): Json<Payload>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, move |svc| svc.decide_staged(&payload)).await
}

fn health_response<S, G>(service: &DecisionService<S, G>, model: ModelRef) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    let health = service.model_health(model);
    let status = if health.registered {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health)).into_response()
}

pub(crate) async fn myprime_health_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    health_response(&service, MYPRIME_MODEL)
}

pub(crate) async fn myprime_simple_health_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    health_response(&service, MYPRIME_SIMPLE_MODEL)
}

pub(crate) async fn verify_rules_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, |svc| svc.verify_myprime_rules()).await
}

pub(crate) async fn smoke_tests_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, |svc| Ok(svc.run_myprime_smoke_tests())).await
}

pub(crate) async fn myprime_simple_test_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Query(params): Query<DebugParams>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, move |svc| svc.myprime_simple_self_test(params.debug)).await
}

pub(crate) async fn reload_myprime_thresholds_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, |svc| svc.reload_thresholds(ThresholdSet::MyPrime)).await
}

pub(crate) async fn risk_rules_handler<S, G>(State(service): State<SharedService<S, G>>) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    run_blocking(service, |svc| {
        let view = svc.risk_rules();
        Ok(json!({
            "count": view.rules.len(),
            "source": view.source,
            "refreshed_at": view.refreshed_at,
            "rules": view.rules,
        }))
    })
    .await
}

pub(crate) async fn myprime_cache_stats_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    (StatusCode::OK, Json(service.myprime_cache_stats())).into_response()
}

pub(crate) async fn refresh_handler<S, G>(State(service): State<SharedService<S, G>>) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    match tokio::task::spawn_blocking(move || service.refresh_all()).await {
        Ok(report) => {
            let status = if report.all_succeeded() {
                StatusCode::OK
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(report)).into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, "cache refresh task aborted");
            let payload = json!({ "error": "cache refresh was interrupted" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn cache_status_handler<S, G>(
    State(service): State<SharedService<S, G>>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    let payload = json!({ "caches": service.cache_status() });
    (StatusCode::OK, Json(payload)).into_response()
}

fn unknown_set(set: &str) -> Response {
    let payload = json!({
        "error": "UNKNOWN_THRESHOLD_SET",
        "message": format!("unknown threshold set `{set}`"),
        "known": ThresholdSet::ALL.iter().map(ThresholdSet::as_str).collect::<Vec<_>>(),
    });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

pub(crate) async fn thresholds_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Path(set): Path<String>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    let Some(parsed) = ThresholdSet::parse(&set) else {
        return unknown_set(&set);
    };
    run_blocking(service, move |svc| {
        svc.thresholds(parsed).map(|thresholds| {
            json!({
                "set": parsed.as_str(),
                "count": thresholds.len(),
                "thresholds": thresholds,
            })
        })
    })
    .await
}

pub(crate) async fn threshold_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Path((set, key)): Path<(String, String)>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    let Some(parsed) = ThresholdSet::parse(&set) else {
        return unknown_set(&set);
    };
    run_blocking(service, move |svc| svc.threshold(parsed, key.trim())).await
}

pub(crate) async fn country_handler<S, G>(
    State(service): State<SharedService<S, G>>,
    Query(params): Query<CountryParams>,
) -> Response
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    let Some(name) = params.name.filter(|name| !name.trim().is_empty()) else {
        let payload = json!({ "error": "query parameter `name` is required" });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    };
    run_blocking(service, move |svc| svc.resolve_country(&name)).await
}
