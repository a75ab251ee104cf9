use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::cache::ManualClock;
use crate::config::CacheConfig;
use crate::decision::inputs::Payload;
use crate::decision::naming::{
    CARD_MODEL, FRAUD_ACTION_MODEL, FRAUD_CATEGORY_MODEL, MYPRIME_MODEL,
    MYPRIME_ORCHESTRATED_MODEL, MYPRIME_SIMPLE_MODEL, RISK_SCORE_MODEL, RISK_SIGNALS_MODEL,
};
use crate::decision::{decision_router, DecisionService};
use crate::gateway::{DecisionContext, ModelRef, ModelRegistry};
use crate::store::{
    CategoryListEntry, ConfigStore, CountryRiskEntry, RiskMatrixEntry, RiskRuleEntry,
    RuleParameterEntry, StoreError, ThresholdEntry, ThresholdSet,
};

pub(super) type TestService = DecisionService<MemoryConfigStore, ModelRegistry>;

/// In-memory store with a failure switch and a count of queries served.
#[derive(Default)]
pub(super) struct MemoryConfigStore {
    pub(super) thresholds: Mutex<Vec<(ThresholdSet, ThresholdEntry)>>,
    pub(super) categories: Vec<String>,
    pub(super) matrix: Vec<RiskMatrixEntry>,
    pub(super) countries: Vec<CountryRiskEntry>,
    pub(super) rules: Vec<RuleParameterEntry>,
    pub(super) risk_rules: Vec<RiskRuleEntry>,
    pub(super) failing: AtomicBool,
    pub(super) loads: AtomicUsize,
}

impl MemoryConfigStore {
    pub(super) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(super) fn set_threshold(&self, set: ThresholdSet, key: &str, value: f64) {
        let mut thresholds = self.thresholds.lock().expect("thresholds lock");
        thresholds.retain(|(s, entry)| !(*s == set && entry.key == key));
        thresholds.push((
            set,
            ThresholdEntry {
                key: key.to_string(),
                value,
            },
        ));
    }

    fn guard(&self) -> Result<(), StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("SELECT failed: connection reset".into()))
        } else {
            Ok(())
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn active_thresholds(
        &self,
        set: ThresholdSet,
        _as_of: DateTime<Utc>,
    ) -> Result<Vec<ThresholdEntry>, StoreError> {
        self.guard()?;
        let thresholds = self.thresholds.lock().expect("thresholds lock");
        Ok(thresholds
            .iter()
            .filter(|(s, _)| *s == set)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn active_category_codes(&self) -> Result<Vec<CategoryListEntry>, StoreError> {
        self.guard()?;
        Ok(self
            .categories
            .iter()
            .map(|code| CategoryListEntry { code: code.clone() })
            .collect())
    }

    fn active_risk_matrix(
        &self,
        dimension_a: Option<&str>,
    ) -> Result<Vec<RiskMatrixEntry>, StoreError> {
        self.guard()?;
        Ok(self
            .matrix
            .iter()
            .filter(|entry| dimension_a.map_or(true, |a| entry.dimension_a == a))
            .cloned()
            .collect())
    }

    fn active_country_risks(&self) -> Result<Vec<CountryRiskEntry>, StoreError> {
        self.guard()?;
        Ok(self.countries.clone())
    }

    fn lookup_country_risk(&self, identifier: &str) -> Result<Option<String>, StoreError> {
        self.guard()?;
        let needle = identifier.to_uppercase();
        let matches = |value: &Option<String>| {
            value
                .as_deref()
                .is_some_and(|candidate| candidate.to_uppercase() == needle)
        };
        let exact = self
            .countries
            .iter()
            .find(|entry| matches(&entry.country_name) || matches(&entry.country_code));
        let partial = || {
            self.countries.iter().find(|entry| {
                entry
                    .country_name
                    .as_deref()
                    .is_some_and(|name| name.to_uppercase().contains(&needle))
            })
        };
        Ok(exact.or_else(partial).map(|entry| entry.risk_label.clone()))
    }

    fn active_rule_parameters(&self) -> Result<Vec<RuleParameterEntry>, StoreError> {
        self.guard()?;
        Ok(self.rules.clone())
    }

    fn active_risk_rules(&self) -> Result<Vec<RiskRuleEntry>, StoreError> {
        self.guard()?;
        Ok(self.risk_rules.clone())
    }
}

pub(super) fn seeded_store() -> MemoryConfigStore {
    let store = MemoryConfigStore {
        categories: vec!["7995".into(), "4829".into()],
        matrix: vec![RiskMatrixEntry {
            dimension_a: "GOLD".into(),
            dimension_b: "7995".into(),
            risk_label: "HIGH".into(),
        }],
        countries: vec![
            CountryRiskEntry {
                country_name: Some("NORTH KOREA".into()),
                country_code: Some("KP".into()),
                risk_label: "BLOCKED".into(),
            },
            CountryRiskEntry {
                country_name: Some("UNITED STATES".into()),
                country_code: Some("US".into()),
                risk_label: "HIGH_RISK".into(),
            },
        ],
        rules: vec![
            RuleParameterEntry {
                rule_code: "GLOBAL".into(),
                points: None,
                threshold1: Some(60.0),
                threshold2: Some(30.0),
                multiplier1: Some(0.8),
                multiplier2: Some(0.5),
            },
            RuleParameterEntry {
                rule_code: "ODD_HOURS_LOGIN".into(),
                points: Some(15),
                threshold1: Some(6.0),
                threshold2: None,
                multiplier1: None,
                multiplier2: None,
            },
        ],
        risk_rules: vec![
            RiskRuleEntry {
                rule_id: "RULE_29".into(),
                rule_name: "ACCOUNT_TAKEOVER_PATTERN".into(),
                rule_description: Some("Failed login + new device + large transaction".into()),
                risk_score: 55.0,
                severity: "FRAUD".into(),
            },
            RiskRuleEntry {
                rule_id: "RULE_2".into(),
                rule_name: "NEW_DEVICE_LOGIN".into(),
                rule_description: None,
                risk_score: 10.0,
                severity: "SUSPICIOUS".into(),
            },
        ],
        ..MemoryConfigStore::default()
    };
    store.set_threshold(ThresholdSet::Card, "VELOCITY_5_COUNT", 4.0);
    store.set_threshold(ThresholdSet::MyPrime, "ML_FRAUD_THRESHOLD", 0.8);
    store
}

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap()
}

pub(super) fn cache_config() -> CacheConfig {
    CacheConfig {
        ttl: Duration::from_secs(300),
    }
}

pub(super) fn payload(value: Value) -> Payload {
    value.as_object().cloned().expect("object payload")
}

fn number(context: &DecisionContext, key: &str) -> f64 {
    context.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Mimics a DMN runtime: inputs are echoed and the decision sits under `key`.
fn respond(context: &DecisionContext, key: &str, decision: Value) -> DecisionContext {
    let mut output = context.clone();
    output.insert(key.to_string(), decision);
    output
}

fn card_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let country = context.get("COUNTRY_RISK").and_then(Value::as_str).unwrap_or("NORMAL");
    let (decision, reason) = if country == "BLOCKED" {
        ("DECLINE", "COUNTRY_BLOCKED")
    } else if number(context, "txn_count_5") > number(context, "VELOCITY_5_COUNT") {
        ("REVIEW", "VELOCITY_5")
    } else {
        ("APPROVE", "NONE")
    };
    Ok(respond(
        context,
        CARD_MODEL.name,
        json!({ "fraud_decision": decision, "fraud_reason": reason }),
    ))
}

fn myprime_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let (decision, reason) =
        if number(context, "xgboost_ml_score") >= number(context, "ML_FRAUD_THRESHOLD") {
            ("FRAUD", "HIGH_ML_SCORE")
        } else if number(context, "transaction_amount")
            >= number(context, "LARGE_AMOUNT_THRESHOLD")
        {
            ("SUSPICIOUS", "LARGE_AMOUNT")
        } else {
            ("LEGIT", "NONE")
        };
    Ok(respond(
        context,
        MYPRIME_MODEL.name,
        json!({ "fraud_decision": decision, "fraud_reason": reason }),
    ))
}

fn simple_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let suspicious = number(context, "transaction_amount") > 100_000.0;
    let decision = if suspicious {
        json!({ "fraud_decision": "SUSPICIOUS", "fraud_reason": "LARGE_AMOUNT" })
    } else {
        json!({ "fraud_decision": "LEGIT", "fraud_reason": "NONE" })
    };
    Ok(respond(context, MYPRIME_SIMPLE_MODEL.name, decision))
}

fn orchestrated_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let ml_cutoff = context
        .get("RULES")
        .and_then(|rules| rules.pointer("/GLOBAL/ml_fraud"))
        .and_then(Value::as_f64)
        .unwrap_or(1.0);
    let max_ml = context.get("max_ml_score").and_then(Value::as_f64);
    let ml_points = if max_ml.is_some_and(|score| score >= ml_cutoff) { 40 } else { 0 };
    let odd_hours_points = if number(context, "login_hour_bd") < 6.0 { 15 } else { 0 };
    let total = ml_points + odd_hours_points;
    let decision = if total >= 40 { "FRAUD" } else { "LEGIT" };
    let reason = if ml_points > 0 { "HIGH_ML_SCORE" } else { "NONE" };
    Ok(respond(
        context,
        MYPRIME_ORCHESTRATED_MODEL.name,
        json!({
            "fraud_decision": decision,
            "fraud_reason": reason,
            "rule_results": [
                { "reason": "HIGH_ML_SCORE", "contribution": ml_points },
                { "reason": "ODD_HOURS_LOGIN", "contribution": odd_hours_points },
            ],
            "total_score": total,
        }),
    ))
}

fn risk_signals_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let velocity = if number(context, "transaction_count_last_5_min") > 3.0 { 30 } else { 0 };
    Ok(respond(context, "VelocityRiskScore", json!(velocity)))
}

fn risk_score_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let total: f64 = [
        "VelocityRiskScore",
        "DeviceRiskScore",
        "BeneficiaryRiskScore",
        "AuthRiskScore",
        "MlFraudScore",
    ]
    .iter()
    .map(|key| number(context, key))
    .sum();
    Ok(respond(context, "TotalRiskScore", json!(total)))
}

fn fraud_category_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let total = number(context, "TotalRiskScore");
    let category = if total >= number(context, "FRAUD_THRESHOLD") {
        "FRAUD"
    } else if total >= number(context, "RISKY_THRESHOLD") {
        "RISKY"
    } else if total >= number(context, "SUSPICIOUS_THRESHOLD") {
        "SUSPICIOUS"
    } else {
        "LEGIT"
    };
    Ok(respond(context, "FraudCategory", json!(category)))
}

fn fraud_action_model(context: &DecisionContext) -> Result<DecisionContext, String> {
    let action = if number(context, "VelocityRiskScore") >= 30.0 { "BLOCK" } else { "ALLOW" };
    Ok(respond(context, "FraudDecision", json!(action)))
}

pub(super) fn registry() -> ModelRegistry {
    ModelRegistry::new()
        .with(CARD_MODEL, card_model)
        .with(MYPRIME_MODEL, myprime_model)
        .with(MYPRIME_SIMPLE_MODEL, simple_model)
        .with(MYPRIME_ORCHESTRATED_MODEL, orchestrated_model)
        .with(RISK_SIGNALS_MODEL, risk_signals_model)
        .with(RISK_SCORE_MODEL, risk_score_model)
        .with(FRAUD_CATEGORY_MODEL, fraud_category_model)
        .with(FRAUD_ACTION_MODEL, fraud_action_model)
}

/// Contexts each model received, by model name.
#[derive(Clone, Default)]
pub(super) struct Captured {
    contexts: Arc<Mutex<HashMap<&'static str, DecisionContext>>>,
}

impl Captured {
    pub(super) fn get(&self, model: ModelRef) -> DecisionContext {
        self.contexts
            .lock()
            .expect("captured lock")
            .get(model.name)
            .cloned()
            .expect("model was called")
    }
}

/// Wraps every fixture model so the contexts it receives can be inspected.
pub(super) fn recording_registry() -> (ModelRegistry, Captured) {
    let captured = Captured::default();
    let recording = ModelRegistry::new();
    let fixtures: [(ModelRef, fn(&DecisionContext) -> Result<DecisionContext, String>); 8] = [
        (CARD_MODEL, card_model),
        (MYPRIME_MODEL, myprime_model),
        (MYPRIME_SIMPLE_MODEL, simple_model),
        (MYPRIME_ORCHESTRATED_MODEL, orchestrated_model),
        (RISK_SIGNALS_MODEL, risk_signals_model),
        (RISK_SCORE_MODEL, risk_score_model),
        (FRAUD_CATEGORY_MODEL, fraud_category_model),
        (FRAUD_ACTION_MODEL, fraud_action_model),
    ];
    for (model, fixture) in fixtures {
        let sink = captured.clone();
        recording.register(model, move |context: &DecisionContext| {
            sink.contexts
                .lock()
                .expect("captured lock")
                .insert(model.name, context.clone());
            fixture(context)
        });
    }
    (recording, captured)
}

pub(super) fn build_service_with(
    store: Arc<MemoryConfigStore>,
    registry: ModelRegistry,
) -> (Arc<TestService>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let service = DecisionService::with_clock(
        store,
        Arc::new(registry),
        &cache_config(),
        clock.clone(),
    );
    (Arc::new(service), clock)
}

pub(super) fn build_service() -> (Arc<TestService>, Arc<MemoryConfigStore>, Arc<ManualClock>) {
    let store = Arc::new(seeded_store());
    let (service, clock) = build_service_with(Arc::clone(&store), registry());
    (service, store, clock)
}

pub(super) fn router_with_service(service: Arc<TestService>) -> Router {
    decision_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
