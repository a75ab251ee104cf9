//! Canned MyPrime requests used to verify a deployed rule set end to end.
//!
//! Rule cases are derived from the thresholds currently in force, so a threshold change
//! in the store moves the cases with it.

use serde_json::{json, Value};

use super::inputs::Payload;
use crate::cache::ThresholdMap;

/// One request and the raw decision it is expected to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCase {
    pub name: &'static str,
    pub input: Payload,
    pub expected_decision: &'static str,
    pub expected_reason: &'static str,
}

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

fn case(
    name: &'static str,
    input: Value,
    expected_decision: &'static str,
    expected_reason: &'static str,
) -> RuleCase {
    RuleCase {
        name,
        input: payload(input),
        expected_decision,
        expected_reason,
    }
}

/// Twenty cases, one per MyPrime rule, fraud rules first. `thresholds` is keyed by store
/// name with defaults already merged in.
pub fn myprime_rule_cases(thresholds: &ThresholdMap) -> Vec<RuleCase> {
    let t = |key: &str| thresholds.get(key).copied().unwrap_or(0.0);
    let ml_fraud = t("ML_FRAUD_THRESHOLD");
    let ml_suspicious = t("ML_SUSPICIOUS_THRESHOLD");
    let large = t("LARGE_AMOUNT");

    vec![
        case(
            "Rule 1: High ML Score",
            json!({ "xgboost_ml_score": ml_fraud + 0.1 }),
            "FRAUD",
            "HIGH_ML_SCORE",
        ),
        case(
            "Rule 2: Very Large Amount",
            json!({ "transaction_amount": t("VERY_LARGE_AMOUNT") + 1_000.0 }),
            "FRAUD",
            "VERY_LARGE_AMOUNT",
        ),
        case(
            "Rule 3: Extreme Failed Logins",
            json!({ "failed_logins_last_1hr": t("FAILED_LOGINS_FRAUD_1HR") + 5.0 }),
            "FRAUD",
            "EXTREME_FAILED_LOGINS",
        ),
        case(
            "Rule 4: High 24hr Transaction Count",
            json!({ "txn_count_24hr": t("TXN_COUNT_24HR") + 5.0 }),
            "FRAUD",
            "HIGH_VELOCITY_24HR_COUNT",
        ),
        case(
            "Rule 5: High 24hr Transaction Amount",
            json!({ "txn_amount_24hr": t("TXN_AMOUNT_24HR") + 100_000.0 }),
            "FRAUD",
            "HIGH_VELOCITY_24HR_AMOUNT",
        ),
        case(
            "Rule 6: New Device + New Beneficiary",
            json!({ "is_new_device": true, "is_new_beneficiary": true }),
            "FRAUD",
            "NEW_DEVICE_AND_BENEFICIARY",
        ),
        case(
            "Rule 7: Excessive New Devices",
            json!({ "new_devices_7days": t("NEW_DEVICES_7DAYS") + 1.0 }),
            "FRAUD",
            "EXCESSIVE_NEW_DEVICES",
        ),
        case(
            "Rule 8: Excessive New Beneficiaries",
            json!({ "new_beneficiaries_7days": t("NEW_BENEFICIARIES_7DAYS") + 1.0 }),
            "FRAUD",
            "EXCESSIVE_NEW_BENEFICIARIES",
        ),
        case(
            "Rule 9: Large Amount",
            json!({ "transaction_amount": large + 1_000.0 }),
            "SUSPICIOUS",
            "LARGE_AMOUNT",
        ),
        case(
            "Rule 10: Multiple Failed Logins",
            json!({ "failed_logins_last_1hr": t("FAILED_LOGINS_1HR") + 2.0 }),
            "SUSPICIOUS",
            "MULTIPLE_FAILED_LOGINS",
        ),
        case(
            "Rule 11: High 1hr Transaction Count",
            json!({ "txn_count_1hr": t("TXN_COUNT_1HR") + 1.0 }),
            "SUSPICIOUS",
            "HIGH_VELOCITY_1HR_COUNT",
        ),
        case(
            "Rule 12: High 1hr Transaction Amount",
            json!({ "txn_amount_1hr": t("TXN_AMOUNT_1HR") + 10_000.0 }),
            "SUSPICIOUS",
            "HIGH_VELOCITY_1HR_AMOUNT",
        ),
        case(
            "Rule 13: Multi-Country Activity",
            json!({ "country_count_24hr": t("COUNTRIES_24HR") + 1.0 }),
            "SUSPICIOUS",
            "MULTI_COUNTRY_ACTIVITY",
        ),
        case(
            "Rule 14: Multi-City Activity",
            json!({ "city_count_24hr": t("CITIES_24HR") + 1.0 }),
            "SUSPICIOUS",
            "MULTI_CITY_ACTIVITY",
        ),
        case(
            "Rule 15: Odd Hours + Large Amount",
            json!({ "is_odd_hours": true, "transaction_amount": large * 0.6 }),
            "SUSPICIOUS",
            "ODD_HOURS_LARGE_TXN",
        ),
        case(
            "Rule 16: Odd Hours + New Device",
            json!({ "is_odd_hours": true, "is_new_device": true }),
            "SUSPICIOUS",
            "ODD_HOURS_NEW_DEVICE",
        ),
        case("Rule 17: New Device", json!({ "is_new_device": true }), "SUSPICIOUS", "NEW_DEVICE"),
        case(
            "Rule 18: New Beneficiary",
            json!({ "is_new_beneficiary": true }),
            "SUSPICIOUS",
            "NEW_BENEFICIARY",
        ),
        case(
            "Rule 19: Moderate ML Score",
            json!({ "xgboost_ml_score": (ml_suspicious + ml_fraud) / 2.0 }),
            "SUSPICIOUS",
            "MODERATE_ML_SCORE",
        ),
        case(
            "Rule 20: Normal Transaction",
            json!({ "xgboost_ml_score": ml_suspicious * 0.6, "transaction_amount": large * 0.5 }),
            "NORMAL",
            "NONE",
        ),
    ]
}

/// Fixed smoke requests for the MyPrime model, named for the signal each one carries.
pub fn myprime_smoke_cases() -> Vec<(&'static str, Payload)> {
    let cases = [
        ("High ML Score", json!({ "xgboost_ml_score": 0.75 })),
        ("New Device + Beneficiary", json!({ "is_new_device": true, "is_new_beneficiary": true })),
        ("Multiple Failed Logins", json!({ "failed_logins_last_1hr": 5.0 })),
        ("Large Amount", json!({ "transaction_amount": 150_000.0 })),
        ("Normal Transaction", json!({ "xgboost_ml_score": 0.45, "transaction_amount": 50_000.0 })),
    ];
    cases
        .into_iter()
        .map(|(name, input)| {
            let mut input = payload(input);
            let id = format!("TEST-{}", name.replace(' ', "-"));
            input.insert("transaction_id".into(), json!(id));
            (name, input)
        })
        .collect()
}

/// The canned request behind the simple model's smoke endpoint.
pub fn simple_smoke_request() -> Payload {
    payload(json!({
        "transaction_id": "TEST_001",
        "transaction_amount": 150_000.0,
        "is_new_device": true,
        "is_new_beneficiary": true,
        "failed_logins_last_1hr": 0,
        "xgboost_ml_score": 0.65,
    }))
}
