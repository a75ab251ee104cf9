//! Builds engine input contexts from typed requests and already-resolved reference data.
//!
//! Every function here is pure and total.

use super::inputs::{
    CardTransaction, MyPrimeTransaction, OrchestratedTransaction, SimpleTransaction,
    StagedTransaction,
};
use super::naming::{
    external_name, COUNTRY_RISK, LOGIN_HOUR_BD, MAX_ML_SCORE, MYPRIME_THRESHOLD_RENAMES,
    PRODUCT_MCC_RISK, RULES, STAGED_THRESHOLD_RENAMES, SUSPICIOUS_MCC_LIST, TOTAL_RISK_SCORE,
    VELOCITY_RISK_SCORE,
};
use crate::cache::{RuleParameters, ThresholdMap};
use crate::gateway::DecisionContext;
use chrono::{DateTime, FixedOffset, Timelike};
use serde_json::{json, Value};

/// Asia/Dhaka has no DST.
const DHAKA_OFFSET_SECS: i32 = 6 * 3600;
const NEUTRAL_LOGIN_HOUR: u32 = 12;

/// Cache-derived values for the card model.
#[derive(Debug, Clone, PartialEq)]
pub struct CardReferenceData {
    pub thresholds: ThresholdMap,
    pub suspicious_mcc: Vec<String>,
    pub country_risk: String,
    pub product_mcc_risk: String,
}

fn text(value: &Option<String>) -> Value {
    value.as_deref().map(Value::from).unwrap_or(Value::Null)
}

/// Adds thresholds under their engine names.
pub fn merge_thresholds(
    context: &mut DecisionContext,
    thresholds: &ThresholdMap,
    renames: &[(&str, &str)],
) {
    for (key, value) in thresholds {
        context.insert(external_name(renames, key).to_string(), json!(value));
    }
}

pub fn card_context(txn: &CardTransaction, reference: &CardReferenceData) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert("product_code".into(), text(&txn.product_code));
    context.insert("mcc_group_id".into(), text(&txn.mcc_group_id));
    context.insert("txn_country".into(), text(&txn.txn_country));
    context.insert("txn_channel".into(), text(&txn.txn_channel));
    context.insert("is_magstripe".into(), json!(txn.is_magstripe));
    context.insert("is_3ds_authenticated".into(), json!(txn.is_3ds_authenticated));

    let numbers = [
        ("txn_count_5", txn.txn_count_5),
        ("txn_amount_5", txn.txn_amount_5),
        ("txn_count_30", txn.txn_count_30),
        ("txn_amount_30", txn.txn_amount_30),
        ("wrong_cvv_10", txn.wrong_cvv_10),
        ("wrong_pin_10", txn.wrong_pin_10),
        ("card_failed_cnt1day", txn.card_failed_cnt1day),
        ("ccy_cnt1hr", txn.ccy_cnt1hr),
        ("card_terminal_txn_cnt1day", txn.card_terminal_txn_cnt1day),
        ("card_terminal_txn_failed_cnt1day", txn.card_terminal_txn_failed_cnt1day),
        ("ml_fraud_score_card", txn.ml_fraud_score_card),
    ];
    for (key, value) in numbers {
        context.insert(key.into(), json!(value));
    }

    merge_thresholds(&mut context, &reference.thresholds, &[]);
    context.insert(SUSPICIOUS_MCC_LIST.into(), json!(reference.suspicious_mcc));
    context.insert(COUNTRY_RISK.into(), json!(reference.country_risk));
    context.insert(PRODUCT_MCC_RISK.into(), json!(reference.product_mcc_risk));
    context
}

pub fn myprime_context(txn: &MyPrimeTransaction, thresholds: &ThresholdMap) -> DecisionContext {
    let mut context = DecisionContext::new();
    let numbers = [
        ("xgboost_ml_score", txn.xgboost_ml_score),
        ("transaction_amount", txn.transaction_amount),
        ("failed_logins_last_1hr", txn.failed_logins_last_1hr),
        ("txn_count_1hr", txn.txn_count_1hr),
        ("txn_amount_1hr", txn.txn_amount_1hr),
        ("txn_count_24hr", txn.txn_count_24hr),
        ("txn_amount_24hr", txn.txn_amount_24hr),
        ("country_count_24hr", txn.country_count_24hr),
        ("city_count_24hr", txn.city_count_24hr),
        ("new_devices_7days", txn.new_devices_7days),
        ("new_beneficiaries_7days", txn.new_beneficiaries_7days),
    ];
    for (key, value) in numbers {
        context.insert(key.into(), json!(value));
    }
    context.insert("is_new_device".into(), json!(txn.is_new_device));
    context.insert("is_new_beneficiary".into(), json!(txn.is_new_beneficiary));
    context.insert("is_odd_hours".into(), json!(txn.is_odd_hours));
    context.insert("mcc_code".into(), text(&txn.mcc_code));

    merge_thresholds(&mut context, thresholds, MYPRIME_THRESHOLD_RENAMES);
    context
}

pub fn simple_context(txn: &SimpleTransaction) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert("transaction_amount".into(), json!(txn.transaction_amount));
    context.insert("failed_logins_last_1hr".into(), json!(txn.failed_logins_last_1hr));
    context.insert("xgboost_ml_score".into(), json!(txn.xgboost_ml_score));
    context.insert("is_new_device".into(), json!(txn.is_new_device));
    context.insert("is_new_beneficiary".into(), json!(txn.is_new_beneficiary));
    context
}

/// The whole request is the base layer; derived fields overwrite colliding keys.
pub fn orchestrated_context(
    txn: &OrchestratedTransaction,
    rules: &RuleParameters,
) -> DecisionContext {
    let mut context = txn.payload.clone();
    context.insert(
        LOGIN_HOUR_BD.into(),
        json!(login_hour_bd(txn.login_timestamp.as_deref())),
    );
    context.insert(
        MAX_ML_SCORE.into(),
        json!(max_present(
            txn.ml_fraud_score_myprime,
            txn.ml_fraud_score_myprime_unstructured_ml
        )),
    );
    context.insert(RULES.into(), Value::Object(rules.clone()));
    context
}

/// Hour of day in Dhaka for an RFC 3339 timestamp; noon when absent or unparseable.
pub fn login_hour_bd(timestamp: Option<&str>) -> u32 {
    let offset = match FixedOffset::east_opt(DHAKA_OFFSET_SECS) {
        Some(offset) => offset,
        None => return NEUTRAL_LOGIN_HOUR,
    };
    timestamp
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|instant| instant.with_timezone(&offset).hour())
        .unwrap_or(NEUTRAL_LOGIN_HOUR)
}

/// Larger of two optional values; a missing operand is ignored rather than read as zero.
pub fn max_present(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(value), None) | (None, Some(value)) => Some(value),
        (None, None) => None,
    }
}

pub fn risk_signals_context(txn: &StagedTransaction) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert("transaction_count_last_5_min".into(), json!(txn.transaction_count_last_5_min));
    context.insert("amount_sum_last_5_min".into(), json!(txn.amount_sum_last_5_min));
    context.insert("transaction_count_last_30_min".into(), json!(txn.transaction_count_last_30_min));
    context.insert("amount_sum_last_30_min".into(), json!(txn.amount_sum_last_30_min));
    context
}

pub fn risk_score_context(txn: &StagedTransaction, velocity_risk_score: f64) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert(VELOCITY_RISK_SCORE.into(), json!(velocity_risk_score));
    context.insert("DeviceRiskScore".into(), json!(txn.device_risk_score));
    context.insert("BeneficiaryRiskScore".into(), json!(txn.beneficiary_risk_score));
    context.insert("AuthRiskScore".into(), json!(txn.auth_risk_score));
    context.insert("MlFraudScore".into(), json!(txn.ml_fraud_score));
    context
}

pub fn fraud_category_context(total_risk_score: f64, thresholds: &ThresholdMap) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert(TOTAL_RISK_SCORE.into(), json!(total_risk_score));
    merge_thresholds(&mut context, thresholds, STAGED_THRESHOLD_RENAMES);
    context
}

pub fn fraud_action_context(txn: &StagedTransaction, velocity_risk_score: f64) -> DecisionContext {
    let mut context = DecisionContext::new();
    context.insert(VELOCITY_RISK_SCORE.into(), json!(velocity_risk_score));
    context.insert("AuthRiskScore".into(), json!(txn.auth_risk_score));
    context.insert("MerchantRiskScore".into(), json!(txn.merchant_risk_score));
    context.insert("TerminalRiskScore".into(), json!(txn.terminal_risk_score));
    context.insert("txn_channel".into(), text(&txn.txn_channel));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::inputs::Payload;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn malformed_amount_assembles_as_zero() {
        let txn = MyPrimeTransaction::from_payload(&payload(json!({
            "transaction_amount": "not-a-number"
        })));

        let context = myprime_context(&txn, &ThresholdMap::new());

        assert_eq!(context.get("transaction_amount"), Some(&json!(0.0)));
        assert_eq!(context.get("mcc_code"), Some(&Value::Null));
    }

    #[test]
    fn myprime_thresholds_use_engine_names() {
        let thresholds: ThresholdMap = [
            ("FAILED_LOGINS_1HR".to_string(), 4.0),
            ("ML_FRAUD_THRESHOLD".to_string(), 0.75),
        ]
        .into_iter()
        .collect();
        let txn = MyPrimeTransaction::from_payload(&Payload::new());

        let context = myprime_context(&txn, &thresholds);

        assert_eq!(context.get("FAILED_LOGINS_THRESHOLD"), Some(&json!(4.0)));
        assert_eq!(context.get("ML_FRAUD_THRESHOLD"), Some(&json!(0.75)));
        assert!(!context.contains_key("FAILED_LOGINS_1HR"));
    }

    #[test]
    fn card_context_carries_reference_data() {
        let txn = CardTransaction::from_payload(&payload(json!({ "product_code": "GOLD" })));
        let reference = CardReferenceData {
            thresholds: [("VELOCITY_5_COUNT".to_string(), 3.0)].into_iter().collect(),
            suspicious_mcc: vec!["7995".into()],
            country_risk: "NORMAL".into(),
            product_mcc_risk: "HIGH".into(),
        };

        let context = card_context(&txn, &reference);

        assert_eq!(context.get("VELOCITY_5_COUNT"), Some(&json!(3.0)));
        assert_eq!(context.get(SUSPICIOUS_MCC_LIST), Some(&json!(["7995"])));
        assert_eq!(context.get(PRODUCT_MCC_RISK), Some(&json!("HIGH")));
        assert_eq!(context.get("is_3ds_authenticated"), Some(&json!(true)));
        assert!(!context.contains_key("txn_id"));
    }

    #[test]
    fn orchestrated_passthrough_lets_derived_fields_win() {
        let txn = OrchestratedTransaction::from_payload(&payload(json!({
            "login_timestamp": "2026-01-12T20:30:00Z",
            "login_hour_bd": 3,
            "max_ml_score": 0.99,
            "ml_fraud_score_myprime": 0.4,
            "custom_field": "kept",
        })));

        let context = orchestrated_context(&txn, &RuleParameters::new());

        assert_eq!(context.get(LOGIN_HOUR_BD), Some(&json!(2)));
        assert_eq!(context.get(MAX_ML_SCORE), Some(&json!(0.4)));
        assert_eq!(context.get("custom_field"), Some(&json!("kept")));
        assert_eq!(context.get(RULES), Some(&json!({})));
    }

    #[test]
    fn login_hour_defaults_to_noon() {
        assert_eq!(login_hour_bd(None), 12);
        assert_eq!(login_hour_bd(Some("yesterday")), 12);
        assert_eq!(login_hour_bd(Some("2026-01-12T11:00:00Z")), 17);
        assert_eq!(login_hour_bd(Some("2026-01-12T11:00:00+06:00")), 11);
    }

    #[test]
    fn max_ignores_missing_operands() {
        assert_eq!(max_present(Some(0.2), Some(0.7)), Some(0.7));
        assert_eq!(max_present(None, Some(0.3)), Some(0.3));
        assert_eq!(max_present(Some(0.0), None), Some(0.0));
        assert_eq!(max_present(None, None), None);
    }

    #[test]
    fn fraud_category_uses_staged_names() {
        let thresholds: ThresholdMap =
            [("TOTAL_RISK_FRAUD".to_string(), 80.0)].into_iter().collect();

        let context = fraud_category_context(55.0, &thresholds);

        assert_eq!(context.get("FRAUD_THRESHOLD"), Some(&json!(80.0)));
        assert_eq!(context.get(TOTAL_RISK_SCORE), Some(&json!(55.0)));
    }
}
