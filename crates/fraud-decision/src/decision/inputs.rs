//! Typed transaction requests, one per model family.
//!
//! Each `from_payload` reads only the fields its model recognises and applies the
//! documented default to anything missing or malformed.

use super::coerce::{as_bool, as_number, as_optional_number, as_string};
use serde_json::{Map, Value};

pub type Payload = Map<String, Value>;

fn number(payload: &Payload, key: &str) -> f64 {
    as_number(payload.get(key), 0.0)
}

fn flag(payload: &Payload, key: &str, default: bool) -> bool {
    as_bool(payload.get(key), default)
}

fn text(payload: &Payload, key: &str) -> Option<String> {
    as_string(payload.get(key))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardTransaction {
    pub txn_id: Option<String>,
    pub product_code: Option<String>,
    pub mcc_group_id: Option<String>,
    pub txn_country: Option<String>,
    pub txn_channel: Option<String>,
    pub is_magstripe: bool,
    pub is_3ds_authenticated: bool,
    pub txn_count_5: f64,
    pub txn_amount_5: f64,
    pub txn_count_30: f64,
    pub txn_amount_30: f64,
    pub wrong_cvv_10: f64,
    pub wrong_pin_10: f64,
    pub card_failed_cnt1day: f64,
    pub ccy_cnt1hr: f64,
    pub card_terminal_txn_cnt1day: f64,
    pub card_terminal_txn_failed_cnt1day: f64,
    pub ml_fraud_score_card: f64,
}

impl CardTransaction {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            txn_id: text(payload, "txn_id"),
            product_code: text(payload, "product_code"),
            mcc_group_id: text(payload, "mcc_group_id"),
            txn_country: text(payload, "txn_country"),
            txn_channel: text(payload, "txn_channel"),
            is_magstripe: flag(payload, "is_magstripe", false),
            is_3ds_authenticated: flag(payload, "is_3ds_authenticated", true),
            txn_count_5: number(payload, "txn_count_5"),
            txn_amount_5: number(payload, "txn_amount_5"),
            txn_count_30: number(payload, "txn_count_30"),
            txn_amount_30: number(payload, "txn_amount_30"),
            wrong_cvv_10: number(payload, "wrong_cvv_10"),
            wrong_pin_10: number(payload, "wrong_pin_10"),
            card_failed_cnt1day: number(payload, "card_failed_cnt1day"),
            ccy_cnt1hr: number(payload, "ccy_cnt1hr"),
            card_terminal_txn_cnt1day: number(payload, "card_terminal_txn_cnt1day"),
            card_terminal_txn_failed_cnt1day: number(payload, "card_terminal_txn_failed_cnt1day"),
            ml_fraud_score_card: number(payload, "ml_fraud_score_card"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MyPrimeTransaction {
    pub transaction_id: Option<String>,
    pub xgboost_ml_score: f64,
    pub transaction_amount: f64,
    pub failed_logins_last_1hr: f64,
    pub txn_count_1hr: f64,
    pub txn_amount_1hr: f64,
    pub txn_count_24hr: f64,
    pub txn_amount_24hr: f64,
    pub country_count_24hr: f64,
    pub city_count_24hr: f64,
    pub new_devices_7days: f64,
    pub new_beneficiaries_7days: f64,
    pub is_new_device: bool,
    pub is_new_beneficiary: bool,
    pub is_odd_hours: bool,
    pub mcc_code: Option<String>,
}

impl MyPrimeTransaction {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            transaction_id: text(payload, "transaction_id"),
            xgboost_ml_score: number(payload, "xgboost_ml_score"),
            transaction_amount: number(payload, "transaction_amount"),
            failed_logins_last_1hr: number(payload, "failed_logins_last_1hr"),
            txn_count_1hr: number(payload, "txn_count_1hr"),
            txn_amount_1hr: number(payload, "txn_amount_1hr"),
            txn_count_24hr: number(payload, "txn_count_24hr"),
            txn_amount_24hr: number(payload, "txn_amount_24hr"),
            country_count_24hr: number(payload, "country_count_24hr"),
            city_count_24hr: number(payload, "city_count_24hr"),
            new_devices_7days: number(payload, "new_devices_7days"),
            new_beneficiaries_7days: number(payload, "new_beneficiaries_7days"),
            is_new_device: flag(payload, "is_new_device", false),
            is_new_beneficiary: flag(payload, "is_new_beneficiary", false),
            is_odd_hours: flag(payload, "is_odd_hours", false),
            mcc_code: text(payload, "mcc_code"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTransaction {
    pub transaction_id: Option<String>,
    pub transaction_amount: f64,
    pub failed_logins_last_1hr: f64,
    pub xgboost_ml_score: f64,
    pub is_new_device: bool,
    pub is_new_beneficiary: bool,
}

impl SimpleTransaction {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            transaction_id: text(payload, "transaction_id"),
            transaction_amount: number(payload, "transaction_amount"),
            failed_logins_last_1hr: number(payload, "failed_logins_last_1hr"),
            xgboost_ml_score: number(payload, "xgboost_ml_score"),
            is_new_device: flag(payload, "is_new_device", false),
            is_new_beneficiary: flag(payload, "is_new_beneficiary", false),
        }
    }
}

/// Request for the orchestrated model, which receives the whole payload verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratedTransaction {
    pub payload: Payload,
    pub transaction_id: Option<String>,
    pub login_timestamp: Option<String>,
    pub ml_fraud_score_myprime: Option<f64>,
    pub ml_fraud_score_myprime_unstructured_ml: Option<f64>,
}

impl OrchestratedTransaction {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            transaction_id: text(payload, "transaction_id"),
            login_timestamp: text(payload, "login_timestamp"),
            ml_fraud_score_myprime: as_optional_number(payload.get("ml_fraud_score_myprime")),
            ml_fraud_score_myprime_unstructured_ml: as_optional_number(
                payload.get("ml_fraud_score_myprime_unstructured_ml"),
            ),
            payload: payload.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedTransaction {
    pub transaction_id: Option<String>,
    pub transaction_count_last_5_min: f64,
    pub amount_sum_last_5_min: f64,
    pub transaction_count_last_30_min: f64,
    pub amount_sum_last_30_min: f64,
    pub device_risk_score: f64,
    pub beneficiary_risk_score: f64,
    pub auth_risk_score: f64,
    pub ml_fraud_score: f64,
    pub merchant_risk_score: f64,
    pub terminal_risk_score: f64,
    pub txn_channel: Option<String>,
}

impl StagedTransaction {
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            transaction_id: text(payload, "transaction_id"),
            transaction_count_last_5_min: number(payload, "transaction_count_last_5_min"),
            amount_sum_last_5_min: number(payload, "amount_sum_last_5_min"),
            transaction_count_last_30_min: number(payload, "transaction_count_last_30_min"),
            amount_sum_last_30_min: number(payload, "amount_sum_last_30_min"),
            device_risk_score: number(payload, "DeviceRiskScore"),
            beneficiary_risk_score: number(payload, "BeneficiaryRiskScore"),
            auth_risk_score: number(payload, "AuthRiskScore"),
            ml_fraud_score: number(payload, "MlFraudScore"),
            merchant_risk_score: number(payload, "MerchantRiskScore"),
            terminal_risk_score: number(payload, "TerminalRiskScore"),
            txn_channel: text(payload, "txn_channel"),
        }
    }
}
