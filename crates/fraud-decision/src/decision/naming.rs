//! Model identities, engine input names and threshold tables.
//!
//! These tables are part of the contract with the decision models: the engine matches
//! input names case-sensitively.

use crate::gateway::ModelRef;

pub const CARD_NAMESPACE: &str = "https://primebank.com/dmn/card";
pub const MYPRIME_NAMESPACE: &str = "https://primebank.com/dmn/myprime";
pub const STAGED_NAMESPACE: &str = "https://primebank.com/dmn/fraud";

pub const CARD_MODEL: ModelRef = ModelRef::new(CARD_NAMESPACE, "CardFraudDecision");
pub const MYPRIME_MODEL: ModelRef = ModelRef::new(MYPRIME_NAMESPACE, "MyPrimeDecision");
pub const MYPRIME_SIMPLE_MODEL: ModelRef =
    ModelRef::new(MYPRIME_NAMESPACE, "MyPrimeSimpleDecision");
pub const MYPRIME_ORCHESTRATED_MODEL: ModelRef =
    ModelRef::new(MYPRIME_NAMESPACE, "MyPrimeFraudDecision");

pub const RISK_SIGNALS_MODEL: ModelRef = ModelRef::new(STAGED_NAMESPACE, "RiskSignals");
pub const RISK_SCORE_MODEL: ModelRef = ModelRef::new(STAGED_NAMESPACE, "RiskScore");
pub const FRAUD_CATEGORY_MODEL: ModelRef = ModelRef::new(STAGED_NAMESPACE, "FraudDecision");
pub const FRAUD_ACTION_MODEL: ModelRef = ModelRef::new(STAGED_NAMESPACE, "FraudAction");

/// Every model a deployment is expected to serve.
pub const ALL_MODELS: [ModelRef; 8] = [
    CARD_MODEL,
    MYPRIME_MODEL,
    MYPRIME_SIMPLE_MODEL,
    MYPRIME_ORCHESTRATED_MODEL,
    RISK_SIGNALS_MODEL,
    RISK_SCORE_MODEL,
    FRAUD_CATEGORY_MODEL,
    FRAUD_ACTION_MODEL,
];

// Staged chain output names.
pub const VELOCITY_RISK_SCORE: &str = "VelocityRiskScore";
pub const TOTAL_RISK_SCORE: &str = "TotalRiskScore";
pub const FRAUD_CATEGORY: &str = "FraudCategory";
pub const FRAUD_ACTION: &str = "FraudDecision";

// Reference data keys in the card context.
pub const SUSPICIOUS_MCC_LIST: &str = "SUSPICIOUS_MCC_LIST";
pub const COUNTRY_RISK: &str = "COUNTRY_RISK";
pub const PRODUCT_MCC_RISK: &str = "PRODUCT_MCC_RISK";

// Derived keys in the orchestrated MyPrime context.
pub const LOGIN_HOUR_BD: &str = "login_hour_bd";
pub const MAX_ML_SCORE: &str = "max_ml_score";
pub const RULES: &str = "RULES";

pub const CARD_THRESHOLD_DEFAULTS: &[(&str, f64)] = &[
    ("VELOCITY_5_COUNT", 3.0),
    ("VELOCITY_5_AMOUNT", 200_000.0),
    ("VELOCITY_30_COUNT", 5.0),
    ("VELOCITY_30_AMOUNT", 500_000.0),
    ("FAILED_TXN_1DAY", 2.0),
    ("ML_FRAUD_THRESHOLD", 0.9),
    ("WRONG_CVV_10", 2.0),
    ("WRONG_PIN_10", 2.0),
];

pub const MYPRIME_THRESHOLD_DEFAULTS: &[(&str, f64)] = &[
    ("ML_FRAUD_THRESHOLD", 0.7),
    ("ML_SUSPICIOUS_THRESHOLD", 0.5),
    ("LARGE_AMOUNT", 100_000.0),
    ("VERY_LARGE_AMOUNT", 500_000.0),
    ("FAILED_LOGINS_1HR", 3.0),
    ("FAILED_LOGINS_FRAUD_1HR", 10.0),
    ("TXN_COUNT_1HR", 5.0),
    ("TXN_AMOUNT_1HR", 100_000.0),
    ("TXN_COUNT_24HR", 20.0),
    ("TXN_AMOUNT_24HR", 500_000.0),
    ("COUNTRIES_24HR", 3.0),
    ("CITIES_24HR", 5.0),
    ("NEW_DEVICES_7DAYS", 2.0),
    ("NEW_BENEFICIARIES_7DAYS", 3.0),
    ("ODD_HOURS_START", 22.0),
    ("ODD_HOURS_END", 6.0),
];

/// Store key -> engine input name. Keys not listed keep their store name.
pub const MYPRIME_THRESHOLD_RENAMES: &[(&str, &str)] = &[
    ("LARGE_AMOUNT", "LARGE_AMOUNT_THRESHOLD"),
    ("VERY_LARGE_AMOUNT", "VERY_LARGE_AMOUNT_THRESHOLD"),
    ("FAILED_LOGINS_1HR", "FAILED_LOGINS_THRESHOLD"),
    ("FAILED_LOGINS_FRAUD_1HR", "FAILED_LOGINS_FRAUD_THRESHOLD"),
    ("TXN_COUNT_1HR", "TX_COUNT_1HR_THRESHOLD"),
    ("TXN_AMOUNT_1HR", "TX_AMOUNT_1HR_THRESHOLD"),
    ("TXN_COUNT_24HR", "TX_COUNT_24HR_THRESHOLD"),
    ("TXN_AMOUNT_24HR", "TX_AMOUNT_24HR_THRESHOLD"),
    ("COUNTRIES_24HR", "MAX_COUNTRIES_24HR"),
    ("CITIES_24HR", "MAX_CITIES_24HR"),
    ("NEW_DEVICES_7DAYS", "MAX_NEW_DEVICES_7DAYS"),
    ("NEW_BENEFICIARIES_7DAYS", "MAX_NEW_BENEFICIARIES_7DAYS"),
];

pub const STAGED_THRESHOLD_DEFAULTS: &[(&str, f64)] = &[
    ("TOTAL_RISK_FRAUD", 70.0),
    ("TOTAL_RISK_RISKY", 50.0),
    ("TOTAL_RISK_SUSPICIOUS", 30.0),
];

pub const STAGED_THRESHOLD_RENAMES: &[(&str, &str)] = &[
    ("TOTAL_RISK_FRAUD", "FRAUD_THRESHOLD"),
    ("TOTAL_RISK_RISKY", "RISKY_THRESHOLD"),
    ("TOTAL_RISK_SUSPICIOUS", "SUSPICIOUS_THRESHOLD"),
];

pub fn external_name<'a>(renames: &[(&str, &'a str)], key: &'a str) -> &'a str {
    renames
        .iter()
        .find(|(internal, _)| *internal == key)
        .map(|(_, external)| *external)
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_renamed_key_has_a_default() {
        for (internal, _) in MYPRIME_THRESHOLD_RENAMES {
            assert!(
                MYPRIME_THRESHOLD_DEFAULTS.iter().any(|(key, _)| key == internal),
                "{internal}"
            );
        }
        for (internal, _) in STAGED_THRESHOLD_RENAMES {
            assert!(STAGED_THRESHOLD_DEFAULTS.iter().any(|(key, _)| key == internal));
        }
    }

    #[test]
    fn unlisted_keys_keep_their_name() {
        assert_eq!(
            external_name(MYPRIME_THRESHOLD_RENAMES, "FAILED_LOGINS_1HR"),
            "FAILED_LOGINS_THRESHOLD"
        );
        assert_eq!(
            external_name(MYPRIME_THRESHOLD_RENAMES, "ML_FRAUD_THRESHOLD"),
            "ML_FRAUD_THRESHOLD"
        );
    }
}
