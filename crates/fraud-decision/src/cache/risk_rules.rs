use super::{CacheError, CacheStatus, Clock, Snapshot, TtlCache};
use crate::store::{ConfigStore, RiskRuleEntry, StoreError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Built-in catalogue: (rule id, rule name, description, risk score, severity).
#[rustfmt::skip]
const DEFAULT_RISK_RULES: &[(&str, &str, &str, f64, &str)] = &[
    ("RULE_1", "MULTIPLE_FAILED_LOGIN_ATTEMPTS", "Multiple failed login attempts in 1 hour", 15.0, "SUSPICIOUS"),
    ("RULE_2", "NEW_DEVICE_LOGIN", "Login from new/unrecognized device", 10.0, "SUSPICIOUS"),
    ("RULE_3", "FREQUENT_DEVICE_CHANGES", "Frequent device changes in 30 days", 12.0, "SUSPICIOUS"),
    ("RULE_4", "UNUSUAL_LOGIN_TIME", "Login during unusual hours (2-5 AM)", 8.0, "SUSPICIOUS"),
    ("RULE_5", "HIGH_LOGIN_VELOCITY", "High login velocity in 24 hours", 10.0, "SUSPICIOUS"),
    ("RULE_6", "RAPID_BENEFICIARY_ADDITION_24HR", "Rapid beneficiary addition in 24 hours", 20.0, "SUSPICIOUS"),
    ("RULE_7", "RAPID_BENEFICIARY_ADDITION_7D", "Rapid beneficiary addition in 7 days", 15.0, "SUSPICIOUS"),
    ("RULE_8", "NEW_BENEFICIARY_LARGE_TRANSFER", "New beneficiary with immediate large transfer", 25.0, "SUSPICIOUS"),
    ("RULE_9", "BENEFICIARY_CHURN_PATTERN", "Beneficiary churn (add & delete pattern)", 18.0, "SUSPICIOUS"),
    ("RULE_10", "FREQUENT_MFS_TRANSFERS", "Frequent MFS transfers in short period", 20.0, "SUSPICIOUS"),
    ("RULE_11", "LARGE_MFS_CASHOUT", "Large MFS cash-out transaction", 25.0, "FRAUD"),
    ("RULE_12", "HIGH_MFS_VELOCITY", "High MFS transaction velocity", 22.0, "SUSPICIOUS"),
    ("RULE_13", "SUSPICIOUS_ROUND_AMOUNT", "Suspicious round amount transfer", 12.0, "SUSPICIOUS"),
    ("RULE_14", "JUST_BELOW_LIMIT", "Transaction just below daily limit", 18.0, "SUSPICIOUS"),
    ("RULE_15", "DAILY_LIMIT_EXHAUSTION", "Daily limit exhaustion", 20.0, "SUSPICIOUS"),
    ("RULE_16", "UNUSUALLY_LARGE_TRANSACTION", "Unusually large transaction", 15.0, "SUSPICIOUS"),
    ("RULE_17", "HIGH_VELOCITY_5MIN", "High transaction velocity in 5 minutes", 25.0, "FRAUD"),
    ("RULE_18", "HIGH_VELOCITY_30MIN", "High transaction velocity in 30 minutes", 20.0, "FRAUD"),
    ("RULE_19", "RAPID_AMOUNT_MOVEMENT_5MIN", "Rapid amount movement in 5 minutes", 30.0, "FRAUD"),
    ("RULE_20", "RAPID_FUND_PASSTHROUGH", "Money in and immediately out pattern", 35.0, "FRAUD"),
    ("RULE_21", "IMMEDIATE_DRAIN_AFTER_CREDIT", "Large debit after credit", 30.0, "FRAUD"),
    ("RULE_22", "OTP_NOT_VERIFIED_LARGE_TXN", "OTP not verified for large transaction", 40.0, "FRAUD"),
    ("RULE_23", "OTP_BYPASS_LARGE_AMOUNT", "OTP bypass for large amount", 35.0, "FRAUD"),
    ("RULE_24", "NEW_ACCOUNT_LARGE_TRANSACTION", "New account with high activity", 25.0, "SUSPICIOUS"),
    ("RULE_25", "DORMANT_ACCOUNT_ACTIVATION", "Dormant account reactivation", 28.0, "SUSPICIOUS"),
    ("RULE_26", "EXTREME_AMOUNT_DEVIATION", "Extreme amount deviation from average", 30.0, "FRAUD"),
    ("RULE_27", "HIGH_RISK_COMBINATION_1", "New device + new beneficiary + large amount", 50.0, "FRAUD"),
    ("RULE_28", "HIGH_RISK_COMBINATION_2", "Multiple red flags in short time", 45.0, "FRAUD"),
    ("RULE_29", "ACCOUNT_TAKEOVER_PATTERN", "Failed login + new device + large transaction", 55.0, "FRAUD"),
];

pub fn default_risk_rules() -> Vec<RiskRuleEntry> {
    DEFAULT_RISK_RULES
        .iter()
        .map(|(id, name, description, score, severity)| RiskRuleEntry {
            rule_id: (*id).to_string(),
            rule_name: (*name).to_string(),
            rule_description: Some((*description).to_string()),
            risk_score: *score,
            severity: (*severity).to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRuleSource {
    Store,
    Default,
}

/// The rule list a caller is served and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRuleView {
    pub source: RiskRuleSource,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub rules: Vec<RiskRuleEntry>,
}

/// Scored risk-rule catalogue. Unlike the other caches a cold-start failure is not an
/// error: callers get the built-in catalogue until the store answers.
pub struct RiskRuleCatalogue<S> {
    store: Arc<S>,
    inner: TtlCache<Vec<RiskRuleEntry>>,
}

impl<S: ConfigStore> RiskRuleCatalogue<S> {
    pub fn new(store: Arc<S>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            inner: TtlCache::new("myprime-risk-rules", ttl, clock),
        }
    }

    fn load(&self) -> Result<Vec<RiskRuleEntry>, StoreError> {
        Ok(self
            .store
            .active_risk_rules()?
            .into_iter()
            .filter(|rule| !rule.rule_id.trim().is_empty())
            .collect())
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot<Vec<RiskRuleEntry>>>, CacheError> {
        self.inner.snapshot_with(|| self.load())
    }

    pub fn force_refresh(&self) -> Result<Arc<Snapshot<Vec<RiskRuleEntry>>>, CacheError> {
        self.inner.force_refresh_with(|| self.load())
    }

    pub fn rules(&self) -> RiskRuleView {
        match self.snapshot() {
            Ok(snapshot) => RiskRuleView {
                source: RiskRuleSource::Store,
                refreshed_at: Some(snapshot.refreshed_at),
                rules: snapshot.data.clone(),
            },
            Err(err) => {
                warn!(error = %err, "serving built-in risk rule catalogue");
                RiskRuleView {
                    source: RiskRuleSource::Default,
                    refreshed_at: None,
                    rules: default_risk_rules(),
                }
            }
        }
    }

    pub fn status(&self) -> CacheStatus {
        self.inner.status_with(Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use crate::store::SqliteConfigStore;

    fn catalogue(store: SqliteConfigStore) -> RiskRuleCatalogue<SqliteConfigStore> {
        RiskRuleCatalogue::new(Arc::new(store), Duration::from_secs(300), Arc::new(SystemClock))
    }

    #[test]
    fn stored_rules_are_served_in_priority_order() {
        let store = SqliteConfigStore::in_memory().expect("store");
        store
            .execute_batch(
                "INSERT INTO myprime_risk_rules (rule_id, rule_name, risk_score, severity, priority) VALUES
                    ('RULE_4', 'UNUSUAL_LOGIN_TIME', 8, 'SUSPICIOUS', 1),
                    ('RULE_22', 'OTP_NOT_VERIFIED_LARGE_TXN', 40, 'FRAUD', 7),
                    ('  ', 'BLANK_ID', 1, 'SUSPICIOUS', 9);",
            )
            .expect("seed");
        let catalogue = catalogue(store);

        let view = catalogue.rules();

        assert_eq!(view.source, RiskRuleSource::Store);
        let ids: Vec<&str> = view.rules.iter().map(|rule| rule.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["RULE_22", "RULE_4"]);
        assert_eq!(catalogue.status().entries, 2);
    }

    #[test]
    fn unreachable_store_serves_the_built_in_catalogue() {
        let store = SqliteConfigStore::in_memory().expect("store");
        store
            .execute_batch("DROP TABLE myprime_risk_rules;")
            .expect("drop table");
        let catalogue = catalogue(store);

        let view = catalogue.rules();

        assert_eq!(view.source, RiskRuleSource::Default);
        assert_eq!(view.rules.len(), 29);
        assert_eq!(view.rules[28].rule_name, "ACCOUNT_TAKEOVER_PATTERN");
        assert_eq!(view.rules[28].risk_score, 55.0);
        assert!(catalogue.status().last_refresh.is_none());
        assert_eq!(catalogue.status().refresh_failures, 1);
    }
}
