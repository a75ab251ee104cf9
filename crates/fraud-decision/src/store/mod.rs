//! Read-only access to the relational rule configuration tables.
//!
//! The caches never talk to SQL directly; they go through [`ConfigStore`] so the
//! refresh path can be exercised against in-memory fixtures.

mod sqlite;

pub use sqlite::SqliteConfigStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named group of thresholds consumed by one family of decision models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSet {
    Card,
    MyPrime,
    Staged,
}

impl ThresholdSet {
    pub const ALL: [ThresholdSet; 3] = [ThresholdSet::Card, ThresholdSet::MyPrime, ThresholdSet::Staged];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdSet::Card => "card",
            ThresholdSet::MyPrime => "myprime",
            ThresholdSet::Staged => "staged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "card" => Some(Self::Card),
            "myprime" | "my_prime" => Some(Self::MyPrime),
            "staged" | "fraud" => Some(Self::Staged),
            _ => None,
        }
    }
}

/// One active scalar threshold row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryListEntry {
    pub code: String,
}

/// Risk label for one (dimension A, dimension B) combination, e.g. product x MCC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrixEntry {
    pub dimension_a: String,
    pub dimension_b: String,
    pub risk_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRiskEntry {
    pub country_name: Option<String>,
    pub country_code: Option<String>,
    pub risk_label: String,
}

/// Tunable parameters for one engine rule; absent columns stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleParameterEntry {
    pub rule_code: String,
    pub points: Option<i64>,
    pub threshold1: Option<f64>,
    pub threshold2: Option<f64>,
    pub multiplier1: Option<f64>,
    pub multiplier2: Option<f64>,
}

/// One entry of the scored risk-rule catalogue, highest priority first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRuleEntry {
    pub rule_id: String,
    pub rule_name: String,
    pub rule_description: Option<String>,
    pub risk_score: f64,
    pub severity: String,
}

/// Query contracts for the configuration tables. Every method selects active rows only
/// and returns them in a stable order.
pub trait ConfigStore: Send + Sync {
    fn active_thresholds(
        &self,
        set: ThresholdSet,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ThresholdEntry>, StoreError>;

    fn active_category_codes(&self) -> Result<Vec<CategoryListEntry>, StoreError>;

    /// `dimension_a` narrows the selection to a single product when present.
    fn active_risk_matrix(
        &self,
        dimension_a: Option<&str>,
    ) -> Result<Vec<RiskMatrixEntry>, StoreError>;

    fn active_country_risks(&self) -> Result<Vec<CountryRiskEntry>, StoreError>;

    /// Uncached lookup: exact name/code match first, then a substring match on the name.
    fn lookup_country_risk(&self, identifier: &str) -> Result<Option<String>, StoreError>;

    fn active_rule_parameters(&self) -> Result<Vec<RuleParameterEntry>, StoreError>;

    fn active_risk_rules(&self) -> Result<Vec<RiskRuleEntry>, StoreError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for std::sync::Arc<T> {
    fn active_thresholds(
        &self,
        set: ThresholdSet,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ThresholdEntry>, StoreError> {
        (**self).active_thresholds(set, as_of)
    }

    fn active_category_codes(&self) -> Result<Vec<CategoryListEntry>, StoreError> {
        (**self).active_category_codes()
    }

    fn active_risk_matrix(
        &self,
        dimension_a: Option<&str>,
    ) -> Result<Vec<RiskMatrixEntry>, StoreError> {
        (**self).active_risk_matrix(dimension_a)
    }

    fn active_country_risks(&self) -> Result<Vec<CountryRiskEntry>, StoreError> {
        (**self).active_country_risks()
    }

    fn lookup_country_risk(&self, identifier: &str) -> Result<Option<String>, StoreError> {
        (**self).lookup_country_risk(identifier)
    }

    fn active_rule_parameters(&self) -> Result<Vec<RuleParameterEntry>, StoreError> {
        (**self).active_rule_parameters()
    }

    fn active_risk_rules(&self) -> Result<Vec<RiskRuleEntry>, StoreError> {
        (**self).active_risk_rules()
    }
}

/// Store failures. The message may carry driver detail and must never reach a client.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
