use super::{CacheError, CacheStatus, Clock, Snapshot, TtlCache};
use crate::store::{ConfigStore, RuleParameterEntry, StoreError};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// rule code -> parameter object, shaped the way the orchestrated model reads `RULES`.
pub type RuleParameters = Map<String, Value>;

const GLOBAL_RULE: &str = "GLOBAL";

/// Per-rule points, thresholds and multipliers for the orchestrated model.
pub struct RuleParameterCache<S> {
    store: Arc<S>,
    inner: TtlCache<RuleParameters>,
}

impl<S: ConfigStore> RuleParameterCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            inner: TtlCache::new("rule-parameters", ttl, clock),
        }
    }

    fn load(&self) -> Result<RuleParameters, StoreError> {
        let mut rules = RuleParameters::new();
        for entry in self.store.active_rule_parameters()? {
            let code = entry.rule_code.trim();
            if code.is_empty() {
                continue;
            }
            if code.eq_ignore_ascii_case(GLOBAL_RULE) {
                rules.insert(GLOBAL_RULE.to_string(), global_parameters(&entry));
            } else {
                rules.insert(code.to_string(), rule_parameters(&entry));
            }
        }
        Ok(rules)
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot<RuleParameters>>, CacheError> {
        self.inner.snapshot_with(|| self.load())
    }

    pub fn force_refresh(&self) -> Result<Arc<Snapshot<RuleParameters>>, CacheError> {
        self.inner.force_refresh_with(|| self.load())
    }

    pub fn parameters(&self) -> Result<RuleParameters, CacheError> {
        self.snapshot().map(|snapshot| snapshot.data.clone())
    }

    pub fn status(&self) -> CacheStatus {
        self.inner.status_with(Map::len)
    }
}

fn rule_parameters(entry: &RuleParameterEntry) -> Value {
    let mut params = Map::new();
    if let Some(points) = entry.points {
        params.insert("points".into(), json!(points));
    }
    let optional = [
        ("threshold1", entry.threshold1),
        ("threshold2", entry.threshold2),
        ("multiplier1", entry.multiplier1),
        ("multiplier2", entry.multiplier2),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            params.insert(key.into(), json!(value));
        }
    }
    Value::Object(params)
}

fn global_parameters(entry: &RuleParameterEntry) -> Value {
    json!({
        "fraud_score": entry.threshold1,
        "susp_score": entry.threshold2,
        "ml_fraud": entry.multiplier1,
        "ml_susp": entry.multiplier2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use crate::store::SqliteConfigStore;

    #[test]
    fn global_row_is_reshaped_and_absent_columns_are_omitted() {
        let store = SqliteConfigStore::in_memory().expect("store");
        store
            .execute_batch(
                "INSERT INTO myprime_rule_config (rule_code, points, threshold1, threshold2, multiplier1, multiplier2, is_active) VALUES
                    ('global', NULL, 70, 40, 0.8, NULL, 1),
                    ('LARGE_AMOUNT', 15, 100000, NULL, NULL, NULL, 1),
                    ('NEW_DEVICE', 10, NULL, NULL, NULL, NULL, 0);",
            )
            .expect("seed");
        let cache =
            RuleParameterCache::new(Arc::new(store), Duration::from_secs(300), Arc::new(SystemClock));

        let rules = cache.parameters().expect("rules");

        assert_eq!(
            rules.get("GLOBAL"),
            Some(&json!({ "fraud_score": 70.0, "susp_score": 40.0, "ml_fraud": 0.8, "ml_susp": null }))
        );
        assert_eq!(
            rules.get("LARGE_AMOUNT"),
            Some(&json!({ "points": 15, "threshold1": 100000.0 }))
        );
        assert!(!rules.contains_key("NEW_DEVICE"));
    }
}
