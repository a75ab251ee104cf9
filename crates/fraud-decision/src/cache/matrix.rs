use super::{CacheError, CacheStatus, Clock, Snapshot, TtlCache, DEFAULT_RISK_LABEL};
use crate::store::{ConfigStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// dimension A -> dimension B -> risk label
pub type MatrixSnapshot = HashMap<String, HashMap<String, String>>;

/// Two-level risk lookup, used for product x merchant category combinations.
pub struct RiskMatrixCache<S> {
    store: Arc<S>,
    inner: TtlCache<MatrixSnapshot>,
}

impl<S: ConfigStore> RiskMatrixCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            inner: TtlCache::new("product-mcc-risk", ttl, clock),
        }
    }

    fn load(&self) -> Result<MatrixSnapshot, StoreError> {
        let mut matrix = MatrixSnapshot::new();
        for entry in self.store.active_risk_matrix(None)? {
            matrix
                .entry(entry.dimension_a.trim().to_string())
                .or_default()
                .insert(
                    entry.dimension_b.trim().to_string(),
                    entry.risk_label.trim().to_string(),
                );
        }
        Ok(matrix)
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot<MatrixSnapshot>>, CacheError> {
        self.inner.snapshot_with(|| self.load())
    }

    pub fn force_refresh(&self) -> Result<Arc<Snapshot<MatrixSnapshot>>, CacheError> {
        self.inner.force_refresh_with(|| self.load())
    }

    /// Risk label for the pair, `NORMAL` when either side is blank or unknown.
    /// Blank input never touches the cache.
    pub fn resolve(
        &self,
        dimension_a: Option<&str>,
        dimension_b: Option<&str>,
    ) -> Result<String, CacheError> {
        let (a, b) = match (non_blank(dimension_a), non_blank(dimension_b)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(DEFAULT_RISK_LABEL.to_string()),
        };

        let snapshot = self.snapshot()?;
        Ok(snapshot
            .data
            .get(a)
            .and_then(|row| row.get(b))
            .cloned()
            .unwrap_or_else(|| DEFAULT_RISK_LABEL.to_string()))
    }

    pub fn status(&self) -> CacheStatus {
        self.inner
            .status_with(|matrix| matrix.values().map(HashMap::len).sum())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::store::{
        CategoryListEntry, CountryRiskEntry, RiskMatrixEntry, RiskRuleEntry, RuleParameterEntry,
        ThresholdEntry, ThresholdSet,
    };
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingStore {
        loads: AtomicUsize,
    }

    impl ConfigStore for CountingStore {
        fn active_thresholds(
            &self,
            _set: ThresholdSet,
            _as_of: DateTime<Utc>,
        ) -> Result<Vec<ThresholdEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn active_category_codes(&self) -> Result<Vec<CategoryListEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn active_risk_matrix(
            &self,
            _dimension_a: Option<&str>,
        ) -> Result<Vec<RiskMatrixEntry>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RiskMatrixEntry {
                dimension_a: "P1".into(),
                dimension_b: "M1".into(),
                risk_label: "HIGH".into(),
            }])
        }

        fn active_country_risks(&self) -> Result<Vec<CountryRiskEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn lookup_country_risk(&self, _identifier: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn active_rule_parameters(&self) -> Result<Vec<RuleParameterEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn active_risk_rules(&self) -> Result<Vec<RiskRuleEntry>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn matrix() -> (Arc<CountingStore>, RiskMatrixCache<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = RiskMatrixCache::new(Arc::clone(&store), Duration::from_secs(300), clock);
        (store, cache)
    }

    #[test]
    fn blank_dimensions_resolve_without_loading() {
        let (store, cache) = matrix();

        assert_eq!(cache.resolve(None, Some("M1")).expect("label"), "NORMAL");
        assert_eq!(cache.resolve(Some("  "), Some("M1")).expect("label"), "NORMAL");
        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn misses_at_either_level_resolve_to_normal() {
        let (_, cache) = matrix();

        assert_eq!(cache.resolve(Some("P1"), Some("M1")).expect("label"), "HIGH");
        assert_eq!(cache.resolve(Some("P1"), Some("M9")).expect("label"), "NORMAL");
        assert_eq!(cache.resolve(Some("P2"), Some("M1")).expect("label"), "NORMAL");
        assert_eq!(cache.status().entries, 1);
    }
}
