use super::{
    CacheError, CacheStatus, CategoryListCache, Clock, CountryRiskResolver, RiskMatrixCache,
    RiskRuleCatalogue, RuleParameterCache, ThresholdCache,
};
use crate::config::CacheConfig;
use crate::decision::naming::{
    CARD_THRESHOLD_DEFAULTS, MYPRIME_THRESHOLD_DEFAULTS, STAGED_THRESHOLD_DEFAULTS,
};
use crate::store::{ConfigStore, ThresholdSet};
use serde::Serialize;
use std::sync::Arc;

/// Result of force-refreshing one cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheRefreshOutcome {
    pub cache: &'static str,
    pub refreshed: bool,
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub caches: Vec<CacheRefreshOutcome>,
}

impl RefreshReport {
    pub fn all_succeeded(&self) -> bool {
        self.caches.iter().all(|outcome| outcome.refreshed)
    }
}

/// Every configuration cache the decision models read, sharing one store and TTL.
pub struct RuleCatalog<S> {
    pub card_thresholds: ThresholdCache<S>,
    pub myprime_thresholds: ThresholdCache<S>,
    pub staged_thresholds: ThresholdCache<S>,
    pub suspicious_mcc: CategoryListCache<S>,
    pub product_mcc_risk: RiskMatrixCache<S>,
    pub country_risk: CountryRiskResolver<S>,
    pub rule_parameters: RuleParameterCache<S>,
    pub risk_rules: RiskRuleCatalogue<S>,
}

impl<S: ConfigStore> RuleCatalog<S> {
    pub fn new(store: Arc<S>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let ttl = config.ttl;
        Self {
            card_thresholds: ThresholdCache::new(
                Arc::clone(&store),
                ThresholdSet::Card,
                CARD_THRESHOLD_DEFAULTS,
                ttl,
                Arc::clone(&clock),
            ),
            myprime_thresholds: ThresholdCache::new(
                Arc::clone(&store),
                ThresholdSet::MyPrime,
                MYPRIME_THRESHOLD_DEFAULTS,
                ttl,
                Arc::clone(&clock),
            ),
            staged_thresholds: ThresholdCache::new(
                Arc::clone(&store),
                ThresholdSet::Staged,
                STAGED_THRESHOLD_DEFAULTS,
                ttl,
                Arc::clone(&clock),
            ),
            suspicious_mcc: CategoryListCache::new(Arc::clone(&store), ttl, Arc::clone(&clock)),
            product_mcc_risk: RiskMatrixCache::new(Arc::clone(&store), ttl, Arc::clone(&clock)),
            country_risk: CountryRiskResolver::new(Arc::clone(&store), ttl, Arc::clone(&clock)),
            rule_parameters: RuleParameterCache::new(Arc::clone(&store), ttl, Arc::clone(&clock)),
            risk_rules: RiskRuleCatalogue::new(store, ttl, clock),
        }
    }

    pub fn thresholds(&self, set: ThresholdSet) -> &ThresholdCache<S> {
        match set {
            ThresholdSet::Card => &self.card_thresholds,
            ThresholdSet::MyPrime => &self.myprime_thresholds,
            ThresholdSet::Staged => &self.staged_thresholds,
        }
    }

    /// Force-refreshes one threshold set only.
    pub fn reload_thresholds(&self, set: ThresholdSet) -> Result<usize, CacheError> {
        self.thresholds(set).force_refresh().map(|snapshot| snapshot.data.len())
    }

    /// Force-refreshes every cache. A failing cache keeps its previous snapshot and does
    /// not stop the others.
    pub fn refresh_all(&self) -> RefreshReport {
        let caches = vec![
            outcome(
                self.card_thresholds.force_refresh().map(|s| s.data.len()),
                self.card_thresholds.status(),
            ),
            outcome(
                self.myprime_thresholds.force_refresh().map(|s| s.data.len()),
                self.myprime_thresholds.status(),
            ),
            outcome(
                self.staged_thresholds.force_refresh().map(|s| s.data.len()),
                self.staged_thresholds.status(),
            ),
            outcome(
                self.suspicious_mcc.force_refresh().map(|s| s.data.len()),
                self.suspicious_mcc.status(),
            ),
            outcome(
                self.product_mcc_risk
                    .force_refresh()
                    .map(|s| s.data.values().map(|row| row.len()).sum::<usize>()),
                self.product_mcc_risk.status(),
            ),
            outcome(
                self.country_risk.force_refresh().map(|s| s.data.len()),
                self.country_risk.status(),
            ),
            outcome(
                self.rule_parameters.force_refresh().map(|s| s.data.len()),
                self.rule_parameters.status(),
            ),
            outcome(
                self.risk_rules.force_refresh().map(|s| s.data.len()),
                self.risk_rules.status(),
            ),
        ];
        RefreshReport { caches }
    }

    pub fn status(&self) -> Vec<CacheStatus> {
        vec![
            self.card_thresholds.status(),
            self.myprime_thresholds.status(),
            self.staged_thresholds.status(),
            self.suspicious_mcc.status(),
            self.product_mcc_risk.status(),
            self.country_risk.status(),
            self.rule_parameters.status(),
            self.risk_rules.status(),
        ]
    }
}

fn outcome(result: Result<usize, CacheError>, status: CacheStatus) -> CacheRefreshOutcome {
    match result {
        Ok(entries) => CacheRefreshOutcome {
            cache: status.name,
            refreshed: true,
            entries,
            error: None,
        },
        Err(CacheError::ConfigLoad { .. }) => CacheRefreshOutcome {
            cache: status.name,
            refreshed: false,
            entries: status.entries,
            error: Some(if status.last_refresh.is_some() {
                "refresh failed; previous snapshot retained".to_string()
            } else {
                "refresh failed; no snapshot loaded".to_string()
            }),
        },
    }
}
