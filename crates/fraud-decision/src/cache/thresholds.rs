use super::{CacheError, CacheStatus, Clock, Snapshot, TtlCache};
use crate::store::{ConfigStore, ThresholdSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub type ThresholdMap = BTreeMap<String, f64>;

/// Where a resolved threshold value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOrigin {
    Store,
    Default,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedThreshold {
    pub key: String,
    pub value: f64,
    pub origin: ThresholdOrigin,
}

/// Scalar thresholds for one [`ThresholdSet`], backed by a table of documented defaults
/// for keys the store never supplied.
pub struct ThresholdCache<S> {
    store: Arc<S>,
    set: ThresholdSet,
    defaults: &'static [(&'static str, f64)],
    inner: TtlCache<ThresholdMap>,
}

impl<S: ConfigStore> ThresholdCache<S> {
    pub fn new(
        store: Arc<S>,
        set: ThresholdSet,
        defaults: &'static [(&'static str, f64)],
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = match set {
            ThresholdSet::Card => "card-thresholds",
            ThresholdSet::MyPrime => "myprime-thresholds",
            ThresholdSet::Staged => "staged-thresholds",
        };
        Self {
            store,
            set,
            defaults,
            inner: TtlCache::new(name, ttl, clock),
        }
    }

    pub fn set(&self) -> ThresholdSet {
        self.set
    }

    fn load(&self) -> Result<ThresholdMap, crate::store::StoreError> {
        let rows = self.store.active_thresholds(self.set, self.inner.now())?;
        // Rows arrive ordered by key then id, so the last duplicate wins deterministically.
        Ok(rows
            .into_iter()
            .map(|row| (row.key.trim().to_string(), row.value))
            .collect())
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot<ThresholdMap>>, CacheError> {
        self.inner.snapshot_with(|| self.load())
    }

    pub fn force_refresh(&self) -> Result<Arc<Snapshot<ThresholdMap>>, CacheError> {
        self.inner.force_refresh_with(|| self.load())
    }

    pub fn resolve(&self, key: &str) -> Result<ResolvedThreshold, CacheError> {
        let snapshot = self.snapshot()?;
        let resolved = match snapshot.data.get(key) {
            Some(value) => (*value, ThresholdOrigin::Store),
            None => match self.default_for(key) {
                Some(value) => (value, ThresholdOrigin::Default),
                None => (0.0, ThresholdOrigin::Unknown),
            },
        };
        Ok(ResolvedThreshold {
            key: key.to_string(),
            value: resolved.0,
            origin: resolved.1,
        })
    }

    /// Loaded value, else the documented default, else `0.0`.
    pub fn get(&self, key: &str) -> Result<f64, CacheError> {
        self.resolve(key).map(|resolved| resolved.value)
    }

    /// Every loaded threshold plus defaults for the keys that were not loaded.
    pub fn all(&self) -> Result<ThresholdMap, CacheError> {
        let snapshot = self.snapshot()?;
        let mut merged: ThresholdMap = self
            .defaults
            .iter()
            .map(|(key, value)| (key.to_string(), *value))
            .collect();
        merged.extend(snapshot.data.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(merged)
    }

    fn default_for(&self, key: &str) -> Option<f64> {
        self.defaults
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, value)| *value)
    }

    pub fn status(&self) -> CacheStatus {
        self.inner.status_with(|data| data.len())
    }
}
