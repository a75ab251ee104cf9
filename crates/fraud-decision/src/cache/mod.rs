//! TTL-bounded configuration caches.
//!
//! Every cache owns one [`TtlCache`]: readers load the current [`Snapshot`] without
//! locking, and a per-cache mutex admits a single refresh at a time. A failed refresh
//! keeps serving the last good snapshot; only a cache that has never loaded reports
//! [`CacheError::ConfigLoad`].

mod catalog;
mod categories;
mod country;
mod matrix;
mod risk_rules;
mod rules;
mod thresholds;

pub use catalog::{CacheRefreshOutcome, RefreshReport, RuleCatalog};
pub use categories::CategoryListCache;
pub use country::{normalize_country, CountryRiskResolver, CountrySnapshot};
pub use matrix::{MatrixSnapshot, RiskMatrixCache};
pub use risk_rules::{default_risk_rules, RiskRuleCatalogue, RiskRuleSource, RiskRuleView};
pub use rules::{RuleParameterCache, RuleParameters};
pub use thresholds::{ResolvedThreshold, ThresholdCache, ThresholdMap, ThresholdOrigin};

use crate::store::StoreError;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Label every resolver falls back to when nothing matches.
pub const DEFAULT_RISK_LABEL: &str = "NORMAL";

/// Source of "now" for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Immutable view of one cache's data as of its last successful refresh.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: T,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache `{cache}` has no configuration loaded")]
    ConfigLoad {
        cache: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Point-in-time description of a cache for the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub name: &'static str,
    pub entries: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub ttl_secs: u64,
    pub refresh_failures: u64,
}

pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    current: ArcSwapOption<Snapshot<T>>,
    refresh_lock: Mutex<()>,
    attempts: AtomicU64,
    failures: AtomicU64,
}

impl<T> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
            attempts: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current snapshot without triggering a refresh.
    pub fn peek(&self) -> Option<Arc<Snapshot<T>>> {
        self.current.load_full()
    }

    fn is_fresh(&self, snapshot: &Snapshot<T>, now: DateTime<Utc>) -> bool {
        match (now - snapshot.refreshed_at).to_std() {
            Ok(age) => age < self.ttl,
            // clock went backwards
            Err(_) => true,
        }
    }

    /// Returns the current snapshot, refreshing through `load` when it is missing or
    /// older than the TTL.
    pub fn snapshot_with<F>(&self, load: F) -> Result<Arc<Snapshot<T>>, CacheError>
    where
        F: FnOnce() -> Result<T, StoreError>,
    {
        if let Some(snapshot) = self.current.load_full() {
            if self.is_fresh(&snapshot, self.clock.now()) {
                return Ok(snapshot);
            }
        }

        let observed_attempts = self.attempts.load(Ordering::Acquire);
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = self.current.load_full();
        if let Some(snapshot) = &previous {
            // Someone else refreshed (or tried to) while we waited for the lock.
            if self.is_fresh(snapshot, self.clock.now())
                || self.attempts.load(Ordering::Acquire) != observed_attempts
            {
                return Ok(Arc::clone(snapshot));
            }
        }

        let outcome = load();
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(data) => Ok(self.install(data)),
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                match previous {
                    Some(snapshot) => {
                        warn!(
                            cache = self.name,
                            error = %err,
                            last_refresh = %snapshot.refreshed_at,
                            "refresh failed; serving last good snapshot"
                        );
                        Ok(snapshot)
                    }
                    None => {
                        error!(cache = self.name, error = %err, "initial cache load failed");
                        Err(CacheError::ConfigLoad {
                            cache: self.name,
                            source: err,
                        })
                    }
                }
            }
        }
    }

    /// Refreshes regardless of age. The prior snapshot survives a failure.
    pub fn force_refresh_with<F>(&self, load: F) -> Result<Arc<Snapshot<T>>, CacheError>
    where
        F: FnOnce() -> Result<T, StoreError>,
    {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let outcome = load();
        self.attempts.fetch_add(1, Ordering::AcqRel);

        match outcome {
            Ok(data) => {
                info!(cache = self.name, "cache force refreshed");
                Ok(self.install(data))
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(cache = self.name, error = %err, "forced refresh failed");
                Err(CacheError::ConfigLoad {
                    cache: self.name,
                    source: err,
                })
            }
        }
    }

    fn install(&self, data: T) -> Arc<Snapshot<T>> {
        let snapshot = Arc::new(Snapshot {
            data,
            refreshed_at: self.clock.now(),
        });
        self.current.store(Some(Arc::clone(&snapshot)));
        debug!(cache = self.name, "cache refreshed");
        snapshot
    }

    pub fn status_with<F>(&self, count: F) -> CacheStatus
    where
        F: FnOnce(&T) -> usize,
    {
        let current = self.current.load_full();
        CacheStatus {
            name: self.name,
            entries: current.as_ref().map(|s| count(&s.data)).unwrap_or(0),
            last_refresh: current.as_ref().map(|s| s.refreshed_at),
            ttl_secs: self.ttl.as_secs(),
            refresh_failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
