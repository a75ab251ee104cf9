use super::{CacheError, CacheStatus, Clock, Snapshot, TtlCache};
use crate::store::{ConfigStore, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Flat set of active category codes, e.g. merchant categories flagged as suspicious.
pub struct CategoryListCache<S> {
    store: Arc<S>,
    inner: TtlCache<Vec<String>>,
}

impl<S: ConfigStore> CategoryListCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            inner: TtlCache::new("suspicious-mcc", ttl, clock),
        }
    }

    fn load(&self) -> Result<Vec<String>, StoreError> {
        let codes: BTreeSet<String> = self
            .store
            .active_category_codes()?
            .into_iter()
            .map(|entry| entry.code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();
        Ok(codes.into_iter().collect())
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot<Vec<String>>>, CacheError> {
        self.inner.snapshot_with(|| self.load())
    }

    pub fn force_refresh(&self) -> Result<Arc<Snapshot<Vec<String>>>, CacheError> {
        self.inner.force_refresh_with(|| self.load())
    }

    pub fn codes(&self) -> Result<Vec<String>, CacheError> {
        self.snapshot().map(|snapshot| snapshot.data.clone())
    }

    pub fn contains(&self, code: &str) -> Result<bool, CacheError> {
        let code = code.trim();
        Ok(self
            .snapshot()?
            .data
            .binary_search_by(|candidate| candidate.as_str().cmp(code))
            .is_ok())
    }

    pub fn status(&self) -> CacheStatus {
        self.inner.status_with(Vec::len)
    }
}
