use super::{CacheError, CacheStatus, Clock, Snapshot, TtlCache, DEFAULT_RISK_LABEL};
use crate::store::{ConfigStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Alternate spellings rewritten before lookup. Order matters: first match wins.
const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("BURKINA FASSO", "BURKINA FASO"),
    ("THE GAMBIA", "GAMBIA"),
    ("USA", "UNITED STATES"),
    ("UK", "UNITED KINGDOM"),
    ("UAE", "UNITED ARAB EMIRATES"),
];

/// Trims, collapses whitespace, uppercases, then applies the alias table.
///
/// An alias applies when it equals the value or occurs anywhere inside it; the whole
/// value is then replaced by the canonical name.
pub fn normalize_country(raw: &str) -> String {
    let collapsed = collapse(raw);

    for (alias, canonical) in COUNTRY_ALIASES {
        if collapsed.contains(alias) {
            return (*canonical).to_string();
        }
    }
    collapsed
}

/// Stored names are compared in this form, without alias rewriting.
fn collapse(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

#[derive(Debug, Default)]
pub struct CountrySnapshot {
    by_name: HashMap<String, String>,
    by_code: HashMap<String, String>,
    /// Names in store order, for the substring fallback.
    names: Vec<(String, String)>,
}

impl CountrySnapshot {
    fn from_entries(entries: Vec<crate::store::CountryRiskEntry>) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            let label = entry.risk_label.trim().to_string();
            if let Some(name) = entry.country_name.as_deref().map(collapse) {
                if !name.is_empty() {
                    if !snapshot.by_name.contains_key(&name) {
                        snapshot.names.push((name.clone(), label.clone()));
                    }
                    snapshot.by_name.entry(name).or_insert_with(|| label.clone());
                }
            }
            if let Some(code) = entry.country_code.as_deref().map(|c| c.trim().to_uppercase()) {
                if !code.is_empty() {
                    snapshot.by_code.entry(code).or_insert(label);
                }
            }
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.by_name.len() + self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, normalized: &str) -> Option<&str> {
        if let Some(label) = self.by_name.get(normalized).or_else(|| self.by_code.get(normalized)) {
            return Some(label.as_str());
        }
        self.names
            .iter()
            .find(|(name, _)| name.contains(normalized))
            .map(|(_, label)| label.as_str())
    }
}

/// Country name or code to risk label, with exact-then-substring matching.
pub struct CountryRiskResolver<S> {
    store: Arc<S>,
    inner: TtlCache<CountrySnapshot>,
}

impl<S: ConfigStore> CountryRiskResolver<S> {
    pub fn new(store: Arc<S>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            inner: TtlCache::new("country-risk", ttl, clock),
        }
    }

    fn load(&self) -> Result<CountrySnapshot, StoreError> {
        Ok(CountrySnapshot::from_entries(self.store.active_country_risks()?))
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot<CountrySnapshot>>, CacheError> {
        self.inner.snapshot_with(|| self.load())
    }

    pub fn force_refresh(&self) -> Result<Arc<Snapshot<CountrySnapshot>>, CacheError> {
        self.inner.force_refresh_with(|| self.load())
    }

    /// Blank input and unmatched countries resolve to `NORMAL`.
    pub fn resolve(&self, raw: Option<&str>) -> Result<String, CacheError> {
        let normalized = match raw.map(normalize_country) {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(DEFAULT_RISK_LABEL.to_string()),
        };

        let snapshot = self.snapshot()?;
        Ok(snapshot
            .data
            .resolve(&normalized)
            .unwrap_or(DEFAULT_RISK_LABEL)
            .to_string())
    }

    /// Bypasses the cache and asks the store directly.
    pub fn lookup_uncached(&self, raw: &str) -> Result<Option<String>, StoreError> {
        self.store.lookup_country_risk(&normalize_country(raw))
    }

    pub fn status(&self) -> CacheStatus {
        self.inner.status_with(CountrySnapshot::len)
    }
}
