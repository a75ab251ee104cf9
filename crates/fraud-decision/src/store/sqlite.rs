//! SQLite-backed [`ConfigStore`].

use super::{
    CategoryListEntry, ConfigStore, CountryRiskEntry, RiskMatrixEntry, RiskRuleEntry,
    RuleParameterEntry, StoreError, ThresholdEntry, ThresholdSet,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS fraud_threshold (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    threshold_set TEXT NOT NULL,
    threshold_key TEXT NOT NULL,
    threshold_value REAL,
    is_active INTEGER NOT NULL DEFAULT 1,
    effective_from TEXT,
    effective_to TEXT
);
CREATE INDEX IF NOT EXISTS idx_fraud_threshold_set ON fraud_threshold(threshold_set, is_active);

CREATE TABLE IF NOT EXISTS fraud_mcc_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    mcc_code TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS fraud_mcc_product_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_code TEXT NOT NULL,
    mcc_code TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS fraud_country_block_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    country_name TEXT,
    country_code TEXT,
    decision_level TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS myprime_rule_config (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_code TEXT NOT NULL,
    points INTEGER,
    threshold1 REAL,
    threshold2 REAL,
    multiplier1 REAL,
    multiplier2 REAL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS myprime_risk_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_id TEXT NOT NULL,
    rule_name TEXT NOT NULL,
    rule_description TEXT,
    risk_score REAL NOT NULL DEFAULT 0,
    severity TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);
";

/// Configuration store over a single SQLite connection.
///
/// Timestamps in `fraud_threshold` are stored as UTC text (`YYYY-MM-DD HH:MM:SS`)
/// so window comparisons stay lexicographic.
pub struct SqliteConfigStore {
    conn: Mutex<Connection>,
}

impl SqliteConfigStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.execute_batch(SCHEMA)
    }

    /// Runs raw statements against the store. Used for provisioning and fixtures.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        let conn = self.connection();
        conn.execute_batch(sql)?;
        Ok(())
    }

    fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConfigStore for SqliteConfigStore {
    fn active_thresholds(
        &self,
        set: ThresholdSet,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ThresholdEntry>, StoreError> {
        let conn = self.connection();
        let now = as_of.format(TIMESTAMP_FORMAT).to_string();
        let mut stmt = conn.prepare(
            "SELECT threshold_key, threshold_value FROM fraud_threshold
             WHERE threshold_set = ?1
               AND is_active = 1
               AND threshold_value IS NOT NULL
               AND (effective_from IS NULL OR effective_from <= ?2)
               AND (effective_to IS NULL OR effective_to > ?2)
             ORDER BY threshold_key, id",
        )?;
        let rows = stmt.query_map(params![set.as_str(), now], |row| {
            Ok(ThresholdEntry {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn active_category_codes(&self) -> Result<Vec<CategoryListEntry>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT TRIM(mcc_code) FROM fraud_mcc_rule
             WHERE is_active = 1 AND TRIM(mcc_code) <> ''
             ORDER BY mcc_code, id",
        )?;
        let rows = stmt.query_map([], |row| Ok(CategoryListEntry { code: row.get(0)? }))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn active_risk_matrix(
        &self,
        dimension_a: Option<&str>,
    ) -> Result<Vec<RiskMatrixEntry>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT TRIM(product_code), TRIM(mcc_code), TRIM(risk_level)
             FROM fraud_mcc_product_rule
             WHERE is_active = 1 AND (?1 IS NULL OR TRIM(product_code) = ?1)
             ORDER BY product_code, mcc_code, id",
        )?;
        let rows = stmt.query_map(params![dimension_a.map(str::trim)], |row| {
            Ok(RiskMatrixEntry {
                dimension_a: row.get(0)?,
                dimension_b: row.get(1)?,
                risk_label: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn active_country_risks(&self) -> Result<Vec<CountryRiskEntry>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT country_name, country_code, TRIM(decision_level)
             FROM fraud_country_block_rule
             WHERE is_active = 1
             ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CountryRiskEntry {
                country_name: row.get(0)?,
                country_code: row.get(1)?,
                risk_label: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn lookup_country_risk(&self, identifier: &str) -> Result<Option<String>, StoreError> {
        let needle = identifier.trim().to_uppercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let conn = self.connection();
        let exact = conn
            .query_row(
                "SELECT TRIM(decision_level) FROM fraud_country_block_rule
                 WHERE is_active = 1
                   AND (UPPER(TRIM(country_name)) = ?1 OR UPPER(TRIM(country_code)) = ?1)
                 ORDER BY id LIMIT 1",
                params![needle],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        if exact.is_some() {
            return Ok(exact);
        }

        let partial = conn
            .query_row(
                "SELECT TRIM(decision_level) FROM fraud_country_block_rule
                 WHERE is_active = 1 AND INSTR(UPPER(country_name), ?1) > 0
                 ORDER BY id LIMIT 1",
                params![needle],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(partial)
    }

    fn active_rule_parameters(&self) -> Result<Vec<RuleParameterEntry>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT TRIM(rule_code), points, threshold1, threshold2, multiplier1, multiplier2
             FROM myprime_rule_config
             WHERE is_active = 1
             ORDER BY rule_code, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RuleParameterEntry {
                rule_code: row.get(0)?,
                points: row.get(1)?,
                threshold1: row.get(2)?,
                threshold2: row.get(3)?,
                multiplier1: row.get(4)?,
                multiplier2: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn active_risk_rules(&self) -> Result<Vec<RiskRuleEntry>, StoreError> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            "SELECT TRIM(rule_id), TRIM(rule_name), rule_description, risk_score, TRIM(severity)
             FROM myprime_risk_rules
             WHERE is_active = 1
             ORDER BY priority DESC, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RiskRuleEntry {
                rule_id: row.get(0)?,
                rule_name: row.get(1)?,
                rule_description: row.get(2)?,
                risk_score: row.get(3)?,
                severity: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seeded() -> SqliteConfigStore {
        let store = SqliteConfigStore::in_memory().expect("in-memory store");
        store
            .execute_batch(
                "INSERT INTO fraud_threshold (threshold_set, threshold_key, threshold_value, is_active, effective_from, effective_to) VALUES
                    ('card', 'VELOCITY_5_COUNT', 4, 1, NULL, NULL),
                    ('card', 'ML_FRAUD_THRESHOLD', 0.85, 1, '2026-01-01 00:00:00', NULL),
                    ('card', 'WRONG_PIN_10', 9, 0, NULL, NULL),
                    ('card', 'WRONG_CVV_10', NULL, 1, NULL, NULL),
                    ('card', 'FAILED_TXN_1DAY', 5, 1, NULL, '2026-03-01 00:00:00'),
                    ('myprime', 'LARGE_AMOUNT', 150000, 1, NULL, NULL);
                 INSERT INTO fraud_country_block_rule (country_name, country_code, decision_level, is_active) VALUES
                    ('NORTH KOREA', 'KP', 'BLOCK', 1),
                    ('IRAN', 'IR', 'REVIEW', 1),
                    ('CUBA', 'CU', 'BLOCK', 0);
                 INSERT INTO fraud_mcc_product_rule (product_code, mcc_code, risk_level, is_active) VALUES
                    ('GOLD', '7995', 'HIGH', 1),
                    ('PLATINUM', '7995', 'MEDIUM', 1),
                    ('GOLD', '5411', 'LOW', 0);
                 INSERT INTO myprime_risk_rules (rule_id, rule_name, rule_description, risk_score, severity, priority, is_active) VALUES
                    ('RULE_2', 'NEW_DEVICE_LOGIN', NULL, 10, 'SUSPICIOUS', 5, 1),
                    ('RULE_29', ' ACCOUNT_TAKEOVER_PATTERN ', 'Failed login + new device + large transaction', 55, 'FRAUD', 90, 1),
                    ('RULE_11', 'LARGE_MFS_CASHOUT', NULL, 25, 'FRAUD', 50, 0);",
            )
            .expect("seed rows");
        store
    }

    #[test]
    fn thresholds_respect_activity_and_effective_window() {
        let store = seeded();
        let as_of = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

        let keys: Vec<String> = store
            .active_thresholds(ThresholdSet::Card, as_of)
            .expect("query")
            .into_iter()
            .map(|entry| entry.key)
            .collect();

        assert_eq!(keys, vec!["ML_FRAUD_THRESHOLD", "VELOCITY_5_COUNT"]);
    }

    #[test]
    fn thresholds_before_effective_from_are_excluded() {
        let store = seeded();
        let as_of = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();

        let entries = store
            .active_thresholds(ThresholdSet::Card, as_of)
            .expect("query");

        assert!(entries.iter().all(|entry| entry.key != "ML_FRAUD_THRESHOLD"));
        assert!(entries.iter().any(|entry| entry.key == "FAILED_TXN_1DAY"));
    }

    #[test]
    fn risk_matrix_can_be_narrowed_to_one_product() {
        let store = seeded();

        let gold = store.active_risk_matrix(Some("GOLD")).expect("query");
        assert_eq!(gold.len(), 1);
        assert_eq!(gold[0].risk_label, "HIGH");

        let all = store.active_risk_matrix(None).expect("query");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn country_lookup_prefers_exact_then_partial() {
        let store = seeded();

        assert_eq!(
            store.lookup_country_risk("kp").expect("query").as_deref(),
            Some("BLOCK")
        );
        assert_eq!(
            store.lookup_country_risk("KOREA").expect("query").as_deref(),
            Some("BLOCK")
        );
        assert_eq!(store.lookup_country_risk("CUBA").expect("query"), None);
        assert_eq!(store.lookup_country_risk("   ").expect("query"), None);
    }

    #[test]
    fn risk_rules_are_active_only_and_ordered_by_priority() {
        let store = seeded();

        let rules = store.active_risk_rules().expect("query");

        let ids: Vec<&str> = rules.iter().map(|rule| rule.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["RULE_29", "RULE_2"]);
        assert_eq!(rules[0].rule_name, "ACCOUNT_TAKEOVER_PATTERN");
        assert_eq!(rules[0].risk_score, 55.0);
        assert_eq!(rules[1].rule_description, None);
    }
}
