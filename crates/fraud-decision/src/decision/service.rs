use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::assembler::{
    card_context, fraud_action_context, fraud_category_context, myprime_context,
    orchestrated_context, risk_score_context, risk_signals_context, simple_context,
    CardReferenceData,
};
use super::coerce::as_number;
use super::error::DecisionError;
use super::inputs::{
    CardTransaction, MyPrimeTransaction, OrchestratedTransaction, Payload, SimpleTransaction,
    StagedTransaction,
};
use super::labels::LabelDictionary;
use super::naming::{
    CARD_MODEL, FRAUD_ACTION, FRAUD_ACTION_MODEL, FRAUD_CATEGORY, FRAUD_CATEGORY_MODEL,
    MYPRIME_MODEL, MYPRIME_ORCHESTRATED_MODEL, MYPRIME_SIMPLE_MODEL, RISK_SCORE_MODEL,
    RISK_SIGNALS_MODEL, TOTAL_RISK_SCORE, VELOCITY_RISK_SCORE,
};
use super::selfcheck::{myprime_rule_cases, myprime_smoke_cases, simple_smoke_request};
use super::translator::{stage_output, DecisionResponse, ResultTranslator};
use crate::cache::{
    normalize_country, CacheError, CacheStatus, Clock, RefreshReport, ResolvedThreshold,
    RiskRuleView, RuleCatalog, SystemClock, ThresholdMap,
};
use crate::config::CacheConfig;
use crate::gateway::{DecisionContext, DecisionGateway, ModelRef};
use crate::store::{ConfigStore, ThresholdSet};

const ENGINE_LABEL: &str = "Kogito DMN";
const STAGED_MODE: &str = "RULES + ML";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalDecision {
    #[serde(rename = "fraudCategory")]
    pub fraud_category: Value,
    #[serde(rename = "fraudAction")]
    pub fraud_action: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedScores {
    pub velocity_risk_score: f64,
    pub device_risk_score: f64,
    pub beneficiary_risk_score: f64,
    pub auth_risk_score: f64,
    pub merchant_risk_score: f64,
    pub terminal_risk_score: f64,
    pub ml_fraud_score: f64,
    pub total_risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedMeta {
    pub evaluated_at: DateTime<Utc>,
    pub engine: &'static str,
    pub mode: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedDecisionResponse {
    pub transaction_id: Option<String>,
    pub final_decision: FinalDecision,
    pub scores: StagedScores,
    pub meta: StagedMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelHealth {
    pub status: &'static str,
    pub model: &'static str,
    pub namespace: &'static str,
    pub registered: bool,
}

/// Cached versus direct-from-store country resolution, for diagnosing mismatches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryResolution {
    pub input: String,
    pub normalized: String,
    pub cached: String,
    pub direct: Option<String>,
}

/// Outcome of one threshold-driven MyPrime rule case. Reasons are raw engine codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCheck {
    pub rule_name: &'static str,
    pub expected_decision: &'static str,
    pub expected_reason: &'static str,
    pub actual_decision: Value,
    pub actual_reason: Value,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub input: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleVerificationReport {
    pub total_rules_tested: usize,
    pub passed: usize,
    pub failed: usize,
    pub rules: Vec<RuleCheck>,
    pub thresholds_used: ThresholdMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmokeTest {
    pub test_name: &'static str,
    pub input: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DecisionResponse>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmokeReport {
    pub total_tests: usize,
    pub passed: usize,
    pub tests: Vec<SmokeTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdReload {
    pub set: &'static str,
    pub message: &'static str,
    pub threshold_count: usize,
}

/// Threshold and risk-rule cache figures for the MyPrime models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MyPrimeCacheStats {
    pub threshold_count: usize,
    pub rules_count: usize,
    pub last_threshold_refresh: Option<DateTime<Utc>>,
    pub last_rules_refresh: Option<DateTime<Utc>>,
    pub cache_ttl_secs: u64,
    pub refresh_failures: u64,
}

/// Runs decision requests end to end: typed request, reference data, engine call and
/// response translation. All methods block; call them off the async executor.
pub struct DecisionService<S, G> {
    catalog: RuleCatalog<S>,
    gateway: Arc<G>,
}

impl<S, G> DecisionService<S, G>
where
    S: ConfigStore + 'static,
    G: DecisionGateway + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>, cache: &CacheConfig) -> Self {
        Self::with_clock(store, gateway, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        gateway: Arc<G>,
        cache: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog: RuleCatalog::new(store, cache, clock),
            gateway,
        }
    }

    pub fn catalog(&self) -> &RuleCatalog<S> {
        &self.catalog
    }

    fn evaluate(
        &self,
        model: ModelRef,
        context: &DecisionContext,
    ) -> Result<DecisionContext, DecisionError> {
        debug!(model = model.name, inputs = context.len(), "evaluating decision model");
        self.gateway.evaluate(model, context).map_err(|err| {
            warn!(model = model.name, error = %err, "decision model call failed");
            DecisionError::from(err)
        })
    }

    pub fn decide_card(
        &self,
        payload: &Payload,
        debug: bool,
    ) -> Result<DecisionResponse, DecisionError> {
        let txn = CardTransaction::from_payload(payload);
        let reference = CardReferenceData {
            thresholds: self.catalog.card_thresholds.all()?,
            suspicious_mcc: self.catalog.suspicious_mcc.codes()?,
            country_risk: self.catalog.country_risk.resolve(txn.txn_country.as_deref())?,
            product_mcc_risk: self
                .catalog
                .product_mcc_risk
                .resolve(txn.product_code.as_deref(), txn.mcc_group_id.as_deref())?,
        };

        let output = self.evaluate(CARD_MODEL, &card_context(&txn, &reference))?;
        ResultTranslator::plain().translate(CARD_MODEL, output, txn.txn_id, debug)
    }

    pub fn decide_myprime(
        &self,
        payload: &Payload,
        debug: bool,
    ) -> Result<DecisionResponse, DecisionError> {
        let txn = MyPrimeTransaction::from_payload(payload);
        let thresholds = self.catalog.myprime_thresholds.all()?;

        let output = self.evaluate(MYPRIME_MODEL, &myprime_context(&txn, &thresholds))?;
        ResultTranslator::labelled(LabelDictionary::myprime()).translate(
            MYPRIME_MODEL,
            output,
            txn.transaction_id,
            debug,
        )
    }

    pub fn decide_myprime_simple(
        &self,
        payload: &Payload,
        debug: bool,
    ) -> Result<DecisionResponse, DecisionError> {
        let txn = SimpleTransaction::from_payload(payload);

        let output = self.evaluate(MYPRIME_SIMPLE_MODEL, &simple_context(&txn))?;
        ResultTranslator::plain().translate(
            MYPRIME_SIMPLE_MODEL,
            output,
            txn.transaction_id,
            debug,
        )
    }

    pub fn orchestrate_myprime(
        &self,
        payload: &Payload,
        debug: bool,
    ) -> Result<DecisionResponse, DecisionError> {
        let txn = OrchestratedTransaction::from_payload(payload);
        let rules = self.catalog.rule_parameters.parameters()?;

        let output =
            self.evaluate(MYPRIME_ORCHESTRATED_MODEL, &orchestrated_context(&txn, &rules))?;
        ResultTranslator::labelled(LabelDictionary::myprime()).translate(
            MYPRIME_ORCHESTRATED_MODEL,
            output,
            txn.transaction_id,
            debug,
        )
    }

    /// Four chained models: velocity signals, total risk, category, then action.
    pub fn decide_staged(
        &self,
        payload: &Payload,
    ) -> Result<StagedDecisionResponse, DecisionError> {
        let txn = StagedTransaction::from_payload(payload);
        let thresholds = self.catalog.staged_thresholds.all()?;

        let signals = self.evaluate(RISK_SIGNALS_MODEL, &risk_signals_context(&txn))?;
        let velocity = as_number(
            Some(&stage_output(&signals, RISK_SIGNALS_MODEL, VELOCITY_RISK_SCORE)?),
            0.0,
        );

        let score = self.evaluate(RISK_SCORE_MODEL, &risk_score_context(&txn, velocity))?;
        let total = as_number(
            Some(&stage_output(&score, RISK_SCORE_MODEL, TOTAL_RISK_SCORE)?),
            0.0,
        );

        let category = self.evaluate(
            FRAUD_CATEGORY_MODEL,
            &fraud_category_context(total, &thresholds),
        )?;
        let fraud_category = stage_output(&category, FRAUD_CATEGORY_MODEL, FRAUD_CATEGORY)?;

        let action = self.evaluate(FRAUD_ACTION_MODEL, &fraud_action_context(&txn, velocity))?;
        let fraud_action = stage_output(&action, FRAUD_ACTION_MODEL, FRAUD_ACTION)?;

        Ok(StagedDecisionResponse {
            transaction_id: txn.transaction_id.clone(),
            final_decision: FinalDecision {
                fraud_category,
                fraud_action,
            },
            scores: StagedScores {
                velocity_risk_score: velocity,
                device_risk_score: txn.device_risk_score,
                beneficiary_risk_score: txn.beneficiary_risk_score,
                auth_risk_score: txn.auth_risk_score,
                merchant_risk_score: txn.merchant_risk_score,
                terminal_risk_score: txn.terminal_risk_score,
                ml_fraud_score: txn.ml_fraud_score,
                total_risk_score: total,
            },
            meta: StagedMeta {
                evaluated_at: Utc::now(),
                engine: ENGINE_LABEL,
                mode: STAGED_MODE,
            },
        })
    }

    pub fn model_health(&self, model: ModelRef) -> ModelHealth {
        let registered = self.gateway.is_registered(model);
        ModelHealth {
            status: if registered { "UP" } else { "DOWN" },
            model: model.name,
            namespace: model.namespace,
            registered,
        }
    }

    pub fn refresh_all(&self) -> RefreshReport {
        let report = self.catalog.refresh_all();
        info!(
            succeeded = report.all_succeeded(),
            caches = report.caches.len(),
            "configuration caches force refreshed"
        );
        report
    }

    pub fn cache_status(&self) -> Vec<CacheStatus> {
        self.catalog.status()
    }

    pub fn thresholds(&self, set: ThresholdSet) -> Result<ThresholdMap, DecisionError> {
        Ok(self.catalog.thresholds(set).all()?)
    }

    pub fn threshold(
        &self,
        set: ThresholdSet,
        key: &str,
    ) -> Result<ResolvedThreshold, DecisionError> {
        Ok(self.catalog.thresholds(set).resolve(key)?)
    }

    pub fn resolve_country(&self, raw: &str) -> Result<CountryResolution, DecisionError> {
        let cached = self.catalog.country_risk.resolve(Some(raw))?;
        let direct = self.catalog.country_risk.lookup_uncached(raw).map_err(|source| {
            DecisionError::ConfigLoad(CacheError::ConfigLoad {
                cache: "country-risk",
                source,
            })
        })?;
        Ok(CountryResolution {
            input: raw.to_string(),
            normalized: normalize_country(raw),
            cached,
            direct,
        })
    }

    /// Runs every MyPrime rule case against the live model with the thresholds in force
    /// and compares raw decision and reason codes. A failing case does not stop the rest.
    pub fn verify_myprime_rules(&self) -> Result<RuleVerificationReport, DecisionError> {
        let thresholds = self.catalog.myprime_thresholds.all()?;

        let rules: Vec<RuleCheck> = myprime_rule_cases(&thresholds)
            .into_iter()
            .map(|case| {
                let txn = MyPrimeTransaction::from_payload(&case.input);
                let outcome = self
                    .evaluate(MYPRIME_MODEL, &myprime_context(&txn, &thresholds))
                    .and_then(|output| {
                        ResultTranslator::plain().translate(MYPRIME_MODEL, output, None, false)
                    });
                match outcome {
                    Ok(response) => {
                        let passed = response.fraud_decision == case.expected_decision
                            && response.fraud_reason == case.expected_reason;
                        RuleCheck {
                            rule_name: case.name,
                            expected_decision: case.expected_decision,
                            expected_reason: case.expected_reason,
                            actual_decision: response.fraud_decision,
                            actual_reason: response.fraud_reason,
                            passed,
                            error: None,
                            input: case.input,
                        }
                    }
                    Err(err) => RuleCheck {
                        rule_name: case.name,
                        expected_decision: case.expected_decision,
                        expected_reason: case.expected_reason,
                        actual_decision: Value::Null,
                        actual_reason: Value::Null,
                        passed: false,
                        error: Some(err.kind()),
                        input: case.input,
                    },
                }
            })
            .collect();

        let passed = rules.iter().filter(|check| check.passed).count();
        info!(passed, total = rules.len(), "myprime rule verification finished");
        Ok(RuleVerificationReport {
            total_rules_tested: rules.len(),
            passed,
            failed: rules.len() - passed,
            rules,
            thresholds_used: thresholds,
        })
    }

    /// Fixed MyPrime requests through the normal decision path. A test passes when the
    /// model produced a decision.
    pub fn run_myprime_smoke_tests(&self) -> SmokeReport {
        let tests: Vec<SmokeTest> = myprime_smoke_cases()
            .into_iter()
            .map(|(test_name, input)| match self.decide_myprime(&input, false) {
                Ok(result) => SmokeTest {
                    test_name,
                    input,
                    result: Some(result),
                    passed: true,
                    error: None,
                },
                Err(err) => SmokeTest {
                    test_name,
                    input,
                    result: None,
                    passed: false,
                    error: Some(err.kind()),
                },
            })
            .collect();

        SmokeReport {
            total_tests: tests.len(),
            passed: tests.iter().filter(|test| test.passed).count(),
            tests,
        }
    }

    pub fn myprime_simple_self_test(
        &self,
        debug: bool,
    ) -> Result<DecisionResponse, DecisionError> {
        self.decide_myprime_simple(&simple_smoke_request(), debug)
    }

    /// Force-refreshes one threshold set; a failed reload keeps the previous values.
    pub fn reload_thresholds(&self, set: ThresholdSet) -> Result<ThresholdReload, DecisionError> {
        self.catalog.reload_thresholds(set)?;
        let threshold_count = self.catalog.thresholds(set).all()?.len();
        info!(set = set.as_str(), threshold_count, "thresholds reloaded");
        Ok(ThresholdReload {
            set: set.as_str(),
            message: "thresholds reloaded",
            threshold_count,
        })
    }

    pub fn risk_rules(&self) -> RiskRuleView {
        self.catalog.risk_rules.rules()
    }

    pub fn myprime_cache_stats(&self) -> MyPrimeCacheStats {
        let thresholds = self.catalog.myprime_thresholds.status();
        let rules = self.catalog.risk_rules.status();
        MyPrimeCacheStats {
            threshold_count: thresholds.entries,
            rules_count: rules.entries,
            last_threshold_refresh: thresholds.last_refresh,
            last_rules_refresh: rules.last_refresh,
            cache_ttl_secs: thresholds.ttl_secs,
            refresh_failures: thresholds.refresh_failures + rules.refresh_failures,
        }
    }
}
