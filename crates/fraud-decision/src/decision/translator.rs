//! Maps raw engine output onto the client-facing response vocabulary.

use super::coerce::{as_number, as_optional_number, as_string};
use super::error::DecisionError;
use super::labels::LabelDictionary;
use crate::gateway::{DecisionContext, ModelRef};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

const FRAUD_DECISION: &str = "fraud_decision";
const FRAUD_REASON: &str = "fraud_reason";
const RULE_RESULTS: &str = "rule_results";
const TOTAL_SCORE: &str = "total_score";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggeredRule {
    pub reason: String,
    pub label: String,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResponse {
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
    pub fraud_decision: Value,
    pub fraud_reason: Value,
    #[serde(rename = "evaluatedAt")]
    pub evaluated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_rules: Option<Vec<TriggeredRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_contribution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DecisionContext>,
}

/// Stateless apart from an optional label dictionary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultTranslator {
    labels: Option<&'static LabelDictionary>,
}

impl ResultTranslator {
    /// Reason codes are returned exactly as the engine produced them.
    pub fn plain() -> Self {
        Self { labels: None }
    }

    pub fn labelled(labels: &'static LabelDictionary) -> Self {
        Self {
            labels: Some(labels),
        }
    }

    fn label(&self, code: &str) -> String {
        match self.labels {
            Some(labels) => labels.label(code).to_string(),
            None => code.to_string(),
        }
    }

    /// Translates the decision the engine stored under the model's own name.
    pub fn translate(
        &self,
        model: ModelRef,
        output: DecisionContext,
        transaction_id: Option<String>,
        debug: bool,
    ) -> Result<DecisionResponse, DecisionError> {
        let decision = decision_object(&output, model, model.name)?;

        let fraud_reason = match decision.get(FRAUD_REASON) {
            Some(Value::String(code)) => Value::String(self.label(code)),
            Some(other) => other.clone(),
            None => Value::Null,
        };

        let (triggered_rules, total_contribution) = match decision.get(RULE_RESULTS) {
            Some(Value::Array(results)) => {
                let (triggered, total) = self.triggered_rules(results);
                if let Some(reported) = as_optional_number(decision.get(TOTAL_SCORE)) {
                    if (reported - total).abs() > f64::EPSILON {
                        warn!(
                            model = model.name,
                            reported,
                            computed = total,
                            "engine total score disagrees with rule contributions"
                        );
                    }
                }
                (Some(triggered), Some(total))
            }
            _ => (None, None),
        };

        let fraud_decision = decision.get(FRAUD_DECISION).cloned().unwrap_or(Value::Null);

        Ok(DecisionResponse {
            transaction_id,
            fraud_decision,
            fraud_reason,
            evaluated_at: Utc::now(),
            triggered_rules,
            total_contribution,
            debug: debug.then_some(output),
        })
    }

    /// Rules with a strictly positive contribution, in engine order, plus the sum of
    /// every contribution.
    pub fn triggered_rules(&self, results: &[Value]) -> (Vec<TriggeredRule>, f64) {
        let mut total = 0.0;
        let mut triggered = Vec::new();
        for result in results {
            let contribution = as_number(result.get("contribution"), 0.0);
            total += contribution;
            if contribution > 0.0 {
                let reason = as_string(result.get("reason")).unwrap_or_default();
                triggered.push(TriggeredRule {
                    label: self.label(&reason),
                    reason,
                    contribution,
                });
            }
        }
        (triggered, total)
    }
}

/// The object the engine stored under `key`. Anything else breaks the model contract.
pub fn decision_object<'a>(
    output: &'a DecisionContext,
    model: ModelRef,
    key: &'static str,
) -> Result<&'a Map<String, Value>, DecisionError> {
    match output.get(key) {
        Some(Value::Object(decision)) => Ok(decision),
        _ => Err(missing(model, key)),
    }
}

/// A non-null scalar output stored under `key`.
pub fn stage_output(
    output: &DecisionContext,
    model: ModelRef,
    key: &'static str,
) -> Result<Value, DecisionError> {
    match output.get(key) {
        Some(Value::Null) | None => Err(missing(model, key)),
        Some(value) => Ok(value.clone()),
    }
}

fn missing(model: ModelRef, key: &'static str) -> DecisionError {
    error!(model = model.name, key, "decision engine returned no decision output");
    DecisionError::DecisionMissing {
        model: model.name,
        key,
    }
}
