//! Decision pipeline: typed requests, input assembly, engine calls and translation.

mod assembler;
pub mod coerce;
mod error;
pub mod inputs;
mod labels;
pub mod naming;
mod router;
pub mod selfcheck;
mod service;
mod translator;

#[cfg(test)]
mod tests;

pub use assembler::{
    card_context, fraud_action_context, fraud_category_context, login_hour_bd, max_present,
    merge_thresholds, myprime_context, orchestrated_context, risk_score_context,
    risk_signals_context, simple_context, CardReferenceData,
};
pub use error::DecisionError;
pub use inputs::{
    CardTransaction, MyPrimeTransaction, OrchestratedTransaction, Payload, SimpleTransaction,
    StagedTransaction,
};
pub use labels::LabelDictionary;
pub use router::decision_router;
pub use service::{
    CountryResolution, DecisionService, FinalDecision, ModelHealth, MyPrimeCacheStats,
    RuleCheck, RuleVerificationReport, SmokeReport, SmokeTest, StagedDecisionResponse,
    StagedMeta, StagedScores, ThresholdReload,
};
pub use translator::{
    decision_object, stage_output, DecisionResponse, ResultTranslator, TriggeredRule,
};
