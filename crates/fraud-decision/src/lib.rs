//! Rule configuration caches and decision-input assembly for the fraud decision engine.
//!
//! Requests arrive as loosely typed JSON, are coerced into typed transactions, enriched
//! with cached rule configuration, evaluated by a decision model and translated back into
//! the client vocabulary.

pub mod cache;
pub mod config;
pub mod decision;
pub mod error;
pub mod gateway;
pub mod store;
pub mod telemetry;

pub use cache::{CacheError, Clock, RuleCatalog, SystemClock};
pub use config::AppConfig;
pub use decision::{decision_router, DecisionError, DecisionService};
pub use error::AppError;
pub use gateway::{DecisionGateway, KogitoGateway, ModelRef, ModelRegistry};
pub use store::{ConfigStore, SqliteConfigStore, StoreError, ThresholdSet};
