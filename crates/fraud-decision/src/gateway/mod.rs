//! Boundary to the decision engine.

mod kogito;
mod registry;

pub use kogito::KogitoGateway;
pub use registry::{DecisionModel, ModelRegistry};

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Named values exchanged with the engine. Keys are case-sensitive model input/output names.
pub type DecisionContext = Map<String, Value>;

/// Identifies a model by namespace and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelRef {
    pub namespace: &'static str,
    pub name: &'static str,
}

impl ModelRef {
    pub const fn new(namespace: &'static str, name: &'static str) -> Self {
        Self { namespace, name }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("no decision model registered for {namespace}#{model}")]
    ModelNotFound {
        namespace: &'static str,
        model: &'static str,
    },
    #[error("evaluation of {model} failed: {message}")]
    Evaluation {
        model: &'static str,
        message: String,
    },
}

/// Invokes one named model with an assembled context and returns its output context.
pub trait DecisionGateway: Send + Sync {
    fn evaluate(
        &self,
        model: ModelRef,
        context: &DecisionContext,
    ) -> Result<DecisionContext, GatewayError>;

    fn is_registered(&self, model: ModelRef) -> bool;
}

impl<T: DecisionGateway + ?Sized> DecisionGateway for std::sync::Arc<T> {
    fn evaluate(
        &self,
        model: ModelRef,
        context: &DecisionContext,
    ) -> Result<DecisionContext, GatewayError> {
        (**self).evaluate(model, context)
    }

    fn is_registered(&self, model: ModelRef) -> bool {
        (**self).is_registered(model)
    }
}
