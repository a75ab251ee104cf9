use super::{DecisionContext, DecisionGateway, GatewayError, ModelRef};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// A model that can be evaluated in process.
pub trait DecisionModel: Send + Sync {
    fn evaluate(&self, context: &DecisionContext) -> Result<DecisionContext, String>;
}

impl<F> DecisionModel for F
where
    F: Fn(&DecisionContext) -> Result<DecisionContext, String> + Send + Sync,
{
    fn evaluate(&self, context: &DecisionContext) -> Result<DecisionContext, String> {
        self(context)
    }
}

/// In-process gateway holding models by (namespace, name).
#[derive(Default, Clone)]
pub struct ModelRegistry {
    models: Arc<RwLock<HashMap<ModelRef, Arc<dyn DecisionModel>>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M>(&self, model: ModelRef, implementation: M)
    where
        M: DecisionModel + 'static,
    {
        let mut models = self
            .models
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        models.insert(model, Arc::new(implementation));
    }

    /// Builder-style registration for fixtures.
    pub fn with<M>(self, model: ModelRef, implementation: M) -> Self
    where
        M: DecisionModel + 'static,
    {
        self.register(model, implementation);
        self
    }

    fn lookup(&self, model: ModelRef) -> Option<Arc<dyn DecisionModel>> {
        let models = self
            .models
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        models.get(&model).cloned()
    }
}

impl DecisionGateway for ModelRegistry {
    fn evaluate(
        &self,
        model: ModelRef,
        context: &DecisionContext,
    ) -> Result<DecisionContext, GatewayError> {
        let implementation = self.lookup(model).ok_or(GatewayError::ModelNotFound {
            namespace: model.namespace,
            model: model.name,
        })?;

        implementation.evaluate(context).map_err(|message| {
            warn!(model = model.name, error = %message, "decision model evaluation failed");
            GatewayError::Evaluation {
                model: model.name,
                message,
            }
        })
    }

    fn is_registered(&self, model: ModelRef) -> bool {
        self.lookup(model).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ECHO: ModelRef = ModelRef::new("urn:test", "Echo");

    fn echo(context: &DecisionContext) -> Result<DecisionContext, String> {
        Ok(context.clone())
    }

    #[test]
    fn unregistered_model_is_not_found() {
        let registry = ModelRegistry::new();

        let err = registry
            .evaluate(ECHO, &DecisionContext::new())
            .expect_err("empty registry");

        assert_eq!(
            err,
            GatewayError::ModelNotFound {
                namespace: "urn:test",
                model: "Echo"
            }
        );
        assert!(!registry.is_registered(ECHO));
    }

    #[test]
    fn namespace_is_part_of_the_key() {
        let registry = ModelRegistry::new().with(ECHO, echo);
        let other = ModelRef::new("urn:other", "Echo");

        assert!(registry.is_registered(ECHO));
        assert!(!registry.is_registered(other));
    }

    #[test]
    fn model_failures_become_evaluation_errors() {
        let registry = ModelRegistry::new().with(ECHO, |_: &DecisionContext| {
            Err::<DecisionContext, String>("division by zero".into())
        });

        let err = registry
            .evaluate(ECHO, &DecisionContext::new())
            .expect_err("model failure");

        assert!(matches!(err, GatewayError::Evaluation { model: "Echo", .. }));
    }

    #[test]
    fn registered_model_evaluates() {
        let registry = ModelRegistry::new().with(ECHO, echo);
        let mut context = DecisionContext::new();
        context.insert("x".into(), json!(1));

        assert_eq!(registry.evaluate(ECHO, &context).expect("echo"), context);
    }
}
