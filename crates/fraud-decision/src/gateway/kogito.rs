use super::{DecisionContext, DecisionGateway, GatewayError, ModelRef};
use crate::config::EngineConfig;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Remote gateway for a Kogito-style DMN runtime exposing `POST {base}/{model}`.
///
/// The client is blocking; build and call it from a blocking context.
pub struct KogitoGateway {
    client: Client,
    base_url: String,
    models: HashSet<ModelRef>,
}

impl KogitoGateway {
    pub fn new<I>(config: &EngineConfig, models: I) -> Result<Self, reqwest::Error>
    where
        I: IntoIterator<Item = ModelRef>,
    {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            models: models.into_iter().collect(),
        })
    }

    fn endpoint(&self, model: ModelRef) -> String {
        format!("{}/{}", self.base_url, model.name)
    }
}

impl DecisionGateway for KogitoGateway {
    fn evaluate(
        &self,
        model: ModelRef,
        context: &DecisionContext,
    ) -> Result<DecisionContext, GatewayError> {
        let not_found = GatewayError::ModelNotFound {
            namespace: model.namespace,
            model: model.name,
        };
        if !self.models.contains(&model) {
            return Err(not_found);
        }

        let evaluation_error = |message: String| {
            warn!(model = model.name, error = %message, "decision engine call failed");
            GatewayError::Evaluation {
                model: model.name,
                message,
            }
        };

        debug!(model = model.name, inputs = context.len(), "calling decision engine");
        let response = self
            .client
            .post(self.endpoint(model))
            .json(context)
            .send()
            .map_err(|err| evaluation_error(err.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(not_found);
        }
        if !status.is_success() {
            return Err(evaluation_error(format!("engine responded with {status}")));
        }

        match response
            .json::<Value>()
            .map_err(|err| evaluation_error(err.without_url().to_string()))?
        {
            Value::Object(output) => Ok(output),
            _ => Err(evaluation_error("engine returned a non-object body".into())),
        }
    }

    fn is_registered(&self, model: ModelRef) -> bool {
        self.models.contains(&model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KNOWN: ModelRef = ModelRef::new("urn:test", "Known");
    const UNKNOWN: ModelRef = ModelRef::new("urn:test", "Unknown");

    fn gateway(base_url: &str) -> KogitoGateway {
        let config = EngineConfig {
            base_url: base_url.to_string(),
            timeout: Duration::from_millis(500),
        };
        KogitoGateway::new(&config, [KNOWN]).expect("client")
    }

    #[test]
    fn only_configured_models_are_registered() {
        let gateway = gateway("http://127.0.0.1:9/");

        assert!(gateway.is_registered(KNOWN));
        assert!(!gateway.is_registered(UNKNOWN));
        assert_eq!(gateway.endpoint(KNOWN), "http://127.0.0.1:9/Known");
    }

    #[test]
    fn unconfigured_model_fails_without_a_network_call() {
        let gateway = gateway("http://127.0.0.1:9");

        let err = gateway
            .evaluate(UNKNOWN, &DecisionContext::new())
            .expect_err("unknown model");

        assert!(matches!(err, GatewayError::ModelNotFound { model: "Unknown", .. }));
    }

    #[test]
    fn unreachable_engine_is_an_evaluation_error() {
        let gateway = gateway("http://127.0.0.1:9");

        let err = gateway
            .evaluate(KNOWN, &DecisionContext::new())
            .expect_err("nothing listens on the discard port");

        assert!(matches!(err, GatewayError::Evaluation { model: "Known", .. }));
    }
}
