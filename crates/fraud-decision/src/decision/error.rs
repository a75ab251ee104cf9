use crate::cache::CacheError;
use crate::gateway::GatewayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

/// Request-level failures of the decision pipeline.
///
/// `Display` carries diagnostic detail for logs; clients only ever see
/// [`DecisionError::kind`] and [`DecisionError::safe_message`].
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    ConfigLoad(#[from] CacheError),
    #[error("decision model {namespace}#{model} is not registered")]
    ModelNotFound {
        namespace: &'static str,
        model: &'static str,
    },
    #[error("decision model {model} failed: {message}")]
    Evaluation {
        model: &'static str,
        message: String,
    },
    #[error("decision model {model} returned no `{key}` output")]
    DecisionMissing {
        model: &'static str,
        key: &'static str,
    },
}

impl DecisionError {
    pub fn kind(&self) -> &'static str {
        match self {
            DecisionError::ConfigLoad(_) => "CONFIG_LOAD_ERROR",
            DecisionError::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            DecisionError::Evaluation { .. } => "EVALUATION_ERROR",
            DecisionError::DecisionMissing { .. } => "DECISION_MISSING",
        }
    }

    pub fn safe_message(&self) -> String {
        match self {
            DecisionError::ConfigLoad(CacheError::ConfigLoad { cache, .. }) => {
                format!("rule configuration `{cache}` is unavailable")
            }
            DecisionError::ModelNotFound { model, .. } => {
                format!("decision model {model} is not available")
            }
            DecisionError::Evaluation { model, .. } => {
                format!("decision model {model} failed to evaluate")
            }
            DecisionError::DecisionMissing { model, .. } => {
                format!("decision model {model} returned no decision")
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DecisionError::ConfigLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for DecisionError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::ModelNotFound { namespace, model } => {
                Self::ModelNotFound { namespace, model }
            }
            GatewayError::Evaluation { model, message } => Self::Evaluation { model, message },
        }
    }
}

impl IntoResponse for DecisionError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.kind(),
            "message": self.safe_message(),
            "timestamp": Utc::now().to_rfc3339(),
        }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn config_load_maps_to_service_unavailable_without_store_detail() {
        let err = DecisionError::from(CacheError::ConfigLoad {
            cache: "country-risk",
            source: StoreError::Unavailable("SELECT * FROM secrets failed".into()),
        });

        assert_eq!(err.kind(), "CONFIG_LOAD_ERROR");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.safe_message().contains("SELECT"));
    }

    #[test]
    fn evaluation_message_is_not_exposed() {
        let err = DecisionError::from(GatewayError::Evaluation {
            model: "MyPrimeDecision",
            message: "amount 987654 out of range".into(),
        });

        assert_eq!(err.kind(), "EVALUATION_ERROR");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.safe_message().contains("987654"));
        assert!(err.safe_message().contains("MyPrimeDecision"));
    }
}
