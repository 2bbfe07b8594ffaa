use careflow_core::{CoreEngineError, GraphValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Error interno: {0}")]
    Internal(String),
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Error del motor: {0}")]
    Engine(#[from] CoreEngineError),
    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<GraphValidationError> for CoreError {
    fn from(err: GraphValidationError) -> Self {
        CoreError::Engine(err.into())
    }
}
