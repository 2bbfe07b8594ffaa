use thiserror::Error;

use super::CoreError;

/// Errores del dominio de la aplicación
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entidad no encontrada: {0}")]
    NotFound(String),
    #[error("Validación fallida: {0}")]
    Validation(String),
}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        CoreError::Internal(err.to_string())
    }
}
