//! Errores específicos del core.
//!
//! Tres familias, según quién debe reaccionar:
//! - `GraphValidationError`: plantilla mal formada. Bloquea la publicación y
//!   se muestra en el editor; nunca se repara en silencio.
//! - `EvaluationError`: ninguna rama aplica. Recuperable, el operador debe
//!   elegir un destino manual.
//! - `TransitionError`: transición inválida sobre una instancia, normalmente
//!   por estado de cliente desactualizado.
//!
//! Undo/redo en los bordes del historial NO son errores.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{StepId, StepStatus};

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum GraphValidationError {
    #[error("template has no start step")] MissingStartStep,
    #[error("start step '{0}' does not exist")] UnknownStartStep(StepId),
    #[error("step '{step_id}' branches to unknown step '{target}'")]
    DanglingBranchTarget { step_id: StepId, target: StepId },
    #[error("step '{0}' already exists")] DuplicateStepId(StepId),
    #[error("unknown step '{0}'")] UnknownStep(StepId),
    #[error("step '{step_id}' has no branch at index {index}")]
    UnknownBranch { step_id: StepId, index: usize },
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum EvaluationError {
    #[error("no applicable branch for step '{step_id}'")] NoApplicableBranch { step_id: StepId },
    #[error("unknown step '{0}'")] UnknownStep(StepId),
}

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum TransitionError {
    #[error("cannot {action} step '{step_id}' while {status}")]
    InvalidTransition { step_id: StepId, status: StepStatus, action: String },
    #[error("step '{step_id}' is not the current step (current: {current:?})")]
    NotCurrentStep { step_id: StepId, current: Option<StepId> },
    #[error("instance has no current step")] NoCurrentStep,
    #[error("workflow already completed")] WorkflowCompleted,
    #[error("'{target}' is not a branch target of step '{step_id}'")]
    InvalidOverrideTarget { step_id: StepId, target: StepId },
    #[error("template is not published")] TemplateNotPublished,
    #[error("instance pinned to template {expected} but got {found}")]
    TemplateVersionMismatch { expected: String, found: String },
}

/// Error agregado devuelto por las operaciones compuestas del motor.
#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error(transparent)] Graph(#[from] GraphValidationError),
    #[error(transparent)] Evaluation(#[from] EvaluationError),
    #[error(transparent)] Transition(#[from] TransitionError),
}

impl CoreEngineError {
    /// `true` cuando el llamador puede recuperarse sin corregir la plantilla
    /// (pedir override o refrescar el estado de la instancia).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Evaluation(EvaluationError::NoApplicableBranch { .. }) | Self::Transition(_))
    }
}
