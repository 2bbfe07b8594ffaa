//! Estado de una instancia: el recorrido de un paciente por una versión de
//! plantilla.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StepId, WorkflowTemplate};
use crate::errors::{GraphValidationError, TransitionError};

/// Estado de un step dentro de una instancia.
///
/// Las transiciones válidas son:
/// - `NotStarted` -> `InProgress` (start)
/// - `InProgress` -> `Completed` (complete)
///
/// No se permiten reversiones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
                        Self::NotStarted => "not_started",
                        Self::InProgress => "in_progress",
                        Self::Completed => "completed",
                    })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Active,
    WorkflowCompleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStep {
    pub id: StepId,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl InstanceStep {
    pub fn pending(id: impl Into<StepId>) -> Self {
        Self { id: id.into(),
               status: StepStatus::NotStarted,
               started_at: None,
               completed_at: None }
    }
}

/// Referencia fijada a la versión publicada sobre la que se inscribió la instancia.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
    pub template_id: Uuid,
    pub version: u32,
    pub definition_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDetails {
    pub id: Uuid,
    pub template: TemplateRef,
    pub steps: Vec<InstanceStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<StepId>,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl InstanceDetails {
    /// Inscribe un paciente en la versión publicada de `template`. El step
    /// inicial queda como actual, sin comenzar.
    pub fn enroll(template: &WorkflowTemplate) -> Result<Self, crate::errors::CoreEngineError> {
        let published = template.published.as_ref().ok_or(TransitionError::TemplateNotPublished)?;
        let start = template.graph.start_step_id().ok_or(GraphValidationError::MissingStartStep)?;
        Ok(Self { id: Uuid::new_v4(),
                  template: TemplateRef { template_id: template.id,
                                          version: published.version,
                                          definition_hash: published.definition_hash.clone() },
                  steps: vec![InstanceStep::pending(start.clone())],
                  current_step_id: Some(start.clone()),
                  status: InstanceStatus::Active,
                  completed_at: None })
    }

    pub fn step(&self, id: &str) -> Option<&InstanceStep> {
        self.steps.iter().find(|s| s.id.as_str() == id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut InstanceStep> {
        self.steps.iter_mut().find(|s| s.id.as_str() == id)
    }

    /// Devuelve la entrada del step, creándola (`NotStarted`) si no existe.
    pub(crate) fn step_entry(&mut self, id: &StepId) -> &mut InstanceStep {
        let pos = match self.steps.iter().position(|s| &s.id == id) {
            Some(pos) => pos,
            None => {
                self.steps.push(InstanceStep::pending(id.clone()));
                self.steps.len() - 1
            }
        };
        &mut self.steps[pos]
    }

    pub fn status_of(&self, id: &str) -> StepStatus {
        self.step(id).map(|s| s.status).unwrap_or(StepStatus::NotStarted)
    }

    pub fn is_completed(&self) -> bool {
        self.status == InstanceStatus::WorkflowCompleted
    }

    /// `true` cuando algún step ya salió de `NotStarted`.
    pub fn has_started(&self) -> bool {
        self.steps.iter().any(|s| s.status != StepStatus::NotStarted)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Completed).count()
    }
}
