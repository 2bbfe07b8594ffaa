//! Validación de plantillas.
//!
//! Dos niveles: errores duros (`GraphValidationError`), que impiden ordenar y
//! publicar, y advertencias (`TemplateWarning`), que se informan al editor
//! sin bloquear nada.
use std::fmt;

use serde::Serialize;

use super::{order_steps, OrderedSteps};
use crate::errors::GraphValidationError;
use crate::model::{StepGraph, StepId, WorkflowTemplate};

/// Comprueba step inicial designado y existente, y que todo destino de rama exista.
pub fn validate_graph(graph: &StepGraph) -> Result<(), GraphValidationError> {
    let start = graph.start_step_id().ok_or(GraphValidationError::MissingStartStep)?;
    if !graph.contains(start.as_str()) {
        return Err(GraphValidationError::UnknownStartStep(start.clone()));
    }
    for step in graph.steps() {
        if let Some(branch) = step.branches.iter().find(|b| !graph.contains(b.target_step_id.as_str())) {
            return Err(GraphValidationError::DanglingBranchTarget { step_id: step.id.clone(),
                                                                    target: branch.target_step_id.clone() });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TemplateWarning {
    /// El step no es alcanzable desde el inicial; no recibe índice.
    UnreachableStep { step_id: StepId },
    /// Rama declarada después de una incondicional: nunca puede ganar.
    ShadowedBranch { step_id: StepId, index: usize },
    /// Un step activo ramifica hacia un step archivado.
    ArchivedTarget { step_id: StepId, target: StepId },
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreachableStep { step_id } => write!(f, "step '{step_id}' is unreachable from the start step"),
            Self::ShadowedBranch { step_id, index } => {
                write!(f, "branch {index} of step '{step_id}' follows an unconditional branch and is never taken")
            }
            Self::ArchivedTarget { step_id, target } => write!(f, "step '{step_id}' branches to archived step '{target}'"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub warnings: Vec<TemplateWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validación completa previa a publicar.
pub fn validate_template(template: &WorkflowTemplate) -> Result<ValidationReport, GraphValidationError> {
    let ordered = order_steps(&template.graph)?;
    Ok(ValidationReport { warnings: collect_warnings(&template.graph, &ordered) })
}

fn collect_warnings(graph: &StepGraph, ordered: &OrderedSteps) -> Vec<TemplateWarning> {
    let mut warnings = Vec::new();
    for step in graph.steps() {
        if !ordered.contains(step.id.as_str()) {
            warnings.push(TemplateWarning::UnreachableStep { step_id: step.id.clone() });
        }
        if let Some(default_at) = step.branches.iter().position(|b| b.is_unconditional()) {
            warnings.extend((default_at + 1..step.branches.len()).map(|index| TemplateWarning::ShadowedBranch { step_id: step.id.clone(),
                                                                                                                   index }));
        }
        if !step.archived {
            for branch in &step.branches {
                if graph.step(branch.target_step_id.as_str()).is_some_and(|t| t.archived) {
                    warnings.push(TemplateWarning::ArchivedTarget { step_id: step.id.clone(),
                                                                    target: branch.target_step_id.clone() });
                }
            }
        }
    }
    warnings
}
