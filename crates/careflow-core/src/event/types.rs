//! Tipos de evento de una instancia y estructura `InstanceEvent`.
//!
//! Rol en el flujo:
//! - Cada transición efectiva del `StepActionController` emite un evento a un
//!   `EventStore` append-only.
//! - Los reintentos que resultan ser no-op no emiten nada, de modo que la
//!   secuencia refleja sólo cambios reales de estado.
//! - `BranchTaken` conserva si el camino fue el recomendado o un override
//!   del operador (auditoría).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathChoice {
    Recommended,
    Overridden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstanceEventKind {
    StepStarted { step_id: StepId },
    StepCompleted { step_id: StepId },
    BranchTaken { from: StepId, to: StepId, choice: PathChoice },
    /// Cierre de la instancia. `path_fingerprint` es el hash de la secuencia
    /// de steps iniciados, en orden.
    WorkflowCompleted { path_fingerprint: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEvent {
    pub seq: u64, // asignado por el store (orden append)
    pub instance_id: Uuid,
    pub kind: InstanceEventKind,
    pub ts: DateTime<Utc>,
}
