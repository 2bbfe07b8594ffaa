//! Historial lineal y acotado de undo/redo para una sesión de edición.
//!
//! Cada entrada es una copia profunda e independiente de la plantilla: el
//! modelo no contiene referencias compartidas (`Rc`/`Arc`), así que `clone`
//! es una copia estructural completa y editar la plantilla viva nunca altera
//! una entrada previa.
//!
//! Invariantes:
//! - `0 <= current_index < len` siempre que el historial no esté vacío.
//! - `len <= max_size`; al superarlo se descarta la entrada más antigua y el
//!   índice baja en uno.
//! - Capturar tras un undo descarta la cola rehacible (línea de tiempo única).
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_HISTORY, INITIAL_STATE_LABEL};
use crate::model::{StepId, WorkflowTemplate};

/// Instantánea inmutable de la plantilla más la selección del editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub template: WorkflowTemplate,
    pub selected_step_id: Option<StepId>,
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    history: Vec<HistoryState>,
    current_index: usize,
    max_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl HistoryManager {
    /// `max_size` menor que 1 se ajusta a 1.
    pub fn new(max_size: usize) -> Self {
        Self { history: Vec::new(),
               current_index: 0,
               max_size: max_size.max(1) }
    }

    /// Reinicia el historial con una única entrada `INITIAL_STATE`.
    pub fn init(&mut self, template: &WorkflowTemplate, selected_step_id: Option<StepId>) {
        self.history.clear();
        self.history.push(HistoryState { template: template.clone(),
                                         selected_step_id,
                                         action: INITIAL_STATE_LABEL.to_string() });
        self.current_index = 0;
        log::debug!("history initialised for template '{}'", template.name);
    }

    /// Registra una nueva instantánea tras `current_index`, descartando la
    /// cola rehacible y, si hace falta, la entrada más antigua.
    pub fn capture_state(&mut self, template: &WorkflowTemplate, selected_step_id: Option<StepId>, action: impl Into<String>) {
        let action = action.into();
        if !self.history.is_empty() {
            self.history.truncate(self.current_index + 1);
        }
        self.history.push(HistoryState { template: template.clone(),
                                         selected_step_id,
                                         action });
        self.current_index = self.history.len() - 1;
        if self.history.len() > self.max_size {
            let evicted = self.history.remove(0);
            self.current_index -= 1;
            log::warn!("history full ({}), evicted oldest entry '{}'", self.max_size, evicted.action);
        }
        log::debug!("captured '{}' at {}/{}", self.history[self.current_index].action, self.current_index + 1, self.history.len());
    }

    /// Retrocede una entrada. En la más antigua (o sin historial) no hace nada.
    pub fn undo(&mut self) -> Option<HistoryState> {
        if !self.can_undo() {
            return None;
        }
        self.current_index -= 1;
        let state = self.history[self.current_index].clone();
        log::debug!("undo -> '{}' ({})", state.action, self.current_index);
        Some(state)
    }

    /// Avanza una entrada. En la más reciente (o sin historial) no hace nada.
    pub fn redo(&mut self) -> Option<HistoryState> {
        if !self.can_redo() {
            return None;
        }
        self.current_index += 1;
        let state = self.history[self.current_index].clone();
        log::debug!("redo -> '{}' ({})", state.action, self.current_index);
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty() && self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.history.is_empty() && self.current_index + 1 < self.history.len()
    }

    pub fn current(&self) -> Option<&HistoryState> {
        self.history.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Etiquetas en orden cronológico (de la más antigua a la más reciente).
    pub fn labels(&self) -> Vec<&str> {
        self.history.iter().map(|s| s.action.as_str()).collect()
    }
}
