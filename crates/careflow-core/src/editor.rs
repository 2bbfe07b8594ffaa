//! Sesión de edición de una plantilla.
//!
//! El editor es dueño de la plantilla viva, la selección y su propio
//! `HistoryManager`: no hay historial global, dos sesiones nunca comparten
//! estado. Cada mutación se aplica en sitio y luego se captura una copia
//! profunda con una etiqueta fija. Editar no exige que el grafo sea válido.
use crate::errors::GraphValidationError;
use crate::history::HistoryManager;
use crate::model::{Branch, Condition, ExpectedCompletion, Step, StepId, WorkflowTemplate};

pub const ADD_STEP: &str = "ADD_STEP";
pub const REMOVE_STEP: &str = "REMOVE_STEP";
pub const UPDATE_STEP: &str = "UPDATE_STEP";
pub const ARCHIVE_STEP: &str = "ARCHIVE_STEP";
pub const ADD_BRANCH: &str = "ADD_BRANCH";
pub const REMOVE_BRANCH: &str = "REMOVE_BRANCH";
pub const MOVE_BRANCH: &str = "MOVE_BRANCH";
pub const UPDATE_BRANCH_CONDITION: &str = "UPDATE_BRANCH_CONDITION";
pub const SET_START_STEP: &str = "SET_START_STEP";

/// Cambios aplicables a un step existente bajo `UPDATE_STEP`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepUpdate {
    pub name: Option<String>,
    pub form_id: Option<Option<String>>,
    pub expected_completion: Option<Option<ExpectedCompletion>>,
}

#[derive(Debug)]
pub struct TemplateEditor {
    template: WorkflowTemplate,
    selected_step_id: Option<StepId>,
    history: HistoryManager,
}

impl TemplateEditor {
    /// Abre una sesión; el historial arranca con `INITIAL_STATE`.
    pub fn open(template: WorkflowTemplate, max_history: usize) -> Self {
        let selected_step_id = template.graph.start_step_id().cloned();
        let mut history = HistoryManager::new(max_history);
        history.init(&template, selected_step_id.clone());
        Self { template,
               selected_step_id,
               history }
    }

    pub fn template(&self) -> &WorkflowTemplate {
        &self.template
    }

    /// Cierra la sesión devolviendo la plantilla; el historial se descarta.
    pub fn into_template(self) -> WorkflowTemplate {
        self.template
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn selected_step_id(&self) -> Option<&StepId> {
        self.selected_step_id.as_ref()
    }

    /// La selección no genera entrada de historial.
    pub fn select(&mut self, step_id: Option<StepId>) {
        self.selected_step_id = step_id;
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Restaura la instantánea anterior. `false` si ya estaba en la más antigua.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.template = state.template;
                self.selected_step_id = state.selected_step_id;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.template = state.template;
                self.selected_step_id = state.selected_step_id;
                true
            }
            None => false,
        }
    }

    pub fn add_step(&mut self, step: Step) -> Result<(), GraphValidationError> {
        let id = step.id.clone();
        self.template.graph.insert_step(step)?;
        self.selected_step_id = Some(id);
        self.commit(ADD_STEP);
        Ok(())
    }

    /// Quita el step, las ramas que apuntan a él y, si era el inicial, deja la
    /// plantilla sin step inicial.
    pub fn remove_step(&mut self, step_id: &str) -> Result<Step, GraphValidationError> {
        let removed = self.template
                          .graph
                          .remove_step(step_id)
                          .ok_or_else(|| GraphValidationError::UnknownStep(step_id.into()))?;
        for step in self.template.graph.steps_mut() {
            step.branches.retain(|b| b.target_step_id.as_str() != step_id);
        }
        if self.template.graph.start_step_id().is_some_and(|s| s.as_str() == step_id) {
            self.template.graph.set_start_step(None);
        }
        if self.selected_step_id.as_ref().is_some_and(|s| s.as_str() == step_id) {
            self.selected_step_id = None;
        }
        self.commit(REMOVE_STEP);
        Ok(removed)
    }

    pub fn update_step(&mut self, step_id: &str, update: StepUpdate) -> Result<(), GraphValidationError> {
        let step = self.step_mut(step_id)?;
        if let Some(name) = update.name {
            step.name = name;
        }
        if let Some(form_id) = update.form_id {
            step.form_id = form_id;
        }
        if let Some(expected) = update.expected_completion {
            step.expected_completion = expected;
        }
        self.commit(UPDATE_STEP);
        Ok(())
    }

    pub fn set_archived(&mut self, step_id: &str, archived: bool) -> Result<(), GraphValidationError> {
        self.step_mut(step_id)?.archived = archived;
        self.commit(ARCHIVE_STEP);
        Ok(())
    }

    /// Añade la rama al final. El destino puede no existir todavía.
    pub fn add_branch(&mut self, step_id: &str, branch: Branch) -> Result<(), GraphValidationError> {
        self.step_mut(step_id)?.branches.push(branch);
        self.commit(ADD_BRANCH);
        Ok(())
    }

    pub fn remove_branch(&mut self, step_id: &str, index: usize) -> Result<Branch, GraphValidationError> {
        let step = self.step_mut(step_id)?;
        if index >= step.branches.len() {
            return Err(GraphValidationError::UnknownBranch { step_id: step_id.into(), index });
        }
        let removed = step.branches.remove(index);
        self.commit(REMOVE_BRANCH);
        Ok(removed)
    }

    /// Cambia la prioridad de una rama (el orden decide la recomendación).
    pub fn move_branch(&mut self, step_id: &str, from: usize, to: usize) -> Result<(), GraphValidationError> {
        let step = self.step_mut(step_id)?;
        let len = step.branches.len();
        if let Some(index) = [from, to].into_iter().find(|i| *i >= len) {
            return Err(GraphValidationError::UnknownBranch { step_id: step_id.into(), index });
        }
        let branch = step.branches.remove(from);
        step.branches.insert(to, branch);
        self.commit(MOVE_BRANCH);
        Ok(())
    }

    pub fn set_branch_condition(&mut self, step_id: &str, index: usize, condition: Option<Condition>)
                                -> Result<(), GraphValidationError> {
        let branch = self.step_mut(step_id)?
                         .branches
                         .get_mut(index)
                         .ok_or_else(|| GraphValidationError::UnknownBranch { step_id: step_id.into(), index })?;
        branch.condition = condition;
        self.commit(UPDATE_BRANCH_CONDITION);
        Ok(())
    }

    pub fn set_start_step(&mut self, step_id: &str) -> Result<(), GraphValidationError> {
        if !self.template.graph.contains(step_id) {
            return Err(GraphValidationError::UnknownStep(step_id.into()));
        }
        self.template.graph.set_start_step(Some(step_id.into()));
        self.commit(SET_START_STEP);
        Ok(())
    }

    fn step_mut(&mut self, step_id: &str) -> Result<&mut Step, GraphValidationError> {
        self.template
            .graph
            .step_mut(step_id)
            .ok_or_else(|| GraphValidationError::UnknownStep(step_id.into()))
    }

    // Toda edición devuelve la plantilla a borrador antes de capturarla.
    fn commit(&mut self, action: &str) {
        self.template.mark_draft();
        self.history.capture_state(&self.template, self.selected_step_id.clone(), action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepGraph;

    fn editor() -> TemplateEditor {
        let graph = StepGraph::from_steps("a",
                                          vec![Step::new("a", "A").with_branch(Branch::to("b")), Step::new("b", "B")]).unwrap();
        TemplateEditor::open(WorkflowTemplate::new("t", graph), 10)
    }

    #[test]
    fn remove_step_cleans_incoming_branches_and_start() {
        let mut ed = editor();
        ed.remove_step("b").unwrap();
        assert!(ed.template().graph.step("a").unwrap().branches.is_empty());
        ed.remove_step("a").unwrap();
        assert!(ed.template().graph.start_step_id().is_none());
        assert_eq!(ed.history().labels(), ["INITIAL_STATE", REMOVE_STEP, REMOVE_STEP]);
    }

    #[test]
    fn failed_edit_captures_nothing() {
        let mut ed = editor();
        assert_eq!(ed.remove_branch("a", 3).unwrap_err(),
                   GraphValidationError::UnknownBranch { step_id: "a".into(), index: 3 });
        assert_eq!(ed.add_step(Step::new("a", "dup")).unwrap_err(), GraphValidationError::DuplicateStepId("a".into()));
        assert_eq!(ed.history().len(), 1);
        assert!(!ed.can_undo());
    }

    #[test]
    fn undo_restores_template_and_selection() {
        let mut ed = editor();
        ed.add_step(Step::new("c", "C")).unwrap();
        assert_eq!(ed.selected_step_id().map(|s| s.as_str()), Some("c"));
        assert!(ed.undo());
        assert!(!ed.template().graph.contains("c"));
        assert_eq!(ed.selected_step_id().map(|s| s.as_str()), Some("a"));
        assert!(!ed.undo());
        assert!(ed.redo());
        assert!(ed.template().graph.contains("c"));
        assert!(!ed.redo());
    }

    #[test]
    fn move_branch_reorders_priority() {
        let mut ed = editor();
        ed.add_step(Step::new("c", "C")).unwrap();
        ed.add_branch("a", Branch::when("c", Condition::exists("urgent"))).unwrap();
        ed.move_branch("a", 1, 0).unwrap();
        let targets: Vec<&str> = ed.template()
                                   .graph
                                   .step("a")
                                   .unwrap()
                                   .branches
                                   .iter()
                                   .map(|b| b.target_step_id.as_str())
                                   .collect();
        assert_eq!(targets, ["c", "b"]);
        assert!(ed.move_branch("a", 0, 2).is_err());
    }

    #[test]
    fn editing_a_published_template_makes_a_draft() {
        let mut ed = editor();
        let mut t = ed.into_template();
        t.publish().unwrap();
        ed = TemplateEditor::open(t, 10);
        assert!(ed.template().is_published());
        ed.update_step("b", StepUpdate { name: Some("B2".into()), ..Default::default() }).unwrap();
        assert!(!ed.template().is_published());
        assert_eq!(ed.template().version, 1);
        assert!(ed.undo());
        assert!(ed.template().is_published());
    }
}
