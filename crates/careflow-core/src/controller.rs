//! Máquina de estados que conduce el step actual de una instancia.
//!
//! Por step: `not_started -> in_progress -> completed`. La operación compuesta
//! `advance` completa el step actual, resuelve el siguiente (recomendado u
//! override del operador), lo inicia y, si es terminal, cierra el flujo.
//!
//! `advance` no es atómica: cada sub-operación se confirma por separado y es
//! segura de reintentar (re-completar un step completado, o re-iniciar uno en
//! curso, es un no-op). Tras un fallo parcial basta con repetir `advance`.
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::branch::{BranchEvaluator, BranchSelection};
use crate::errors::{CoreEngineError, GraphValidationError, TransitionError};
use crate::event::{EventStore, InMemoryEventStore, InstanceEvent, InstanceEventKind, PathChoice};
use crate::hashing::hash_value;
use crate::model::{InstanceContext, InstanceDetails, InstanceStatus, Step, StepId, StepStatus, WorkflowTemplate};

/// Resultado de una transición simple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Reintento sobre un estado ya alcanzado; no se emitió evento.
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub from: StepId,
    /// `None` cuando el step actual era terminal.
    pub to: Option<StepId>,
    pub choice: Option<PathChoice>,
    pub workflow_completed: bool,
}

/// Decisión de camino registrada en auditoría.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakenBranch {
    pub from: StepId,
    pub to: StepId,
    pub choice: PathChoice,
}

#[derive(Debug)]
pub struct StepActionController<E>
    where E: EventStore
{
    event_store: E,
    evaluator: BranchEvaluator,
}

impl StepActionController<InMemoryEventStore> {
    /// Controlador con store de eventos en memoria.
    pub fn new() -> Self {
        Self::new_with_store(InMemoryEventStore::default())
    }
}

impl Default for StepActionController<InMemoryEventStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> StepActionController<E> where E: EventStore
{
    pub fn new_with_store(event_store: E) -> Self {
        Self { event_store,
               evaluator: BranchEvaluator::new() }
    }

    pub fn events_for(&self, instance_id: Uuid) -> Vec<InstanceEvent> {
        self.event_store.list(instance_id)
    }

    /// Ramas tomadas por la instancia, en orden.
    pub fn path_taken(&self, instance_id: Uuid) -> Vec<TakenBranch> {
        self.event_store
            .list(instance_id)
            .into_iter()
            .filter_map(|e| match e.kind {
                InstanceEventKind::BranchTaken { from, to, choice } => Some(TakenBranch { from, to, choice }),
                _ => None,
            })
            .collect()
    }

    /// Recomendación para el step actual sin tocar la instancia.
    pub fn recommend(&self, instance: &InstanceDetails, template: &WorkflowTemplate, ctx: &InstanceContext)
                     -> Result<BranchSelection, CoreEngineError> {
        let current = instance.current_step_id.as_ref().ok_or(TransitionError::NoCurrentStep)?;
        Ok(self.evaluator.evaluate_in(&template.graph, current.as_str(), ctx)?)
    }

    /// `not_started -> in_progress`. Sólo sobre el step actual de la instancia.
    pub fn start(&mut self, instance: &mut InstanceDetails, template: &WorkflowTemplate, step_id: &str)
                 -> Result<Transition, CoreEngineError> {
        ensure_active(instance)?;
        ensure_pinned(instance, template)?;
        lookup(template, step_id)?;
        if instance.current_step_id.as_ref().map(|c| c.as_str()) != Some(step_id) {
            return Err(TransitionError::NotCurrentStep { step_id: step_id.into(),
                                                         current: instance.current_step_id.clone() }.into());
        }

        let entry = instance.step_entry(&step_id.into());
        match entry.status {
            StepStatus::InProgress => return Ok(Transition::AlreadyApplied),
            StepStatus::Completed => {
                return Err(TransitionError::InvalidTransition { step_id: step_id.into(),
                                                                status: entry.status,
                                                                action: "start".into() }.into())
            }
            StepStatus::NotStarted => {
                entry.status = StepStatus::InProgress;
                entry.started_at = Some(chrono::Utc::now());
            }
        }
        log::debug!("instance {}: started '{}'", instance.id, step_id);
        self.event_store
            .append_kind(instance.id, InstanceEventKind::StepStarted { step_id: step_id.into() });
        Ok(Transition::Applied)
    }

    /// `in_progress -> completed`. Re-completar es un no-op.
    pub fn complete(&mut self, instance: &mut InstanceDetails, template: &WorkflowTemplate, step_id: &str)
                    -> Result<Transition, CoreEngineError> {
        ensure_active(instance)?;
        ensure_pinned(instance, template)?;
        lookup(template, step_id)?;

        let status = instance.status_of(step_id);
        match status {
            StepStatus::Completed => Ok(Transition::AlreadyApplied),
            StepStatus::NotStarted => Err(TransitionError::InvalidTransition { step_id: step_id.into(),
                                                                               status,
                                                                               action: "complete".into() }.into()),
            StepStatus::InProgress => {
                self.mark_completed(instance, step_id);
                Ok(Transition::Applied)
            }
        }
    }

    /// Completa el step actual, elige el siguiente y lo inicia.
    ///
    /// Con `override_target` el operador fuerza uno de los destinos de rama
    /// del step actual; si coincide con la recomendación se registra como
    /// `recommended`. Sin override y sin rama aplicable devuelve
    /// `NoApplicableBranch`: el step actual ya quedó completado y el llamador
    /// puede reintentar con un override.
    pub fn advance(&mut self,
                   instance: &mut InstanceDetails,
                   template: &WorkflowTemplate,
                   ctx: &InstanceContext,
                   override_target: Option<&str>)
                   -> Result<AdvanceOutcome, CoreEngineError> {
        ensure_active(instance)?;
        ensure_pinned(instance, template)?;
        let from = instance.current_step_id.clone().ok_or(TransitionError::NoCurrentStep)?;
        let step = lookup(template, from.as_str())?;

        self.complete(instance, template, from.as_str())?;

        let recommendation = self.evaluator.evaluate(step, ctx);
        let (target, choice) = match override_target {
            Some(target) => {
                if !step.branches.iter().any(|b| b.target_step_id.as_str() == target) {
                    return Err(TransitionError::InvalidOverrideTarget { step_id: from,
                                                                        target: target.into() }.into());
                }
                let recommended = recommendation.as_ref()
                                                .ok()
                                                .and_then(|sel| sel.target())
                                                .is_some_and(|t| t.as_str() == target);
                let choice = if recommended { PathChoice::Recommended } else { PathChoice::Overridden };
                (StepId::from(target), choice)
            }
            None => match recommendation? {
                BranchSelection::Next { target, .. } => (target, PathChoice::Recommended),
                BranchSelection::Terminal => {
                    self.complete_workflow(instance)?;
                    return Ok(AdvanceOutcome { from,
                                               to: None,
                                               choice: None,
                                               workflow_completed: true });
                }
            },
        };

        // Se comprueba antes de tocar la instancia: un fallo aquí deja el step
        // actual intacto y un override posterior sigue siendo válido.
        let target_step = lookup(template, target.as_str())?;
        let status = instance.status_of(target.as_str());
        if status == StepStatus::Completed {
            return Err(TransitionError::InvalidTransition { step_id: target,
                                                            status,
                                                            action: "start".into() }.into());
        }

        log::debug!("instance {}: '{}' -> '{}' ({:?})", instance.id, from, target, choice);
        self.event_store.append_kind(instance.id,
                                     InstanceEventKind::BranchTaken { from: from.clone(),
                                                                      to: target.clone(),
                                                                      choice });
        instance.current_step_id = Some(target.clone());
        self.start(instance, template, target.as_str())?;

        let workflow_completed = target_step.is_terminal();
        if workflow_completed {
            self.complete_workflow(instance)?;
        }
        Ok(AdvanceOutcome { from,
                            to: Some(target),
                            choice: Some(choice),
                            workflow_completed })
    }

    /// Cierra la instancia. Los steps aún en curso se marcan completados.
    pub fn complete_workflow(&mut self, instance: &mut InstanceDetails) -> Result<Transition, CoreEngineError> {
        if instance.is_completed() {
            return Ok(Transition::AlreadyApplied);
        }
        let in_progress: Vec<StepId> = instance.steps
                                               .iter()
                                               .filter(|s| s.status == StepStatus::InProgress)
                                               .map(|s| s.id.clone())
                                               .collect();
        for step_id in in_progress {
            self.mark_completed(instance, step_id.as_str());
        }

        let path: Vec<&str> = instance.steps
                                      .iter()
                                      .filter(|s| s.started_at.is_some())
                                      .map(|s| s.id.as_str())
                                      .collect();
        let path_fingerprint = hash_value(&json!({
            "definition_hash": instance.template.definition_hash,
            "path": path,
        }));

        instance.status = InstanceStatus::WorkflowCompleted;
        instance.completed_at = Some(chrono::Utc::now());
        log::info!("instance {}: workflow completed", instance.id);
        self.event_store
            .append_kind(instance.id, InstanceEventKind::WorkflowCompleted { path_fingerprint });
        Ok(Transition::Applied)
    }

    fn mark_completed(&mut self, instance: &mut InstanceDetails, step_id: &str) {
        if let Some(entry) = instance.step_mut(step_id) {
            entry.status = StepStatus::Completed;
            entry.completed_at = Some(chrono::Utc::now());
        }
        log::debug!("instance {}: completed '{}'", instance.id, step_id);
        self.event_store
            .append_kind(instance.id, InstanceEventKind::StepCompleted { step_id: step_id.into() });
    }
}

fn ensure_active(instance: &InstanceDetails) -> Result<(), TransitionError> {
    if instance.is_completed() {
        return Err(TransitionError::WorkflowCompleted);
    }
    Ok(())
}

// La instancia sólo avanza sobre la versión publicada en la que se inscribió.
fn ensure_pinned(instance: &InstanceDetails, template: &WorkflowTemplate) -> Result<(), TransitionError> {
    let found = template.definition_hash().ok_or(TransitionError::TemplateNotPublished)?;
    if template.id != instance.template.template_id || found != instance.template.definition_hash {
        return Err(TransitionError::TemplateVersionMismatch { expected: instance.template.definition_hash.clone(),
                                                              found: found.to_string() });
    }
    Ok(())
}

fn lookup<'t>(template: &'t WorkflowTemplate, step_id: &str) -> Result<&'t Step, GraphValidationError> {
    template.graph
            .step(step_id)
            .ok_or_else(|| GraphValidationError::UnknownStep(step_id.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Branch, Condition, StepGraph};
    use serde_json::json;

    fn published() -> WorkflowTemplate {
        let graph = StepGraph::from_steps("s1",
                                          vec![Step::new("s1", "Triage").with_branch(Branch::when("s2", Condition::gt("age", 18)))
                                                                        .with_branch(Branch::to("s3")),
                                               Step::new("s2", "Adult"),
                                               Step::new("s3", "Pediatric")]).unwrap();
        let mut t = WorkflowTemplate::new("triage", graph);
        t.publish().unwrap();
        t
    }

    fn adult() -> InstanceContext {
        InstanceContext::try_from(json!({"age": 25})).unwrap()
    }

    #[test]
    fn start_requires_current_step() {
        let t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        let err = c.start(&mut inst, &t, "s2").unwrap_err();
        assert!(matches!(err, CoreEngineError::Transition(TransitionError::NotCurrentStep { .. })));
        assert_eq!(c.start(&mut inst, &t, "s1").unwrap(), Transition::Applied);
        assert_eq!(c.start(&mut inst, &t, "s1").unwrap(), Transition::AlreadyApplied);
        assert!(inst.step("s1").unwrap().started_at.is_some());
    }

    #[test]
    fn complete_requires_in_progress_and_is_idempotent() {
        let t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        let err = c.complete(&mut inst, &t, "s1").unwrap_err();
        assert_eq!(err,
                   CoreEngineError::Transition(TransitionError::InvalidTransition { step_id: "s1".into(),
                                                                                    status: StepStatus::NotStarted,
                                                                                    action: "complete".into() }));
        c.start(&mut inst, &t, "s1").unwrap();
        assert_eq!(c.complete(&mut inst, &t, "s1").unwrap(), Transition::Applied);
        let events_before = c.events_for(inst.id).len();
        assert_eq!(c.complete(&mut inst, &t, "s1").unwrap(), Transition::AlreadyApplied);
        assert_eq!(c.events_for(inst.id).len(), events_before);
    }

    #[test]
    fn restarting_a_completed_step_is_invalid() {
        let t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        c.start(&mut inst, &t, "s1").unwrap();
        c.complete(&mut inst, &t, "s1").unwrap();
        assert!(matches!(c.start(&mut inst, &t, "s1").unwrap_err(),
                         CoreEngineError::Transition(TransitionError::InvalidTransition { .. })));
    }

    #[test]
    fn override_must_be_a_branch_target() {
        let t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        c.start(&mut inst, &t, "s1").unwrap();
        let err = c.advance(&mut inst, &t, &adult(), Some("s1")).unwrap_err();
        assert!(matches!(err, CoreEngineError::Transition(TransitionError::InvalidOverrideTarget { .. })));
        assert_eq!(inst.current_step_id.as_ref().map(|s| s.as_str()), Some("s1"));
    }

    #[test]
    fn override_matching_recommendation_is_recorded_as_recommended() {
        let t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        c.start(&mut inst, &t, "s1").unwrap();
        let out = c.advance(&mut inst, &t, &adult(), Some("s2")).unwrap();
        assert_eq!(out.choice, Some(PathChoice::Recommended));
    }

    #[test]
    fn loop_back_to_completed_step_leaves_instance_recoverable() {
        let graph = StepGraph::from_steps("a",
                                          vec![Step::new("a", "A").with_branch(Branch::to("b")),
                                               Step::new("b", "B").with_branch(Branch::when("a", Condition::exists("again")))
                                                                  .with_branch(Branch::to("c")),
                                               Step::new("c", "C")]).unwrap();
        let mut t = WorkflowTemplate::new("loop", graph);
        t.publish().unwrap();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        let ctx = InstanceContext::try_from(json!({"again": true})).unwrap();
        c.start(&mut inst, &t, "a").unwrap();
        c.advance(&mut inst, &t, &ctx, None).unwrap();

        let events_before = c.events_for(inst.id).len();
        let err = c.advance(&mut inst, &t, &ctx, None).unwrap_err();
        assert_eq!(err,
                   CoreEngineError::Transition(TransitionError::InvalidTransition { step_id: "a".into(),
                                                                                    status: StepStatus::Completed,
                                                                                    action: "start".into() }));
        assert!(err.is_recoverable());
        assert_eq!(inst.current_step_id.as_ref().map(|s| s.as_str()), Some("b"));
        // b se completó (sub-paso confirmado), pero no se registró la rama
        assert_eq!(c.path_taken(inst.id).len(), 1);
        assert_eq!(c.events_for(inst.id).len(), events_before + 1);

        let out = c.advance(&mut inst, &t, &ctx, Some("c")).unwrap();
        assert_eq!(out.choice, Some(PathChoice::Overridden));
        assert!(out.workflow_completed);
        assert!(inst.is_completed());
        let path = c.path_taken(inst.id);
        let targets: Vec<&str> = path.iter().map(|p| p.to.as_str()).collect();
        assert_eq!(targets, ["b", "c"]);
    }

    #[test]
    fn stale_template_version_is_rejected() {
        let mut t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        t.graph.step_mut("s2").unwrap().name = "Adult v2".into();
        t.publish().unwrap();
        let mut c = StepActionController::new();
        assert!(matches!(c.start(&mut inst, &t, "s1").unwrap_err(),
                         CoreEngineError::Transition(TransitionError::TemplateVersionMismatch { .. })));
    }

    #[test]
    fn completed_workflow_rejects_transitions() {
        let t = published();
        let mut inst = InstanceDetails::enroll(&t).unwrap();
        let mut c = StepActionController::new();
        c.start(&mut inst, &t, "s1").unwrap();
        c.advance(&mut inst, &t, &adult(), None).unwrap();
        assert!(inst.is_completed());
        assert_eq!(c.complete_workflow(&mut inst).unwrap(), Transition::AlreadyApplied);
        assert_eq!(c.advance(&mut inst, &t, &adult(), None).unwrap_err(),
                   CoreEngineError::Transition(TransitionError::WorkflowCompleted));
    }
}
