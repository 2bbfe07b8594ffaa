//! Progreso derivado de una instancia.
//!
//! Nunca se persiste: se recalcula a partir de `InstanceDetails` y el grafo
//! en cada consulta.
use std::collections::HashSet;

use serde::Serialize;

use crate::branch::{BranchEvaluator, BranchSelection};
use crate::errors::{EvaluationError, GraphValidationError};
use crate::graph::{order_steps, OrderedSteps};
use crate::model::{InstanceContext, InstanceDetails, StepGraph, StepId, StepStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstanceProgress {
    pub total: usize,
    pub completed: usize,
    pub percent: f64,
    pub est_days_remaining: u32,
    /// Índice de visualización del step actual; 0 si la instancia no comenzó.
    pub current_index: usize,
}

/// Opción de siguiente step tal como la muestra la capa de presentación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStepOption {
    pub target: StepId,
    pub index: Option<usize>,
    pub recommended: bool,
    pub condition_met: bool,
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceProgressEngine {
    evaluator: BranchEvaluator,
}

impl InstanceProgressEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_progress(&self, graph: &StepGraph, instance: &InstanceDetails, ctx: &InstanceContext)
                            -> Result<WorkflowInstanceProgress, GraphValidationError> {
        let ordered = order_steps(graph)?;
        Ok(self.compute_progress_ordered(&ordered, graph, instance, ctx))
    }

    /// Variante que reutiliza un orden ya calculado.
    pub fn compute_progress_ordered(&self,
                                    ordered: &OrderedSteps,
                                    graph: &StepGraph,
                                    instance: &InstanceDetails,
                                    ctx: &InstanceContext)
                                    -> WorkflowInstanceProgress {
        let total = ordered.len();
        let completed = instance.completed_count();
        let percent = if total == 0 {
            0.0
        } else {
            (completed.min(total) as f64 / total as f64) * 100.0
        };
        let current_index = match &instance.current_step_id {
            Some(id) if instance.has_started() => ordered.index_of(id.as_str()).unwrap_or(0),
            _ => 0,
        };
        WorkflowInstanceProgress { total,
                                   completed,
                                   percent,
                                   est_days_remaining: self.estimate_days_remaining(graph, instance, ctx),
                                   current_index }
    }

    /// Suma de plazos esperados de los steps no completados en el camino
    /// recomendado desde el step actual hasta un terminal (o hasta donde no
    /// se pueda decidir). Steps sin estimación aportan 0.
    pub fn estimate_days_remaining(&self, graph: &StepGraph, instance: &InstanceDetails, ctx: &InstanceContext) -> u32 {
        let mut cursor = instance.current_step_id.as_ref().or(graph.start_step_id()).cloned();
        let mut visited = HashSet::new();
        let mut days = 0.0;
        while let Some(id) = cursor.take() {
            let Some(step) = graph.step(id.as_str()) else { break };
            if instance.status_of(id.as_str()) != StepStatus::Completed {
                days += step.expected_days();
            }
            visited.insert(id);
            if let Ok(BranchSelection::Next { target, .. }) = self.evaluator.evaluate(step, ctx) {
                if !visited.contains(&target) {
                    cursor = Some(target);
                }
            }
        }
        days.ceil() as u32
    }

    /// Ramas del step en orden de declaración, marcando la recomendada. Si
    /// ninguna aplica, ninguna queda marcada: son los destinos de override.
    pub fn next_step_options(&self, graph: &StepGraph, ordered: &OrderedSteps, step_id: &str, ctx: &InstanceContext)
                             -> Result<Vec<NextStepOption>, EvaluationError> {
        let step = graph.step(step_id).ok_or_else(|| EvaluationError::UnknownStep(step_id.into()))?;
        let recommended = match self.evaluator.evaluate(step, ctx) {
            Ok(BranchSelection::Next { index, .. }) => Some(index),
            _ => None,
        };
        Ok(step.branches
               .iter()
               .enumerate()
               .map(|(i, b)| NextStepOption { target: b.target_step_id.clone(),
                                              index: ordered.index_of(b.target_step_id.as_str()),
                                              recommended: recommended == Some(i),
                                              condition_met: self.evaluator.branch_applies(b, ctx),
                                              archived: graph.step(b.target_step_id.as_str()).is_some_and(|t| t.archived) })
               .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Branch, Condition, ExpectedCompletion, Step, WorkflowTemplate};
    use serde_json::json;

    fn template() -> WorkflowTemplate {
        let graph = StepGraph::from_steps("a",
                                          vec![Step::new("a", "A").with_expected_completion(ExpectedCompletion::days(2))
                                                                  .with_branch(Branch::when("b", Condition::gt("age", 18)))
                                                                  .with_branch(Branch::to("c")),
                                               Step::new("b", "B").with_expected_completion(ExpectedCompletion::days(3))
                                                                  .with_branch(Branch::to("a")),
                                               Step::new("c", "C").with_expected_completion(ExpectedCompletion::days(10))]).unwrap();
        let mut t = WorkflowTemplate::new("t", graph);
        t.publish().unwrap();
        t
    }

    #[test]
    fn not_started_instance() {
        let t = template();
        let inst = InstanceDetails::enroll(&t).unwrap();
        let ctx = InstanceContext::try_from(json!({"age": 10})).unwrap();
        let p = InstanceProgressEngine::new().compute_progress(&t.graph, &inst, &ctx).unwrap();
        assert_eq!(p.total, 3);
        assert_eq!(p.completed, 0);
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.current_index, 0);
        // a (2) + c (10) en el camino recomendado
        assert_eq!(p.est_days_remaining, 12);
    }

    #[test]
    fn estimate_stops_on_cycles() {
        let t = template();
        let inst = InstanceDetails::enroll(&t).unwrap();
        let ctx = InstanceContext::try_from(json!({"age": 30})).unwrap();
        // a -> b -> a: cada step se cuenta una sola vez
        assert_eq!(InstanceProgressEngine::new().estimate_days_remaining(&t.graph, &inst, &ctx), 5);
    }

    #[test]
    fn options_mark_recommendation_or_nothing() {
        let t = template();
        let ordered = order_steps(&t.graph).unwrap();
        let engine = InstanceProgressEngine::new();
        let ctx = InstanceContext::try_from(json!({"age": 30})).unwrap();
        let opts = engine.next_step_options(&t.graph, &ordered, "a", &ctx).unwrap();
        assert_eq!(opts.len(), 2);
        assert!(opts[0].recommended && opts[0].condition_met);
        assert!(!opts[1].recommended && opts[1].condition_met);
        assert_eq!(opts[0].index, Some(2));

        let mut graph = t.graph.clone();
        graph.step_mut("a").unwrap().branches.pop();
        let opts = engine.next_step_options(&graph, &ordered, "a", &InstanceContext::new()).unwrap();
        assert!(opts.iter().all(|o| !o.recommended && !o.condition_met));
    }
}
