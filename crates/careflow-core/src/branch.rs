//! Evaluación de ramas: elige la rama recomendada de un step.
//!
//! Regla: gana la primera rama (en orden de declaración) cuya condición se
//! cumple; una rama sin condición se cumple siempre. El evaluador no reordena
//! ramas ni muta la instancia, así que puede usarse para previsualizar.
use serde::Serialize;

use crate::errors::EvaluationError;
use crate::model::{Branch, InstanceContext, Step, StepGraph, StepId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BranchSelection {
    /// Rama recomendada: posición en `step.branches` y destino.
    Next { index: usize, target: StepId },
    /// El step no tiene ramas salientes.
    Terminal,
}

impl BranchSelection {
    pub fn target(&self) -> Option<&StepId> {
        match self {
            Self::Next { target, .. } => Some(target),
            Self::Terminal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BranchEvaluator;

impl BranchEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn branch_applies(&self, branch: &Branch, ctx: &InstanceContext) -> bool {
        branch.condition.as_ref().map_or(true, |c| c.evaluate(ctx))
    }

    pub fn evaluate(&self, step: &Step, ctx: &InstanceContext) -> Result<BranchSelection, EvaluationError> {
        if step.is_terminal() {
            return Ok(BranchSelection::Terminal);
        }
        step.branches
            .iter()
            .position(|b| self.branch_applies(b, ctx))
            .map(|index| BranchSelection::Next { index,
                                                 target: step.branches[index].target_step_id.clone() })
            .ok_or_else(|| {
                log::warn!("no applicable branch for step '{}'", step.id);
                EvaluationError::NoApplicableBranch { step_id: step.id.clone() }
            })
    }

    /// Igual que `evaluate`, resolviendo el step por id dentro del grafo.
    pub fn evaluate_in(&self, graph: &StepGraph, step_id: &str, ctx: &InstanceContext) -> Result<BranchSelection, EvaluationError> {
        let step = graph.step(step_id).ok_or_else(|| EvaluationError::UnknownStep(step_id.into()))?;
        self.evaluate(step, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use serde_json::json;

    fn ctx() -> InstanceContext {
        InstanceContext::try_from(json!({"age": 25, "smoker": false})).unwrap()
    }

    #[test]
    fn first_match_wins_over_later_default() {
        let step = Step::new("s", "S").with_branch(Branch::when("a", Condition::lt("age", 18)))
                                      .with_branch(Branch::when("b", Condition::gt("age", 18)))
                                      .with_branch(Branch::to("default"));
        let sel = BranchEvaluator::new().evaluate(&step, &ctx()).unwrap();
        assert_eq!(sel, BranchSelection::Next { index: 1, target: "b".into() });
    }

    #[test]
    fn default_declared_first_shadows_conditions() {
        let step = Step::new("s", "S").with_branch(Branch::to("default"))
                                      .with_branch(Branch::when("b", Condition::gt("age", 18)));
        let sel = BranchEvaluator::new().evaluate(&step, &ctx()).unwrap();
        assert_eq!(sel.target().map(|t| t.as_str()), Some("default"));
    }

    #[test]
    fn no_match_without_default_is_an_error() {
        let step = Step::new("s", "S").with_branch(Branch::when("a", Condition::lt("age", 18)))
                                      .with_branch(Branch::when("b", Condition::equals("smoker", true)));
        assert_eq!(BranchEvaluator::new().evaluate(&step, &ctx()).unwrap_err(),
                   EvaluationError::NoApplicableBranch { step_id: "s".into() });
    }

    #[test]
    fn terminal_step_is_not_an_error() {
        assert_eq!(BranchEvaluator::new().evaluate(&Step::new("end", "End"), &ctx()).unwrap(),
                   BranchSelection::Terminal);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let step = Step::new("s", "S").with_branch(Branch::when("b", Condition::gt("age", 18)));
        let c = ctx();
        let e = BranchEvaluator::new();
        assert_eq!(e.evaluate(&step, &c), e.evaluate(&step, &c));
        assert_eq!(c, ctx());
    }

    #[test]
    fn unknown_step_in_graph() {
        let graph = StepGraph::from_steps("s", vec![Step::new("s", "S")]).unwrap();
        assert_eq!(BranchEvaluator::new().evaluate_in(&graph, "x", &ctx()).unwrap_err(),
                   EvaluationError::UnknownStep("x".into()));
    }
}
