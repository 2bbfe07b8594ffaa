//! Recorrido de demostración: plantilla de triaje, inscripción y avance hasta
//! el final, registrando el progreso de cada paso.
use std::fs;
use std::path::Path;

use careflow_core::model::TimeUnit;
use careflow_core::{Branch, Condition, CoreEngineError, EvaluationError, ExpectedCompletion, InstanceContext,
                    InstanceDetails, InstanceProgressEngine, PathChoice, Step, StepActionController, StepGraph,
                    StepUpdate, TemplateEditor, WorkflowInstanceProgress, WorkflowTemplate};

use crate::errors::{CoreError, DomainError};

/// Resumen de una ejecución completa.
#[derive(Debug, Clone)]
pub struct DemoRun {
    pub template: WorkflowTemplate,
    pub instance: InstanceDetails,
    pub snapshots: Vec<WorkflowInstanceProgress>,
    pub overrides: usize,
}

pub fn load_template(path: &Path) -> Result<WorkflowTemplate, CoreError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn load_context(path: &Path) -> Result<InstanceContext, CoreError> {
    let raw = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    InstanceContext::try_from(value).map_err(|e| DomainError::Validation(e).into())
}

/// Plantilla de triaje construida con el editor, como lo haría un autor.
pub fn sample_template(max_history: usize) -> Result<WorkflowTemplate, CoreError> {
    let mut editor = TemplateEditor::open(WorkflowTemplate::new("Triaje inicial", StepGraph::new()), max_history);
    editor.add_step(Step::new("intake", "Admisión").with_form("form-intake")
                                                 .with_expected_completion(ExpectedCompletion { value: 4,
                                                                                                unit: TimeUnit::Hours }))?;
    editor.add_step(Step::new("adult", "Evaluación adulto").with_expected_completion(ExpectedCompletion::days(2)))?;
    editor.add_step(Step::new("pediatric", "Evaluación pediátrica").with_expected_completion(ExpectedCompletion::days(3)))?;
    editor.add_step(Step::new("followup", "Seguimiento").with_expected_completion(ExpectedCompletion { value: 1,
                                                                                                     unit: TimeUnit::Weeks }))?;
    editor.set_start_step("intake")?;
    editor.add_branch("intake", Branch::when("adult", Condition::gt("age", 17)))?;
    editor.add_branch("intake", Branch::to("pediatric"))?;
    editor.add_branch("adult", Branch::to("followup"))?;
    editor.add_branch("pediatric", Branch::to("followup"))?;
    editor.update_step("followup",
                       StepUpdate { name: Some("Seguimiento semanal".into()),
                                    ..Default::default() })?;
    log::debug!("editor history: {:?}", editor.history().labels());
    Ok(editor.into_template())
}

/// Publica (si hace falta), inscribe y avanza hasta completar el flujo.
///
/// Si ninguna rama aplica se toma la primera rama declarada como override,
/// igual que haría un operador ante `NoApplicableBranch`.
pub fn run_to_completion(mut template: WorkflowTemplate, ctx: &InstanceContext) -> Result<DemoRun, CoreError> {
    if !template.is_published() {
        template.publish()?;
    }
    let mut instance = InstanceDetails::enroll(&template)?;
    let mut controller = StepActionController::new();
    let progress = InstanceProgressEngine::new();
    let start = instance.current_step_id
                        .clone()
                        .ok_or_else(|| DomainError::Validation("la instancia no tiene step actual".into()))?;
    controller.start(&mut instance, &template, start.as_str())?;

    let mut snapshots = vec![progress.compute_progress(&template.graph, &instance, ctx)?];
    let mut overrides = 0;
    while !instance.is_completed() {
        let outcome = match controller.advance(&mut instance, &template, ctx, None) {
            Err(CoreEngineError::Evaluation(EvaluationError::NoApplicableBranch { .. })) => {
                let current = instance.current_step_id
                                      .clone()
                                      .ok_or_else(|| DomainError::Validation("la instancia no tiene step actual".into()))?;
                let fallback = template.graph
                                       .step(current.as_str())
                                       .and_then(|s| s.branches.first())
                                       .map(|b| b.target_step_id.clone())
                                       .ok_or_else(|| DomainError::NotFound(format!("rama de '{current}'")))?;
                log::warn!("sin rama aplicable en '{}', override a '{}'", current, fallback);
                controller.advance(&mut instance, &template, ctx, Some(fallback.as_str()))?
            }
            other => other?,
        };
        if outcome.choice == Some(PathChoice::Overridden) {
            overrides += 1;
        }
        let snapshot = progress.compute_progress(&template.graph, &instance, ctx)?;
        log::info!("{} -> {:?}: {}/{} ({:.0}%), ~{} días restantes",
                   outcome.from,
                   outcome.to.as_ref().map(|s| s.as_str()),
                   snapshot.completed,
                   snapshot.total,
                   snapshot.percent,
                   snapshot.est_days_remaining);
        snapshots.push(snapshot);
    }
    Ok(DemoRun { template,
                 instance,
                 snapshots,
                 overrides })
}
