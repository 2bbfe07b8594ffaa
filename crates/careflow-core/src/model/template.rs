//! Grafo de steps (`StepGraph`) y plantilla versionada (`WorkflowTemplate`).
//!
//! El grafo puede contener ciclos y referencias colgantes mientras se edita;
//! la validación estricta ocurre al ordenar o publicar (ver `crate::graph`).
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{Step, StepId};
use crate::errors::GraphValidationError;

/// Conjunto de steps indexado por id más el step inicial designado.
///
/// Se serializa como lista (`steps: [...]`); ids duplicados en la entrada
/// se rechazan al deserializar. La igualdad tiene en cuenta el orden de
/// autoría, igual que la serialización y el `definition_hash`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "StepGraphRepr", into = "StepGraphRepr")]
pub struct StepGraph {
    start_step_id: Option<StepId>,
    steps: IndexMap<StepId, Step>,
}

impl PartialEq for StepGraph {
    fn eq(&self, other: &Self) -> bool {
        self.start_step_id == other.start_step_id
        && self.steps.len() == other.steps.len()
        && self.steps.iter().eq(other.steps.iter())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepGraphRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_step_id: Option<StepId>,
    #[serde(default)]
    steps: Vec<Step>,
}

impl TryFrom<StepGraphRepr> for StepGraph {
    type Error = GraphValidationError;

    fn try_from(repr: StepGraphRepr) -> Result<Self, Self::Error> {
        let mut graph = StepGraph::new();
        for step in repr.steps {
            graph.insert_step(step)?;
        }
        graph.start_step_id = repr.start_step_id;
        Ok(graph)
    }
}

impl From<StepGraph> for StepGraphRepr {
    fn from(graph: StepGraph) -> Self {
        Self { start_step_id: graph.start_step_id,
               steps: graph.steps.into_values().collect() }
    }
}

impl StepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construye un grafo a partir de steps en orden de autoría.
    pub fn from_steps(start: impl Into<StepId>, steps: Vec<Step>) -> Result<Self, GraphValidationError> {
        let mut graph = Self::new();
        for step in steps {
            graph.insert_step(step)?;
        }
        graph.start_step_id = Some(start.into());
        Ok(graph)
    }

    pub fn start_step_id(&self) -> Option<&StepId> {
        self.start_step_id.as_ref()
    }

    pub fn set_start_step(&mut self, id: Option<StepId>) {
        self.start_step_id = id;
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    /// Steps en orden de autoría (no de visualización).
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.values()
    }

    pub fn steps_mut(&mut self) -> impl Iterator<Item = &mut Step> {
        self.steps.values_mut()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn insert_step(&mut self, step: Step) -> Result<(), GraphValidationError> {
        if self.steps.contains_key(&step.id) {
            return Err(GraphValidationError::DuplicateStepId(step.id));
        }
        self.steps.insert(step.id.clone(), step);
        Ok(())
    }

    /// Quita el step conservando el orden de autoría del resto.
    pub fn remove_step(&mut self, id: &str) -> Option<Step> {
        self.steps.shift_remove(id)
    }
}

/// Marca de publicación: la versión congelada de una plantilla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedVersion {
    pub version: u32,
    pub definition_hash: String,
    pub published_at: DateTime<Utc>,
}

/// Definición de un flujo de atención: metadatos + grafo de steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub graph: StepGraph,
    /// Número de la última versión publicada (0 = nunca publicada).
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishedVersion>,
}

impl WorkflowTemplate {
    pub fn new(name: impl Into<String>, graph: StepGraph) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               description: None,
               graph,
               version: 0,
               published: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_published(&self) -> bool {
        self.published.is_some()
    }

    /// Hash publicado vigente, si la plantilla no ha vuelto a borrador.
    pub fn definition_hash(&self) -> Option<&str> {
        self.published.as_ref().map(|p| p.definition_hash.as_str())
    }

    /// Hash determinista del grafo: mismo grafo => mismo hash.
    pub fn compute_definition_hash(&self) -> String {
        let graph = serde_json::to_value(&self.graph).unwrap_or_default();
        crate::hashing::hash_value(&json!({
            "engine_version": crate::constants::ENGINE_VERSION,
            "template_id": self.id,
            "graph": graph,
        }))
    }

    /// Valida y congela la plantilla como una nueva versión.
    ///
    /// Las advertencias (steps inalcanzables, ramas sombreadas) se registran
    /// pero no bloquean la publicación.
    pub fn publish(&mut self) -> Result<&PublishedVersion, GraphValidationError> {
        let report = crate::graph::validate_template(self)?;
        for warning in &report.warnings {
            log::warn!("template '{}': {}", self.name, warning);
        }
        let definition_hash = self.compute_definition_hash();
        self.version += 1;
        log::info!("published template '{}' v{} ({})", self.name, self.version, definition_hash);
        Ok(&*self.published.insert(PublishedVersion { version: self.version,
                                                    definition_hash,
                                                    published_at: Utc::now() }))
    }

    /// Vuelve la plantilla a borrador; la versión publicada no se modifica en sitio.
    pub(crate) fn mark_draft(&mut self) {
        self.published = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Branch;
    use serde_json::json;

    #[test]
    fn graph_serializes_as_list_in_authoring_order() {
        let graph = StepGraph::from_steps("b",
                                          vec![Step::new("b", "B").with_branch(Branch::to("a")), Step::new("a", "A")]).unwrap();
        let v = serde_json::to_value(&graph).unwrap();
        assert_eq!(v["startStepId"], json!("b"));
        assert_eq!(v["steps"][0]["id"], json!("b"));
        assert_eq!(v["steps"][1]["id"], json!("a"));
        let back: StepGraph = serde_json::from_value(v).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn equality_follows_authoring_order_like_the_hash() {
        let ab = StepGraph::from_steps("a", vec![Step::new("a", "A"), Step::new("b", "B")]).unwrap();
        let ba = StepGraph::from_steps("a", vec![Step::new("b", "B"), Step::new("a", "A")]).unwrap();
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());

        let mut t1 = WorkflowTemplate::new("t", ab);
        let mut t2 = t1.clone();
        t2.graph = ba;
        assert_ne!(t1.compute_definition_hash(), t2.compute_definition_hash());
        t2.graph = t1.graph.clone();
        assert_eq!(t1.publish().unwrap().definition_hash, t2.compute_definition_hash());
    }

    #[test]
    fn duplicate_ids_rejected_on_deserialize() {
        let v = json!({"startStepId": "a", "steps": [{"id": "a", "name": "A"}, {"id": "a", "name": "A2"}]});
        let err = serde_json::from_value::<StepGraph>(v).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn publish_is_versioned_and_hash_is_stable() {
        let graph = StepGraph::from_steps("a", vec![Step::new("a", "A")]).unwrap();
        let mut t = WorkflowTemplate::new("intake", graph);
        let first = t.publish().unwrap().clone();
        assert_eq!(first.version, 1);
        let second = t.publish().unwrap().clone();
        assert_eq!(second.version, 2);
        assert_eq!(first.definition_hash, second.definition_hash);
        assert_eq!(t.definition_hash(), Some(second.definition_hash.as_str()));
    }

    #[test]
    fn publish_rejects_missing_start() {
        let mut t = WorkflowTemplate::new("empty", StepGraph::new());
        assert_eq!(t.publish().unwrap_err(), GraphValidationError::MissingStartStep);
        assert!(!t.is_published());
    }
}
