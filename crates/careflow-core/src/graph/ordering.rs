//! Orden de visualización del grafo.
//!
//! Expansión en anchura desde el step inicial: el inicial recibe el índice 1 y
//! los destinos de sus ramas se encolan en orden de declaración. Un step ya
//! visitado nunca se vuelve a encolar ni a indexar, por lo que los ciclos
//! terminan. El resultado es una lista nueva más un mapa id -> índice; los
//! `Step` canónicos no se modifican.
use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use super::validate_graph;
use crate::errors::GraphValidationError;
use crate::model::{Step, StepGraph, StepId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedStep {
    /// Posición 1-based en el orden de visualización.
    pub index: usize,
    pub step_id: StepId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSteps {
    entries: Vec<OrderedStep>,
    positions: HashMap<StepId, usize>,
}

impl OrderedSteps {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderedStep> {
        self.entries.iter()
    }

    /// Índice asignado, o `None` si el step no fue alcanzado.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &StepId> {
        self.entries.iter().map(|e| &e.step_id)
    }
}

/// Ordena los steps alcanzables desde el inicial.
///
/// Falla si no hay step inicial o si alguna rama apunta a un step inexistente.
pub fn order_steps(graph: &StepGraph) -> Result<OrderedSteps, GraphValidationError> {
    validate_graph(graph)?;
    let start = graph.start_step_id().ok_or(GraphValidationError::MissingStartStep)?;

    let mut ordered = OrderedSteps::default();
    let mut queue = VecDeque::from([start.clone()]);
    while let Some(id) = queue.pop_front() {
        if ordered.positions.contains_key(&id) {
            continue;
        }
        let index = ordered.entries.len() + 1;
        ordered.positions.insert(id.clone(), index);
        if let Some(step) = graph.step(id.as_str()) {
            queue.extend(step.branches
                             .iter()
                             .filter(|b| !ordered.positions.contains_key(&b.target_step_id))
                             .map(|b| b.target_step_id.clone()));
        }
        ordered.entries.push(OrderedStep { index, step_id: id });
    }
    Ok(ordered)
}

/// Índices de visualización de los destinos de cada rama de `step`.
/// Las ramas cuyo destino no fue alcanzado se omiten.
pub fn branch_indices(step: &Step, ordered: &OrderedSteps) -> Vec<usize> {
    step.branches
        .iter()
        .filter_map(|b| ordered.index_of(b.target_step_id.as_str()))
        .collect()
}

/// Steps alcanzables desde `from` (incluido). Ignora referencias colgantes.
pub fn reachable_from(graph: &StepGraph, from: &str) -> HashSet<StepId> {
    let mut seen = HashSet::new();
    let Some(root) = graph.step(from) else {
        return seen;
    };
    let mut stack = vec![root];
    seen.insert(root.id.clone());
    while let Some(step) = stack.pop() {
        for branch in &step.branches {
            if let Some(next) = graph.step(branch.target_step_id.as_str()) {
                if seen.insert(next.id.clone()) {
                    stack.push(next);
                }
            }
        }
    }
    seen
}
