//! Propiedades del orden de visualización y del historial acotado.
use std::collections::HashSet;

use careflow_core::graph::{order_steps, reachable_from};
use careflow_core::{Branch, HistoryManager, Step, StepGraph, WorkflowTemplate};
use proptest::prelude::*;

/// Grafo arbitrario de `n` steps (`s0` inicial) con ramas a cualquier step,
/// ciclos y auto-referencias incluidos.
fn arb_graph() -> impl Strategy<Value = StepGraph> {
    (1usize..12).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0..n, 0..4), n))
                .prop_map(|edges| {
                    let steps = edges.iter()
                                     .enumerate()
                                     .map(|(i, targets)| {
                                         targets.iter()
                                                .fold(Step::new(format!("s{i}"), format!("Step {i}")), |s, t| {
                                                    s.with_branch(Branch::to(format!("s{t}")))
                                                })
                                     })
                                     .collect();
                    StepGraph::from_steps("s0", steps).unwrap()
                })
}

proptest! {
    #[test]
    fn reachable_steps_get_unique_contiguous_indices(graph in arb_graph()) {
        let ordered = order_steps(&graph).unwrap();
        let reachable = reachable_from(&graph, "s0");
        prop_assert_eq!(ordered.len(), reachable.len());
        prop_assert_eq!(ordered.index_of("s0"), Some(1));

        let indices: HashSet<usize> = ordered.iter().map(|o| o.index).collect();
        prop_assert_eq!(indices.len(), ordered.len());
        for id in &reachable {
            let index = ordered.index_of(id.as_str());
            prop_assert!(matches!(index, Some(i) if (1..=ordered.len()).contains(&i)));
        }
    }

    #[test]
    fn ordering_is_deterministic(graph in arb_graph()) {
        prop_assert_eq!(order_steps(&graph).unwrap(), order_steps(&graph).unwrap());
    }

    #[test]
    fn history_stays_within_bounds(max in 1usize..6, ops in prop::collection::vec(0u8..3, 0..40)) {
        let template = WorkflowTemplate::new("t", StepGraph::from_steps("a", vec![Step::new("a", "A")]).unwrap());
        let mut h = HistoryManager::new(max);
        h.init(&template, None);
        for (i, op) in ops.into_iter().enumerate() {
            match op {
                0 => {
                    // la cola rehacible se descarta y se añade una entrada
                    let expected = (h.current_index() + 2).min(max);
                    h.capture_state(&template, None, format!("OP_{i}"));
                    prop_assert_eq!(h.len(), expected);
                    prop_assert_eq!(h.current_index(), expected - 1);
                }
                1 => { h.undo(); }
                _ => { h.redo(); }
            }
            prop_assert!(h.len() <= max);
            prop_assert!(h.current_index() < h.len());
        }
    }

    #[test]
    fn full_history_stays_at_capacity(max in 1usize..8, captures in 1usize..30) {
        let template = WorkflowTemplate::new("t", StepGraph::from_steps("a", vec![Step::new("a", "A")]).unwrap());
        let mut h = HistoryManager::new(max);
        h.init(&template, None);
        for i in 0..captures {
            h.capture_state(&template, None, format!("OP_{i}"));
            prop_assert_eq!(h.len(), (i + 2).min(max));
            prop_assert_eq!(h.current_index(), h.len() - 1);
        }
        let last = format!("OP_{}", captures - 1);
        prop_assert_eq!(h.labels().last().copied(), Some(last.as_str()));
    }
}
