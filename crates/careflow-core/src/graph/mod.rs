//! Recorridos y validación del grafo de steps.

mod ordering;
mod validation;

pub use ordering::{branch_indices, order_steps, reachable_from, OrderedStep, OrderedSteps};
pub use validation::{validate_graph, validate_template, TemplateWarning, ValidationReport};
