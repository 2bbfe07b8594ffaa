//! Modelo de datos compartido: grafo de steps, plantillas e instancias.

pub mod condition;
pub mod context;
pub mod instance;
pub mod step;
pub mod template;

pub use condition::{CompareOp, Condition};
pub use context::InstanceContext;
pub use instance::{InstanceDetails, InstanceStatus, InstanceStep, StepStatus, TemplateRef};
pub use step::{Branch, ExpectedCompletion, Step, StepId, TimeUnit};
pub use template::{PublishedVersion, StepGraph, WorkflowTemplate};
