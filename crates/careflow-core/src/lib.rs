//! careflow-core: motor de plantillas de flujo clínico con ramas condicionales.
pub mod branch;
pub mod constants;
pub mod controller;
pub mod editor;
pub mod errors;
pub mod event;
pub mod graph;
pub mod hashing;
pub mod history;
pub mod model;
pub mod progress;

pub use branch::{BranchEvaluator, BranchSelection};
pub use controller::{AdvanceOutcome, StepActionController, TakenBranch, Transition};
pub use editor::{StepUpdate, TemplateEditor};
pub use errors::{CoreEngineError, EvaluationError, GraphValidationError, TransitionError};
pub use event::{EventStore, InMemoryEventStore, InstanceEvent, InstanceEventKind, PathChoice};
pub use graph::{order_steps, validate_template, OrderedSteps, TemplateWarning, ValidationReport};
pub use history::{HistoryManager, HistoryState};
pub use model::{Branch, Condition, ExpectedCompletion, InstanceContext, InstanceDetails, Step, StepGraph, StepId,
                StepStatus, WorkflowTemplate};
pub use progress::{InstanceProgressEngine, NextStepOption, WorkflowInstanceProgress};
