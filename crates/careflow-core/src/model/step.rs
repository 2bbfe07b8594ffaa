//! Nodo (`Step`) y arista (`Branch`) del grafo de una plantilla.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Condition;
use crate::constants::{DAYS_PER_MONTH, DAYS_PER_WEEK, HOURS_PER_DAY};

/// Identificador opaco de un step, estable dentro de la plantilla.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Hours,
    Days,
    Weeks,
    Months,
}

/// Plazo esperado para completar un step, medido desde su inicio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedCompletion {
    pub value: u32,
    pub unit: TimeUnit,
}

impl ExpectedCompletion {
    pub fn days(value: u32) -> Self {
        Self { value, unit: TimeUnit::Days }
    }

    pub fn as_days(&self) -> f64 {
        let v = f64::from(self.value);
        match self.unit {
            TimeUnit::Hours => v / HOURS_PER_DAY,
            TimeUnit::Days => v,
            TimeUnit::Weeks => v * DAYS_PER_WEEK,
            TimeUnit::Months => v * DAYS_PER_MONTH,
        }
    }
}

/// Arista dirigida hacia otro step. Sin condición actúa como rama por defecto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub target_step_id: StepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Branch {
    /// Rama incondicional (default).
    pub fn to(target: impl Into<StepId>) -> Self {
        Self { target_step_id: target.into(),
               condition: None }
    }

    pub fn when(target: impl Into<StepId>, condition: Condition) -> Self {
        Self { target_step_id: target.into(),
               condition: Some(condition) }
    }

    pub fn is_unconditional(&self) -> bool {
        self.condition.is_none()
    }
}

/// Unidad de trabajo dentro del flujo. El orden de `branches` es significativo
/// (gana la primera rama cuya condición se cumple).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_completion: Option<ExpectedCompletion>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub archived: bool,
}

impl Step {
    pub fn new(id: impl Into<StepId>, name: impl Into<String>) -> Self {
        Self { id: id.into(),
               name: name.into(),
               form_id: None,
               expected_completion: None,
               branches: Vec::new(),
               archived: false }
    }

    pub fn with_form(mut self, form_id: impl Into<String>) -> Self {
        self.form_id = Some(form_id.into());
        self
    }

    pub fn with_expected_completion(mut self, expected: ExpectedCompletion) -> Self {
        self.expected_completion = Some(expected);
        self
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    /// Un step sin ramas salientes es terminal.
    pub fn is_terminal(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn expected_days(&self) -> f64 {
        self.expected_completion.map(|e| e.as_days()).unwrap_or(0.0)
    }
}
