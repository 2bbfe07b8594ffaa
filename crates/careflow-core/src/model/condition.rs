//! Condiciones de salida de una rama.
//!
//! Esquema cerrado: el evaluador despacha sobre un conjunto conocido de
//! variantes, sin inspeccionar formas arbitrarias de JSON. Un campo ausente
//! hace falsa cualquier comparación.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InstanceContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn apply(self, actual: &Value, expected: &Value) -> bool {
        match self {
            Self::Eq => json_eq(actual, expected),
            Self::Ne => !json_eq(actual, expected),
            Self::Gt => matches!(json_cmp(actual, expected), Some(Ordering::Greater)),
            Self::Ge => matches!(json_cmp(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            Self::Lt => matches!(json_cmp(actual, expected), Some(Ordering::Less)),
            Self::Le => matches!(json_cmp(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// Regla booleana sobre campos de la instancia/paciente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Condition {
    Compare { field: String, op: CompareOp, value: Value },
    OneOf { field: String, values: Vec<Value> },
    Exists { field: String },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare { field: field.into(),
                        op,
                        value: value.into() }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists { field: field.into() }
    }

    pub fn negate(condition: Condition) -> Self {
        Self::Not { condition: Box::new(condition) }
    }

    /// Evaluación pura: no modifica el contexto y puede repetirse.
    pub fn evaluate(&self, ctx: &InstanceContext) -> bool {
        match self {
            Self::Compare { field, op, value } => ctx.get(field).is_some_and(|actual| op.apply(actual, value)),
            Self::OneOf { field, values } => {
                ctx.get(field).is_some_and(|actual| values.iter().any(|v| json_eq(actual, v)))
            }
            Self::Exists { field } => ctx.get(field).is_some_and(|v| !v.is_null()),
            Self::All { conditions } => conditions.iter().all(|c| c.evaluate(ctx)),
            Self::Any { conditions } => conditions.iter().any(|c| c.evaluate(ctx)),
            Self::Not { condition } => !condition.evaluate(ctx),
        }
    }
}

// 25 y 25.0 se consideran iguales.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
