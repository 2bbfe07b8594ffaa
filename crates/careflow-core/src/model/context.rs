use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Datos de la instancia/paciente contra los que se evalúan las condiciones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceContext {
    fields: Map<String, Value>,
}

impl InstanceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Busca un campo; `a.b.c` navega objetos anidados.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.fields.get(parts.next()?)?;
        parts.try_fold(first, |current, key| current.as_object()?.get(key))
    }
}

impl From<Map<String, Value>> for InstanceContext {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for InstanceContext {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(format!("instance context must be a JSON object, got {other}")),
        }
    }
}
