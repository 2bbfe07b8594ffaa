//! Constantes del motor core.
//!
//! Agrupa valores estáticos compartidos por el editor, el historial y el
//! cálculo de fingerprints. `ENGINE_VERSION` forma parte del input del hashing
//! de plantillas publicadas: cambiarlo invalida los `definition_hash`
//! existentes aunque el grafo no cambie.

/// Versión lógica del motor. Se incluye en el hash de publicación.
pub const ENGINE_VERSION: &str = "W1.0";

/// Etiqueta de la primera entrada del historial tras `init`.
pub const INITIAL_STATE_LABEL: &str = "INITIAL_STATE";

/// Capacidad por defecto del historial de undo/redo de un editor.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Horas por día usadas al convertir estimaciones.
pub const HOURS_PER_DAY: f64 = 24.0;
/// Días por semana.
pub const DAYS_PER_WEEK: f64 = 7.0;
/// Días por mes (aproximación fija).
pub const DAYS_PER_MONTH: f64 = 30.0;
