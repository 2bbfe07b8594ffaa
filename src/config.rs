//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y construye un `AppConfig` inmutable.
//! Valores ausentes caen a los valores por defecto; valores ilegibles son un
//! `CoreError::Config`.
use std::env;

use careflow_core::constants::DEFAULT_MAX_HISTORY;
use once_cell::sync::Lazy;

use crate::errors::CoreError;

pub const MAX_HISTORY_VAR: &str = "CAREFLOW_MAX_HISTORY";
pub const LOG_VAR: &str = "CAREFLOW_LOG";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv(); // ignora error si no existe .env
});

/// Configuración global de la aplicación.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Capacidad del historial de undo/redo de cada sesión de edición (>= 1).
    pub max_history: usize,
    /// Filtro de log por defecto cuando `RUST_LOG` no está definido.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { max_history: DEFAULT_MAX_HISTORY,
               log_level: DEFAULT_LOG_LEVEL.to_string() }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de claves.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let max_history = match lookup(MAX_HISTORY_VAR) {
            None => DEFAULT_MAX_HISTORY,
            Some(raw) => raw.trim()
                            .parse::<usize>()
                            .map_err(|e| CoreError::Config(format!("{MAX_HISTORY_VAR}='{raw}': {e}")))?,
        };
        if max_history == 0 {
            log::warn!("{MAX_HISTORY_VAR}=0, se usa 1");
        }
        let log_level = lookup(LOG_VAR).map(|v| v.trim().to_string())
                                       .filter(|v| !v.is_empty())
                                       .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        Ok(Self { max_history: max_history.max(1),
                  log_level })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

/// Inicializa `env_logger`; `RUST_LOG` tiene prioridad sobre `CAREFLOW_LOG`.
/// Llamadas repetidas no fallan.
pub fn init_logging(config: &AppConfig) {
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();
}
