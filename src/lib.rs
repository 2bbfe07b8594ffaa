//! CareFlow
//!
//! Librería de aplicación sobre `careflow-core`:
//! - Expone `errors` para manejar errores de núcleo y dominio.
//! - Expone `config` para la configuración por entorno (.env).
//! - Expone `demo` con el recorrido completo usado por el binario.

pub mod config;
pub mod demo;
pub mod errors;
