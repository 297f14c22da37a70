//! Constantes del protocolo de invocación.
//!
//! Valores por defecto compartidos por la configuración (`config`) y por el
//! evaluador de expresiones. Las variables de entorno sólo los sobreescriben.

/// Prefijo por defecto que delimita una expresión (`#[payload]`).
pub const DEFAULT_EXPRESSION_PREFIX: &str = "#[";

/// Sufijo por defecto que delimita una expresión.
pub const DEFAULT_EXPRESSION_SUFFIX: &str = "]";

/// Reintentos adicionales tras el primer intento cuando una operación falla
/// con un error que invalida la conexión.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 1;

/// Nombre del hilo dedicado de un `MessageSource` en modo `SingleThread`.
pub const SOURCE_THREAD_NAME: &str = "receiving-thread";
