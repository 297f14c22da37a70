//! Carga de configuración del runtime desde variables de entorno.
//! Usa `OPFLOW_EXPRESSION_PREFIX`, `OPFLOW_EXPRESSION_SUFFIX` y
//! `OPFLOW_MAX_RETRY_ATTEMPTS`; valores ausentes o inválidos caen a los
//! defaults de `constants`.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::constants::{DEFAULT_EXPRESSION_PREFIX, DEFAULT_EXPRESSION_SUFFIX, DEFAULT_MAX_RETRY_ATTEMPTS};

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Ajustes globales del protocolo, evaluados una sola vez.
pub static SETTINGS: Lazy<RuntimeSettings> = Lazy::new(RuntimeSettings::from_env);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub expression_prefix: String,
    pub expression_suffix: String,
    pub max_retry_attempts: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { expression_prefix: DEFAULT_EXPRESSION_PREFIX.to_string(),
               expression_suffix: DEFAULT_EXPRESSION_SUFFIX.to_string(),
               max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS }
    }
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let expression_prefix = env::var("OPFLOW_EXPRESSION_PREFIX").ok()
                                                                   .filter(|v| !v.is_empty())
                                                                   .unwrap_or(defaults.expression_prefix);
        let expression_suffix = env::var("OPFLOW_EXPRESSION_SUFFIX").ok()
                                                                   .filter(|v| !v.is_empty())
                                                                   .unwrap_or(defaults.expression_suffix);
        let max_retry_attempts = env::var("OPFLOW_MAX_RETRY_ATTEMPTS").ok()
                                                                     .and_then(|v| v.parse().ok())
                                                                     .unwrap_or(defaults.max_retry_attempts);
        Self { expression_prefix,
               expression_suffix,
               max_retry_attempts }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
