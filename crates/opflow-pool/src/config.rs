//! Perfil de pooling desde variables de entorno.
//! `OPFLOW_POOL_MAX_ACTIVE`, `OPFLOW_POOL_MAX_WAIT_MS`,
//! `OPFLOW_POOL_IDLE_TIMEOUT_MS` y `OPFLOW_POOL_EXHAUSTED_ACTION`
//! (`BLOCK` | `FAIL`).

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Qué hacer cuando no quedan recursos libres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedAction {
    /// Esperar hasta `max_wait`.
    Block,
    /// Fallar casi de inmediato (r2d2 no tiene checkout no bloqueante).
    Fail,
}

impl ExhaustedAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BLOCK" | "WHEN_EXHAUSTED_WAIT" => Some(ExhaustedAction::Block),
            "FAIL" | "WHEN_EXHAUSTED_FAIL" => Some(ExhaustedAction::Fail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolingProfile {
    pub max_active: u32,
    pub max_wait: Duration,
    pub idle_timeout: Option<Duration>,
    pub exhausted_action: ExhaustedAction,
}

impl Default for PoolingProfile {
    fn default() -> Self {
        Self { max_active: 5,
               max_wait: Duration::from_millis(5_000),
               idle_timeout: Some(Duration::from_secs(600)),
               exhausted_action: ExhaustedAction::Block }
    }
}

impl PoolingProfile {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let defaults = Self::default();
        let max_active = env::var("OPFLOW_POOL_MAX_ACTIVE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.max_active);
        let max_wait = env::var("OPFLOW_POOL_MAX_WAIT_MS").ok()
                                                         .and_then(|v| v.parse().ok())
                                                         .map(Duration::from_millis)
                                                         .unwrap_or(defaults.max_wait);
        let idle_timeout = env::var("OPFLOW_POOL_IDLE_TIMEOUT_MS").ok()
                                                                 .and_then(|v| v.parse().ok())
                                                                 .map(|ms: u64| if ms == 0 { None } else { Some(Duration::from_millis(ms)) })
                                                                 .unwrap_or(defaults.idle_timeout);
        let exhausted_action = env::var("OPFLOW_POOL_EXHAUSTED_ACTION").ok()
                                                                      .and_then(|v| ExhaustedAction::parse(&v))
                                                                      .unwrap_or(defaults.exhausted_action);
        Self { max_active,
               max_wait,
               idle_timeout,
               exhausted_action }
    }

    pub fn with_max_active(mut self, max_active: u32) -> Self {
        self.max_active = max_active;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_exhausted_action(mut self, action: ExhaustedAction) -> Self {
        self.exhausted_action = action;
        self
    }

    /// Tamaño máximo válido para r2d2 (nunca 0).
    pub(crate) fn effective_max(&self) -> u32 {
        self.max_active.max(1)
    }

    /// Espera efectiva de checkout según la acción de agotamiento.
    pub(crate) fn effective_wait(&self) -> Duration {
        match self.exhausted_action {
            ExhaustedAction::Block if !self.max_wait.is_zero() => self.max_wait,
            _ => Duration::from_millis(1),
        }
    }

    /// Builder r2d2 configurado con este perfil. Sin conexiones inactivas
    /// mínimas: todo se crea bajo demanda.
    pub(crate) fn builder<M: r2d2::ManageConnection>(&self) -> r2d2::Builder<M> {
        r2d2::Pool::builder().max_size(self.effective_max())
                             .min_idle(Some(0))
                             .connection_timeout(self.effective_wait())
                             .idle_timeout(self.idle_timeout)
                             .test_on_check_out(true)
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
