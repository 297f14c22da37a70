//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable
//! (`CONFIG`) con los ajustes del runtime y el perfil de pooling.
use once_cell::sync::Lazy;
use opflow_core::config::RuntimeSettings;
use opflow_pool::PoolingProfile;

use crate::errors::AppError;

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Delimitadores de expresiones y cota de reintentos.
    pub runtime: RuntimeSettings,
    /// Perfil usado por los pools de instancias y de conexiones.
    pub pooling: PoolingProfile,
}

impl AppConfig {
    pub fn from_env() -> Self {
        opflow_core::config::init_dotenv();
        opflow_pool::init_dotenv();
        Self { runtime: RuntimeSettings::from_env(),
               pooling: PoolingProfile::from_env() }
    }

    /// Rechaza combinaciones con las que ningún pool o expresión funciona.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.pooling.max_active == 0 {
            return Err(AppError::Config("OPFLOW_POOL_MAX_ACTIVE debe ser >= 1".into()));
        }
        if self.pooling.max_wait.is_zero() {
            return Err(AppError::Config("OPFLOW_POOL_MAX_WAIT_MS debe ser > 0".into()));
        }
        if self.runtime.expression_prefix == self.runtime.expression_suffix {
            return Err(AppError::Config(format!("prefijo y sufijo de expresión no pueden coincidir ('{}')", self.runtime.expression_prefix)));
        }
        Ok(())
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);
