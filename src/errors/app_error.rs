use opflow_core::InvokeError;
use opflow_pool::PoolError;
use thiserror::Error;

/// Errores de la aplicación (binario de demo y clientes de la fachada).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de invocación: {0}")]
    Invoke(#[from] InvokeError),
    #[error("Error de pool: {0}")]
    Pool(#[from] PoolError),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("Validación de demo fallida: {0}")]
    Demo(String),
}
