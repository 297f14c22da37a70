//! Trait de la operación envuelta.

use super::args::Arguments;
use super::config::ModuleConfig;
use crate::errors::OperationError;
use crate::model::Value;

/// Recursos disponibles para una llamada.
pub struct Target<'a, C, I> {
    pub config: &'a ModuleConfig,
    pub connection: Option<&'a mut C>,
    pub instance: Option<&'a mut I>,
}

/// Operación de un módulo de integración.
///
/// `C` es la conexión del `ConnectionManager` y `I` la instancia del
/// `ObjectPool`; `()` cuando no aplican. Una operación void devuelve
/// `Value::Null`.
pub trait Operation<C, I>: Send + Sync {
    fn call(&self, target: Target<'_, C, I>, args: &mut Arguments) -> Result<Value, OperationError>;
}

impl<C, I, F> Operation<C, I> for F where F: Fn(Target<'_, C, I>, &mut Arguments) -> Result<Value, OperationError> + Send + Sync
{
    fn call(&self, target: Target<'_, C, I>, args: &mut Arguments) -> Result<Value, OperationError> {
        self(target, args)
    }
}
