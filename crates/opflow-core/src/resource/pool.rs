//! Pool de instancias sin estado.

use log::debug;

use crate::errors::ResourceError;

/// Pool de ejecutores sin estado. `borrow` puede bloquear hasta el timeout
/// propio del pool y debe reportarlo como `ResourceError::Timeout`.
pub trait ObjectPool: Send + Sync {
    type Instance: Send;

    fn borrow(&self) -> Result<Self::Instance, ResourceError>;
    fn give_back(&self, instance: Self::Instance);
}

/// Pool vacío para operaciones que no usan instancias pooled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPool;

impl ObjectPool for NoPool {
    type Instance = ();

    fn borrow(&self) -> Result<(), ResourceError> {
        Err(ResourceError::Failed("no object pool configured".to_string()))
    }

    fn give_back(&self, _instance: ()) {}
}

/// Instancia prestada; vuelve al pool al salir de scope.
pub struct PooledLease<'a, P: ObjectPool> {
    pool: &'a P,
    instance: Option<P::Instance>,
}

impl<'a, P: ObjectPool> PooledLease<'a, P> {
    pub fn borrow(pool: &'a P) -> Result<Self, ResourceError> {
        let instance = pool.borrow()?;
        Ok(Self { pool,
                  instance: Some(instance) })
    }

    pub fn instance_mut(&mut self) -> Option<&mut P::Instance> {
        self.instance.as_mut()
    }
}

impl<P: ObjectPool> Drop for PooledLease<'_, P> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            debug!("Returning pooled instance");
            self.pool.give_back(instance);
        }
    }
}
