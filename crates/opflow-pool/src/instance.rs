//! Pool de instancias sin estado sobre r2d2.

use log::debug;
use opflow_core::errors::ResourceError;
use opflow_core::resource::ObjectPool;

use crate::config::PoolingProfile;
use crate::error::PoolError;

/// Crea las instancias que presta el pool.
pub trait InstanceFactory: Send + Sync + 'static {
    type Instance: Send + 'static;

    fn create(&self) -> Result<Self::Instance, PoolError>;

    /// Se consulta en cada préstamo; una instancia inválida se descarta.
    fn validate(&self, _instance: &mut Self::Instance) -> bool {
        true
    }
}

/// Adaptador `InstanceFactory` → `r2d2::ManageConnection`.
pub struct InstanceManager<F: InstanceFactory>(F);

impl<F: InstanceFactory> r2d2::ManageConnection for InstanceManager<F> {
    type Connection = F::Instance;
    type Error = PoolError;

    fn connect(&self) -> Result<F::Instance, PoolError> {
        self.0.create()
    }

    fn is_valid(&self, instance: &mut F::Instance) -> Result<(), PoolError> {
        if self.0.validate(instance) {
            Ok(())
        } else {
            Err(PoolError::Invalid)
        }
    }

    fn has_broken(&self, _instance: &mut F::Instance) -> bool {
        false
    }
}

pub struct InstancePool<F: InstanceFactory> {
    pool: r2d2::Pool<InstanceManager<F>>,
}

impl<F: InstanceFactory> InstancePool<F> {
    pub fn new(factory: F, profile: &PoolingProfile) -> Self {
        Self { pool: profile.builder().build_unchecked(InstanceManager(factory)) }
    }

    pub fn state(&self) -> r2d2::State {
        self.pool.state()
    }
}

impl<F: InstanceFactory> ObjectPool for InstancePool<F> {
    type Instance = r2d2::PooledConnection<InstanceManager<F>>;

    fn borrow(&self) -> Result<Self::Instance, ResourceError> {
        self.pool.get().map_err(|e| ResourceError::Timeout(format!("pooled instance ({e})")))
    }

    fn give_back(&self, instance: Self::Instance) {
        debug!("Returning instance to pool [idle={}]", self.pool.state().idle_connections);
        drop(instance);
    }
}
