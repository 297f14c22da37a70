//! Conexiones compartidas: un pool r2d2 por `ConnectionKey`.
//!
//! `invalidate` marca la conexión como rota; al devolverla, r2d2 la descarta
//! y el `Drop` de `ManagedConnection` ejecuta `disconnect`.
//!
//! r2d2 reintenta `connect` en segundo plano hasta agotar el timeout; el
//! último error de conexión de cada clave se guarda para que `acquire`
//! distinga "no se pudo conectar" (`ResourceError::Failed`) de "pool
//! agotado" (`ResourceError::Timeout`).
//!
//! Cada clave distinta crea su propio pool. Los pools que se quedan sin
//! conexiones (invalidadas o expiradas por `idle_timeout`) se retiran con
//! `evict_idle_pools`, que también corre tras cada invalidación y cada
//! fallo de conexión.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use log::{debug, warn};
use opflow_core::errors::ResourceError;
use opflow_core::resource::{ConnectionKey, ConnectionManager};
use uuid::Uuid;

use crate::config::PoolingProfile;
use crate::error::PoolError;

/// Conecta, valida y desconecta conexiones de un módulo.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + 'static;

    fn connect(&self, key: &ConnectionKey) -> Result<Self::Connection, PoolError>;

    /// ¿Sigue conectada? Se consulta en cada checkout.
    fn is_connected(&self, _connection: &mut Self::Connection) -> bool {
        true
    }

    fn disconnect(&self, _connection: &mut Self::Connection) -> Result<(), PoolError> {
        Ok(())
    }
}

/// Conexión gestionada por el pool, con identificador propio.
pub struct ManagedConnection<F: ConnectionFactory> {
    inner: F::Connection,
    id: Uuid,
    broken: bool,
    factory: Arc<F>,
}

impl<F: ConnectionFactory> ManagedConnection<F> {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<F: ConnectionFactory> Deref for ManagedConnection<F> {
    type Target = F::Connection;

    fn deref(&self) -> &F::Connection {
        &self.inner
    }
}

impl<F: ConnectionFactory> DerefMut for ManagedConnection<F> {
    fn deref_mut(&mut self) -> &mut F::Connection {
        &mut self.inner
    }
}

impl<F: ConnectionFactory> Drop for ManagedConnection<F> {
    fn drop(&mut self) {
        debug!("Disconnecting [id={}]", self.id);
        if let Err(e) = self.factory.disconnect(&mut self.inner) {
            warn!("Failed to disconnect [id={}]: {e}", self.id);
        }
    }
}

/// `ManageConnection` de una única clave.
pub struct KeyedManager<F: ConnectionFactory> {
    factory: Arc<F>,
    key: ConnectionKey,
}

impl<F: ConnectionFactory> r2d2::ManageConnection for KeyedManager<F> {
    type Connection = ManagedConnection<F>;
    type Error = PoolError;

    fn connect(&self) -> Result<ManagedConnection<F>, PoolError> {
        let inner = self.factory.connect(&self.key)?;
        let id = Uuid::new_v4();
        debug!("Connected [id={id}] for {}", self.key);
        Ok(ManagedConnection { inner,
                               id,
                               broken: false,
                               factory: self.factory.clone() })
    }

    fn is_valid(&self, conn: &mut ManagedConnection<F>) -> Result<(), PoolError> {
        if self.factory.is_connected(&mut conn.inner) {
            Ok(())
        } else {
            Err(PoolError::Invalid)
        }
    }

    fn has_broken(&self, conn: &mut ManagedConnection<F>) -> bool {
        conn.broken
    }
}

/// Guarda el último error de `connect` que r2d2 reporta para una clave.
#[derive(Debug, Clone, Default)]
struct ConnectErrors(Arc<Mutex<Option<PoolError>>>);

impl ConnectErrors {
    fn take(&self) -> Option<PoolError> {
        self.0.lock().ok().and_then(|mut last| last.take())
    }
}

impl r2d2::HandleError<PoolError> for ConnectErrors {
    fn handle_error(&self, error: PoolError) {
        // Sólo los fallos de conexión; `Invalid` es un checkout fallido.
        if let PoolError::Connect(_) | PoolError::Create(_) = error {
            warn!("Connection attempt failed: {error}");
            if let Ok(mut last) = self.0.lock() {
                *last = Some(error);
            }
        }
    }
}

struct KeyedPool<F: ConnectionFactory> {
    pool: r2d2::Pool<KeyedManager<F>>,
    errors: ConnectErrors,
}

impl<F: ConnectionFactory> Clone for KeyedPool<F> {
    fn clone(&self) -> Self {
        Self { pool: self.pool.clone(),
               errors: self.errors.clone() }
    }
}

pub struct KeyedConnectionPool<F: ConnectionFactory> {
    factory: Arc<F>,
    profile: PoolingProfile,
    pools: DashMap<ConnectionKey, KeyedPool<F>>,
}

impl<F: ConnectionFactory> KeyedConnectionPool<F> {
    pub fn new(factory: F, profile: PoolingProfile) -> Self {
        Self { factory: Arc::new(factory),
               profile,
               pools: DashMap::new() }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Número de claves con pool propio.
    pub fn key_count(&self) -> usize {
        self.pools.len()
    }

    pub fn state(&self, key: &ConnectionKey) -> Option<r2d2::State> {
        self.pools.get(key).map(|p| p.pool.state())
    }

    /// Retira los pools sin ninguna conexión (ni prestada ni inactiva) y
    /// devuelve cuántos se retiraron. Un lease en curso mantiene vivo su
    /// pool hasta que se devuelve.
    pub fn evict_idle_pools(&self) -> usize {
        let before = self.pools.len();
        self.pools.retain(|key, p| {
                      let keep = p.pool.state().connections > 0;
                      if !keep {
                          debug!("Evicting connection pool for {key}");
                      }
                      keep
                  });
        before.saturating_sub(self.pools.len())
    }

    fn pool_for(&self, key: &ConnectionKey) -> KeyedPool<F> {
        self.pools
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Creating connection pool for {key} [fingerprint={}]", key.fingerprint());
                let errors = ConnectErrors::default();
                let pool = self.profile
                               .builder()
                               .error_handler(Box::new(errors.clone()))
                               .build_unchecked(KeyedManager { factory: self.factory.clone(),
                                                               key: key.clone() });
                KeyedPool { pool, errors }
            })
            .value()
            .clone()
    }
}

impl<F: ConnectionFactory> ConnectionManager for KeyedConnectionPool<F> {
    type Connection = r2d2::PooledConnection<KeyedManager<F>>;

    fn acquire(&self, key: &ConnectionKey) -> Result<Option<Self::Connection>, ResourceError> {
        let keyed = self.pool_for(key);
        keyed.errors.take();
        match keyed.pool.get() {
            Ok(connection) => Ok(Some(connection)),
            Err(e) => match keyed.errors.take() {
                Some(cause) => {
                    self.evict_idle_pools();
                    Err(ResourceError::Failed(format!("cannot connect for {key}: {cause}")))
                }
                None => Err(ResourceError::Timeout(format!("connection for {key} ({e})"))),
            },
        }
    }

    fn release(&self, _key: &ConnectionKey, connection: Self::Connection) -> Result<(), ResourceError> {
        drop(connection);
        Ok(())
    }

    fn invalidate(&self, _key: &ConnectionKey, mut connection: Self::Connection) -> Result<(), ResourceError> {
        connection.broken = true;
        drop(connection);
        self.evict_idle_pools();
        Ok(())
    }

    fn connection_id(&self, connection: &Self::Connection) -> Option<String> {
        Some(connection.id.to_string())
    }
}
