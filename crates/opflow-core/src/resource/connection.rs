//! Conexiones compartidas identificadas por `ConnectionKey`.

use log::{debug, error};

use super::key::ConnectionKey;
use crate::errors::ResourceError;

/// Gestor externo de conexiones.
///
/// `acquire` devuelve `Ok(None)` cuando no pudo crear la conexión; un
/// timeout se reporta como `ResourceError::Timeout`.
pub trait ConnectionManager: Send + Sync {
    type Connection: Send;

    fn acquire(&self, key: &ConnectionKey) -> Result<Option<Self::Connection>, ResourceError>;
    fn release(&self, key: &ConnectionKey, connection: Self::Connection) -> Result<(), ResourceError>;
    fn invalidate(&self, key: &ConnectionKey, connection: Self::Connection) -> Result<(), ResourceError>;

    /// Identificador legible de la conexión para logs y errores.
    fn connection_id(&self, _connection: &Self::Connection) -> Option<String> {
        None
    }
}

/// Gestor vacío para operaciones sin conexión.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConnections;

impl ConnectionManager for NoConnections {
    type Connection = ();

    fn acquire(&self, _key: &ConnectionKey) -> Result<Option<()>, ResourceError> {
        Ok(None)
    }

    fn release(&self, _key: &ConnectionKey, _connection: ()) -> Result<(), ResourceError> {
        Ok(())
    }

    fn invalidate(&self, _key: &ConnectionKey, _connection: ()) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Conexión adquirida por una invocación.
///
/// Se cierra con `release` o `invalidate`; si el lease se descarta sin
/// cerrarse, el `Drop` la libera y sólo registra el error.
pub struct ConnectionLease<'a, M: ConnectionManager> {
    manager: &'a M,
    key: ConnectionKey,
    connection: Option<M::Connection>,
    id: Option<String>,
}

impl<'a, M: ConnectionManager> ConnectionLease<'a, M> {
    /// `Ok(None)` si el gestor no pudo crear la conexión.
    pub fn acquire(manager: &'a M, key: ConnectionKey) -> Result<Option<Self>, ResourceError> {
        debug!("Attempting to acquire a connection using {key}");
        let Some(connection) = manager.acquire(&key)? else {
            return Ok(None);
        };
        let id = manager.connection_id(&connection);
        debug!("Connection has been acquired with [id = {}]", id.as_deref().unwrap_or("unknown"));
        Ok(Some(Self { manager,
                       key,
                       connection: Some(connection),
                       id }))
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn connection_mut(&mut self) -> Option<&mut M::Connection> {
        self.connection.as_mut()
    }

    pub fn release(mut self) -> Result<(), ResourceError> {
        match self.connection.take() {
            Some(connection) => {
                debug!("Releasing the connection back into the pool [id={}]", self.id.as_deref().unwrap_or("unknown"));
                self.manager.release(&self.key, connection)
            }
            None => Ok(()),
        }
    }

    pub fn invalidate(mut self) -> Result<(), ResourceError> {
        match self.connection.take() {
            Some(connection) => {
                debug!("An exception occurred while using the connection [id={}], invalidating it",
                       self.id.as_deref().unwrap_or("unknown"));
                self.manager.invalidate(&self.key, connection)
            }
            None => Ok(()),
        }
    }
}

impl<M: ConnectionManager> Drop for ConnectionLease<'_, M> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(e) = self.manager.release(&self.key, connection) {
                error!("Failed to release connection [id={}]: {e}", self.id.as_deref().unwrap_or("unknown"));
            }
        }
    }
}
