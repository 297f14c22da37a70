//! Ciclo de vida de recursos: instancias de pool, conexiones por clave y
//! estado de reintentos.
//!
//! Las adquisiciones devuelven leases que se devuelven a su dueño
//! exactamente una vez, también cuando la invocación falla.

pub mod connection;
pub mod key;
pub mod pool;
pub mod retry;

pub use connection::{ConnectionLease, ConnectionManager, NoConnections};
pub use key::ConnectionKey;
pub use pool::{NoPool, ObjectPool, PooledLease};
pub use retry::RetryState;
