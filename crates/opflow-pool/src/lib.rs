//! opflow-pool
//!
//! Colaboradores de recursos sobre `r2d2` para el protocolo de invocación:
//! - `instance`: pool de instancias sin estado (`ObjectPool`).
//! - `keyed`: un pool de conexiones por `ConnectionKey` (`ConnectionManager`).
//! - `config`: perfil de pooling desde variables de entorno / .env.

pub mod config;
pub mod error;
pub mod instance;
pub mod keyed;

pub use config::{init_dotenv, ExhaustedAction, PoolingProfile};
pub use error::PoolError;
pub use instance::{InstanceFactory, InstanceManager, InstancePool};
pub use keyed::{ConnectionFactory, KeyedConnectionPool, KeyedManager, ManagedConnection};
