//! Errores de los factories y pools.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("cannot create pooled instance: {0}")]
    Create(String),
    #[error("cannot connect: {0}")]
    Connect(String),
    #[error("connection is no longer valid")]
    Invalid,
    #[error("cannot disconnect: {0}")]
    Disconnect(String),
}
