//! Errores del protocolo de invocación.
//!
//! `InvokeError` es la taxonomía completa que ve el caller de
//! `OperationProcessor::invoke`. Los colaboradores externos reportan sus
//! fallos con tipos más pequeños (`ResourceError`, `TransformError`,
//! `OperationError`) que el orquestador envuelve con contexto.

use std::error::Error as StdError;

use thiserror::Error;

use crate::shape::ClassRef;

/// Fallo lanzado por la operación envuelta.
///
/// `class` identifica el tipo de error (p.ej. `"SessionExpired"`) y es lo
/// que inspecciona la política de invalidación.
#[derive(Debug, Error)]
#[error("{class}: {message}")]
pub struct OperationError {
    pub class: String,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl OperationError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self { class: class.into(),
               message: message.into(),
               cause: None }
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }
}

/// Un nested processor que falla dentro de una operación se reporta a la
/// operación como `OperationError` de clase `NestedProcessorError`.
impl From<InvokeError> for OperationError {
    fn from(err: InvokeError) -> Self {
        OperationError::new("NestedProcessorError", err.to_string()).with_cause(err)
    }
}

/// No existe transformer registrado para llevar un valor a la clase esperada.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no transformer found from {from} to {to}{}", .mime_type.as_deref().map(|m| format!(" ({m})")).unwrap_or_default())]
pub struct CoercionError {
    pub from: ClassRef,
    pub to: ClassRef,
    pub mime_type: Option<String>,
}

/// El transformer encontrado falló al convertir el valor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transformer {transformer} failed: {reason}")]
pub struct TransformError {
    pub transformer: String,
    pub reason: String,
}

impl TransformError {
    pub fn new(transformer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { transformer: transformer.into(),
               reason: reason.into() }
    }
}

/// Fallo reportado por un pool o un connection manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{0} default configurations are registered; a config reference is required")]
    AmbiguousConfiguration(usize),
    #[error("configuration not found: {0}")]
    ConfigNotFound(String),
    #[error("failed to create {operation}: you must provide a {parameter} at the config or the message processor level")]
    MissingConnectionParameter { operation: String, parameter: String },
    #[error("failed to create {operation}: cannot create connection{}", .reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    ConnectionCreationFailed { operation: String, reason: Option<String> },
    #[error("failed to create {operation}: cannot borrow a pooled instance ({reason})")]
    InstanceBorrowFailed { operation: String, reason: String },
    #[error("{operation}: {detail}")]
    ResourceTimeout { operation: String, detail: String },
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("invalid argument {parameter}: {reason}")]
    InvalidArgument { parameter: String, reason: String },
    #[error("failed to evaluate expression {expression}: {reason}")]
    Expression { expression: String, reason: String },
    #[error("failed to invoke {operation}")]
    OperationInvocation {
        operation: String,
        #[source]
        cause: OperationError,
    },
    #[error("failed to invoke {operation} after {attempts} attempt(s) [connection id = {}]", .connection_id.as_deref().unwrap_or("unknown"))]
    RetryExhausted {
        operation: String,
        connection_id: Option<String>,
        attempts: u32,
        #[source]
        cause: OperationError,
    },
    #[error("failed to release resources of {operation}: {reason}")]
    ResourceRelease { operation: String, reason: String },
    #[error("lifecycle failure: {0}")]
    Lifecycle(String),
}

impl InvokeError {
    /// Traduce un `ResourceError` de `ConnectionManager::acquire`.
    pub(crate) fn from_acquire(operation: &str, err: ResourceError) -> Self {
        match err {
            ResourceError::Timeout(detail) => Self::timeout(operation, detail),
            ResourceError::Failed(reason) => InvokeError::ConnectionCreationFailed { operation: operation.to_string(),
                                                                                     reason: Some(reason) },
        }
    }

    /// Traduce un `ResourceError` de `ObjectPool::borrow`.
    pub(crate) fn from_borrow(operation: &str, err: ResourceError) -> Self {
        match err {
            ResourceError::Timeout(detail) => Self::timeout(operation, detail),
            ResourceError::Failed(reason) => InvokeError::InstanceBorrowFailed { operation: operation.to_string(),
                                                                                 reason },
        }
    }

    fn timeout(operation: &str, detail: String) -> Self {
        InvokeError::ResourceTimeout { operation: operation.to_string(),
                                       detail: format!("timed out waiting for {detail}") }
    }
}
