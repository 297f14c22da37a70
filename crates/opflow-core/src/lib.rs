//! opflow-core: protocolo de invocación de operaciones.
//!
//! Capas, de las hojas hacia arriba:
//! - `shape`: clasificación de tipos declarados y asignabilidad.
//! - `coercion`: coerción recursiva de valores (expresiones + transformers).
//! - `resource`: pools, conexiones por clave y reintentos.
//! - `invoke`: el orquestador, nested processors y message sources.
pub mod coercion;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod invoke;
pub mod model;
pub mod resource;
pub mod shape;

pub use coercion::{CoercionEngine, ExpressionEvaluator, MessageExpressionEvaluator, SimpleTransformerRegistry, Transformer, TransformerRegistry};
pub use errors::{CoercionError, InvokeError, OperationError, ResourceError, TransformError};
pub use invoke::{Arguments, FnProcessor, InMemoryConfigRegistry, MessageProcessor, MessageSource, ModuleConfig, NestedProcessor, OperationProcessor,
                 OperationSignature, ProcessorChain, RawArgument, Target, ThreadingModel};
pub use model::{Event, Message, PropertyScope, Value};
pub use resource::{ConnectionKey, ConnectionManager, ObjectPool, RetryState};
pub use shape::{ClassHierarchy, ClassRef, DeclaredType, Shape, TypeResolver};

use std::sync::Arc;

/// Motor de coerción con la jerarquía builtin, el evaluador de mensajes y
/// los transformers builtin.
pub fn default_engine() -> CoercionEngine {
    let hierarchy = Arc::new(ClassHierarchy::with_builtins());
    CoercionEngine::new(TypeResolver::new(hierarchy.clone()),
                        Arc::new(MessageExpressionEvaluator::default()),
                        Arc::new(SimpleTransformerRegistry::with_builtins(hierarchy)))
}
