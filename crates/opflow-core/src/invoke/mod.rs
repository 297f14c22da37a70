//! Orquestación de invocaciones.
//!
//! `OperationProcessor` envuelve una operación y aplica el protocolo
//! completo (configuración, coerción, recursos, post-proceso); los nested
//! processors y los message sources se apoyan en él.

pub mod args;
pub mod callback;
pub mod chain;
pub mod config;
pub mod nested;
pub mod operation;
pub mod processor;
pub mod signature;
pub mod source;

pub use args::{Argument, Arguments, RawArgument};
pub use callback::{InterceptCallback, SourceCallback};
pub use chain::{FnProcessor, MessageProcessor, ProcessorChain};
pub use config::{ConfigRegistry, InMemoryConfigRegistry, ModuleConfig};
pub use nested::NestedProcessor;
pub use operation::{Operation, Target};
pub use processor::{InvalidationPolicy, OperationProcessor, ProcessorBuilder};
pub use signature::{OperationSignature, ParameterKind, ParameterSpec, SignatureBuilder};
pub use source::{MessageSource, ThreadingModel};
