//! Motor de coerción de valores.
//!
//! Convierte valores sueltos en algo asignable a la forma declarada de un
//! parámetro: recursión estructural para secuencias/mapas, evaluación de
//! expresiones delimitadas y, como último recurso, el registro de
//! transformers del host.

pub mod engine;
pub mod expression;
pub mod transformer;

pub use engine::CoercionEngine;
pub use expression::{ExpressionEvaluator, MessageExpressionEvaluator};
pub use transformer::{EnumTransformer, SimpleTransformerRegistry, Transformer, TransformerRegistry};
