//! `CoercionEngine`: coerción recursiva de un valor a una forma declarada.

use std::sync::Arc;

use log::debug;

use super::expression::ExpressionEvaluator;
use super::transformer::TransformerRegistry;
use crate::errors::{CoercionError, InvokeError};
use crate::model::{Event, Value};
use crate::shape::{DeclaredType, Shape, TypeResolver};

#[derive(Clone)]
pub struct CoercionEngine {
    resolver: TypeResolver,
    evaluator: Arc<dyn ExpressionEvaluator>,
    registry: Arc<dyn TransformerRegistry>,
}

impl CoercionEngine {
    pub fn new(resolver: TypeResolver, evaluator: Arc<dyn ExpressionEvaluator>, registry: Arc<dyn TransformerRegistry>) -> Self {
        Self { resolver,
               evaluator,
               registry }
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    pub fn evaluator(&self) -> &Arc<dyn ExpressionEvaluator> {
        &self.evaluator
    }

    pub fn coerce_declared(&self, value: Value, declared: &DeclaredType, mime_type: Option<&str>, event: &Event) -> Result<Value, InvokeError> {
        self.coerce(value, &self.resolver.resolve(declared), mime_type, event)
    }

    /// Lleva `value` a algo asignable a `shape`.
    ///
    /// Secuencias y mapas se reconstruyen elemento a elemento sólo si la forma
    /// declarada también lo es; en otro caso pasan tal cual al camino
    /// genérico (expresión + transformer). Sólo falla si hace falta un
    /// transformer que no existe o que rechaza el valor.
    pub fn coerce(&self, value: Value, shape: &Shape, mime_type: Option<&str>, event: &Event) -> Result<Value, InvokeError> {
        let working = match (value, shape) {
            (Value::Null, _) => return Ok(Value::Null),
            (Value::Seq(items), Shape::Sequence(element)) => {
                let coerced = items.into_iter()
                                   .map(|item| self.coerce(item, element, mime_type, event))
                                   .collect::<Result<Vec<_>, _>>()?;
                Value::Seq(coerced)
            }
            (Value::Map(entries), Shape::Mapping(key_shape, value_shape)) => {
                let mut coerced: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    let k = self.coerce(k, key_shape, mime_type, event)?;
                    let v = self.coerce(v, value_shape, mime_type, event)?;
                    // Dos claves que coinciden tras la coerción colapsan en una.
                    match coerced.iter_mut().find(|(existing, _)| *existing == k) {
                        Some(slot) => slot.1 = v,
                        None => coerced.push((k, v)),
                    }
                }
                Value::Map(coerced)
            }
            (Value::Str(s), _) if self.evaluator.matches(&s) => self.evaluator.evaluate(&s, event)?,
            (other, _) => other,
        };
        self.transform_if_needed(working, shape, mime_type)
    }

    fn transform_if_needed(&self, working: Value, shape: &Shape, mime_type: Option<&str>) -> Result<Value, InvokeError> {
        let Some(runtime) = working.runtime_class() else {
            return Ok(working);
        };
        if self.resolver.is_assignable(shape, &runtime) {
            return Ok(working);
        }
        let target = shape.target_class();
        let transformer = self.registry
                              .lookup(&runtime, &target, mime_type)
                              .ok_or_else(|| CoercionError { from: runtime.clone(),
                                                             to: target.clone(),
                                                             mime_type: mime_type.map(str::to_string) })?;
        debug!("Transforming {} into {} using {}", runtime, target, transformer.name());
        Ok(transformer.transform(working)?)
    }
}
