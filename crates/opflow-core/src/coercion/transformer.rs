//! Transformers y registro de transformers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::errors::TransformError;
use crate::model::Value;
use crate::shape::{ClassHierarchy, ClassRef};

/// Función de conversión registrada para un par origen→destino.
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;
    fn transform(&self, value: Value) -> Result<Value, TransformError>;
}

impl fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transformer").field(&self.name()).finish()
    }
}

/// Registro del host consultado por el motor de coerción. Nunca se muta
/// desde el protocolo.
pub trait TransformerRegistry: Send + Sync {
    fn lookup(&self, source: &ClassRef, target: &ClassRef, mime_type: Option<&str>) -> Option<Arc<dyn Transformer>>;
}

type Key = (ClassRef, ClassRef, Option<String>);

/// Registro en memoria con búsqueda exacta, luego sin mime type y luego
/// subiendo por la jerarquía de la clase origen.
pub struct SimpleTransformerRegistry {
    hierarchy: Arc<ClassHierarchy>,
    entries: HashMap<Key, Arc<dyn Transformer>>,
}

impl SimpleTransformerRegistry {
    pub fn new(hierarchy: Arc<ClassHierarchy>) -> Self {
        Self { hierarchy,
               entries: HashMap::new() }
    }

    /// Registro con los conversores de texto a número/booleano.
    pub fn with_builtins(hierarchy: Arc<ClassHierarchy>) -> Self {
        let mut reg = Self::new(hierarchy);
        for kind in [Parsed::Int, Parsed::Long, Parsed::Double, Parsed::Bool] {
            let t: Arc<dyn Transformer> = Arc::new(StringParser { kind });
            let (primitive, boxed) = kind.targets();
            reg.register_arc("String", primitive, None, t.clone());
            reg.register_arc("String", boxed, None, t);
        }
        reg
    }

    pub fn register(&mut self, source: &str, target: &str, mime_type: Option<&str>, transformer: impl Transformer + 'static) -> &mut Self {
        self.register_arc(source, target, mime_type, Arc::new(transformer))
    }

    pub fn register_arc(&mut self, source: &str, target: &str, mime_type: Option<&str>, transformer: Arc<dyn Transformer>) -> &mut Self {
        self.entries.insert((ClassRef::new(source), ClassRef::new(target), mime_type.map(str::to_string)), transformer);
        self
    }

    fn find(&self, source: &ClassRef, target: &ClassRef, mime_type: Option<&str>) -> Option<Arc<dyn Transformer>> {
        if let Some(mime) = mime_type {
            if let Some(t) = self.entries.get(&(source.clone(), target.clone(), Some(mime.to_string()))) {
                return Some(t.clone());
            }
        }
        self.entries.get(&(source.clone(), target.clone(), None)).cloned()
    }
}

impl TransformerRegistry for SimpleTransformerRegistry {
    fn lookup(&self, source: &ClassRef, target: &ClassRef, mime_type: Option<&str>) -> Option<Arc<dyn Transformer>> {
        // compute_hierarchy arranca por la propia clase.
        self.hierarchy
            .compute_hierarchy(source)
            .iter()
            .find_map(|class| self.find(class, target, mime_type))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parsed {
    Int,
    Long,
    Double,
    Bool,
}

impl Parsed {
    fn targets(self) -> (&'static str, &'static str) {
        match self {
            Parsed::Int => ("int", "Integer"),
            Parsed::Long => ("long", "Long"),
            Parsed::Double => ("double", "Double"),
            Parsed::Bool => ("boolean", "Boolean"),
        }
    }
}

struct StringParser {
    kind: Parsed,
}

impl Transformer for StringParser {
    fn name(&self) -> &str {
        match self.kind {
            Parsed::Int => "StringToInteger",
            Parsed::Long => "StringToLong",
            Parsed::Double => "StringToDouble",
            Parsed::Bool => "StringToBoolean",
        }
    }

    fn transform(&self, value: Value) -> Result<Value, TransformError> {
        let text = value.as_str().ok_or_else(|| TransformError::new(self.name(), format!("expected a string, got {value:?}")))?;
        let bad = |e: &dyn fmt::Display| TransformError::new(self.name(), format!("cannot parse {text:?}: {e}"));
        let text = text.trim();
        match self.kind {
            Parsed::Int => text.parse::<i32>().map(Value::Int).map_err(|e| bad(&e)),
            Parsed::Long => text.parse::<i64>().map(Value::Long).map_err(|e| bad(&e)),
            Parsed::Double => text.parse::<f64>().map(Value::Double).map_err(|e| bad(&e)),
            Parsed::Bool => text.parse::<bool>().map(Value::Bool).map_err(|e| bad(&e)),
        }
    }
}

/// String → constante de un enum del host (coincidencia exacta).
#[derive(Debug, Clone)]
pub struct EnumTransformer {
    name: String,
    class: ClassRef,
    constants: Vec<String>,
}

impl EnumTransformer {
    pub fn new(class: &str, constants: &[&str]) -> Self {
        Self { name: format!("StringTo{class}"),
               class: ClassRef::new(class),
               constants: constants.iter().map(|c| c.to_string()).collect() }
    }
}

impl Transformer for EnumTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, value: Value) -> Result<Value, TransformError> {
        match value.as_str() {
            Some(s) if self.constants.iter().any(|c| c == s) => Ok(Value::Object { class: self.class.clone(),
                                                                                   data: json!(s) }),
            _ => Err(TransformError::new(&self.name, format!("{value:?} is not a constant of {}", self.class))),
        }
    }
}
