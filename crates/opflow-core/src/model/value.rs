//! `Value`: representación dinámica de los argumentos y resultados.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::hashing::to_canonical_json;
use crate::shape::class::{ARRAY_LIST, HASH_MAP, STRING};
use crate::shape::ClassRef;

/// Valor dinámico. Los mapas conservan el orden de inserción y admiten
/// claves de cualquier tipo.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(String),
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Objeto opaco del host (`class` decide asignabilidad y transformers).
    Object { class: ClassRef, data: serde_json::Value },
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn object(class: &str, data: serde_json::Value) -> Self {
        Value::Object { class: ClassRef::new(class),
                        data }
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
        where K: Into<Value>,
              V: Into<Value>
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Clase de runtime del valor; `None` para `Null`.
    pub fn runtime_class(&self) -> Option<ClassRef> {
        let name = match self {
            Value::Null => return None,
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Double(_) => "Double",
            Value::Str(_) => STRING,
            Value::Seq(_) => ARRAY_LIST,
            Value::Map(_) => HASH_MAP,
            Value::Object { class, .. } => return Some(class.clone()),
        };
        Some(ClassRef::new(name))
    }

    /// Busca una entrada de mapa por clave.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Proyección a JSON usada para hashing canónico y logs.
    ///
    /// Es inyectiva: dos valores distintos nunca producen el mismo JSON.
    /// Los mapas con claves no textuales (o que empiezan por `@`) se
    /// proyectan como `{"@entries": [[k, v], ...]}` ordenado por clave, y
    /// los `Double` no finitos como `{"@double": "NaN"}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Long(l) => json!(l),
            Value::Double(d) if !d.is_finite() => json!({ "@double": d.to_string() }),
            Value::Double(d) => json!(d),
            Value::Str(s) => json!(s),
            Value::Seq(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => {
                let plain_keys = entries.iter().all(|(k, _)| matches!(k, Value::Str(s) if !s.starts_with('@')));
                if plain_keys {
                    let obj = entries.iter()
                                     .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.to_json())))
                                     .collect();
                    return serde_json::Value::Object(obj);
                }
                let mut pairs: Vec<(String, serde_json::Value)> =
                    entries.iter().map(|(k, v)| (k.to_json(), v.to_json())).map(|(k, v)| (to_canonical_json(&k), json!([k, v]))).collect();
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                json!({ "@entries": pairs.into_iter().map(|(_, pair)| pair).collect::<Vec<_>>() })
            }
            Value::Object { class, data } => json!({ "@class": class.name(), "data": data }),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
