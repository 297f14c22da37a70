//! `ConnectionKey`: identidad estructural de una conexión lógica.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value as Json;

use crate::hashing::{hash_value, to_canonical_json};
use crate::model::Value;

/// Valores de los parámetros de conexión, en orden de declaración.
///
/// Igualdad y hash se calculan sobre la forma canónica, así que dos claves
/// con los mismos valores son iguales aunque provengan de invocaciones
/// distintas.
#[derive(Debug, Clone)]
pub struct ConnectionKey {
    params: Vec<(String, Value)>,
    canonical: String,
}

impl ConnectionKey {
    pub fn new<I, S>(params: I) -> Self
        where I: IntoIterator<Item = (S, Value)>,
              S: Into<String>
    {
        let params: Vec<(String, Value)> = params.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let json = Json::Object(params.iter().map(|(k, v)| (k.clone(), v.to_json())).collect());
        Self { canonical: to_canonical_json(&json),
               params }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Huella blake3 de la forma canónica.
    pub fn fingerprint(&self) -> String {
        let json = Json::Object(self.params.iter().map(|(k, v)| (k.clone(), v.to_json())).collect());
        hash_value(&json)
    }
}

impl PartialEq for ConnectionKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ConnectionKey {}

impl Hash for ConnectionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
