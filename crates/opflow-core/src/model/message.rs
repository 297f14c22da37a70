//! Mensaje y evento: payload más propiedades por scope.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::Value;

/// Scopes de propiedades de un mensaje.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyScope {
    Inbound,
    Invocation,
    Outbound,
}

impl PropertyScope {
    /// Nombre usado en expresiones (`INBOUND`, `INVOCATION`, `OUTBOUND`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INBOUND" => Some(PropertyScope::Inbound),
            "INVOCATION" => Some(PropertyScope::Invocation),
            "OUTBOUND" => Some(PropertyScope::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub payload: Value,
    inbound: IndexMap<String, Value>,
    invocation: IndexMap<String, Value>,
    outbound: IndexMap<String, Value>,
}

impl Message {
    pub fn new(payload: Value) -> Self {
        Self { payload,
               ..Default::default() }
    }

    pub fn with_property(mut self, scope: PropertyScope, name: &str, value: impl Into<Value>) -> Self {
        self.set_property(scope, name, value);
        self
    }

    pub fn properties(&self, scope: PropertyScope) -> &IndexMap<String, Value> {
        match scope {
            PropertyScope::Inbound => &self.inbound,
            PropertyScope::Invocation => &self.invocation,
            PropertyScope::Outbound => &self.outbound,
        }
    }

    fn properties_mut(&mut self, scope: PropertyScope) -> &mut IndexMap<String, Value> {
        match scope {
            PropertyScope::Inbound => &mut self.inbound,
            PropertyScope::Invocation => &mut self.invocation,
            PropertyScope::Outbound => &mut self.outbound,
        }
    }

    pub fn property(&self, scope: PropertyScope, name: &str) -> Option<&Value> {
        self.properties(scope).get(name)
    }

    pub fn set_property(&mut self, scope: PropertyScope, name: &str, value: impl Into<Value>) {
        self.properties_mut(scope).insert(name.to_string(), value.into());
    }

    /// Fusiona `props` en el scope indicado (las claves existentes se pisan).
    pub fn merge_properties(&mut self, scope: PropertyScope, props: &IndexMap<String, Value>) {
        let target = self.properties_mut(scope);
        for (k, v) in props {
            target.insert(k.clone(), v.clone());
        }
    }
}

/// Unidad de trabajo: un mensaje con identidad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub message: Message,
}

impl Event {
    pub fn new(message: Message) -> Self {
        Self { id: Uuid::new_v4(),
               message }
    }

    pub fn with_payload(payload: impl Into<Value>) -> Self {
        Self::new(Message::new(payload.into()))
    }

    pub fn payload(&self) -> &Value {
        &self.message.payload
    }

    /// Copia del evento con identidad nueva y el payload reemplazado.
    pub fn derive(&self, payload: Value) -> Self {
        let mut message = self.message.clone();
        message.payload = payload;
        Self::new(message)
    }
}
