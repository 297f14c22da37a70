//! Argumentos crudos (configurados en el processor) y argumentos ya
//! preparados que recibe la operación.

use std::sync::Arc;

use indexmap::IndexMap;

use super::callback::{InterceptCallback, SourceCallback};
use super::chain::MessageProcessor;
use super::nested::NestedProcessor;
use crate::model::{Message, Value};

/// Valor configurado para un parámetro antes de la coerción.
#[derive(Debug, Clone)]
pub enum RawArgument {
    Value(Value),
    Processor(Arc<dyn MessageProcessor>),
    Processors(Vec<RawArgument>),
}

impl RawArgument {
    pub fn processor(p: impl MessageProcessor + 'static) -> Self {
        RawArgument::Processor(Arc::new(p))
    }

    /// Todos los sub-pipelines contenidos (para start/stop).
    pub fn processors(&self) -> Vec<&Arc<dyn MessageProcessor>> {
        match self {
            RawArgument::Value(_) => vec![],
            RawArgument::Processor(p) => vec![p],
            RawArgument::Processors(items) => items.iter().flat_map(|i| i.processors()).collect(),
        }
    }
}

impl From<Value> for RawArgument {
    fn from(v: Value) -> Self {
        RawArgument::Value(v)
    }
}

impl From<&str> for RawArgument {
    fn from(s: &str) -> Self {
        RawArgument::Value(Value::from(s))
    }
}

impl From<String> for RawArgument {
    fn from(s: String) -> Self {
        RawArgument::Value(Value::from(s))
    }
}

impl From<i32> for RawArgument {
    fn from(i: i32) -> Self {
        RawArgument::Value(Value::from(i))
    }
}

/// Argumento preparado para un parámetro.
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    Message(Message),
    OutboundHeaders(IndexMap<String, Value>),
    Nested(NestedProcessor),
    NestedList(Vec<NestedProcessor>),
    Intercept(Arc<InterceptCallback>),
    Source(SourceCallback),
}

/// Argumentos en orden de declaración, accesibles por nombre.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn push(&mut self, name: &str, argument: Argument) {
        self.entries.push((name.to_string(), argument));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Argument> {
        self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            Argument::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        match self.get(name)? {
            Argument::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn nested(&self, name: &str) -> Option<&NestedProcessor> {
        match self.get(name)? {
            Argument::Nested(n) => Some(n),
            _ => None,
        }
    }

    pub fn nested_list(&self, name: &str) -> Option<&[NestedProcessor]> {
        match self.get(name)? {
            Argument::NestedList(n) => Some(n),
            _ => None,
        }
    }

    pub fn outbound_headers_mut(&mut self, name: &str) -> Option<&mut IndexMap<String, Value>> {
        match self.get_mut(name)? {
            Argument::OutboundHeaders(h) => Some(h),
            _ => None,
        }
    }

    pub fn intercept(&self, name: &str) -> Option<&InterceptCallback> {
        match self.get(name)? {
            Argument::Intercept(cb) => Some(cb),
            _ => None,
        }
    }

    pub fn source(&self, name: &str) -> Option<&SourceCallback> {
        match self.get(name)? {
            Argument::Source(cb) => Some(cb),
            _ => None,
        }
    }

    /// Primer callback de intercepción, sea cual sea su nombre.
    pub(crate) fn any_intercept(&self) -> Option<&Arc<InterceptCallback>> {
        self.entries.iter().find_map(|(_, a)| match a {
                               Argument::Intercept(cb) => Some(cb),
                               _ => None,
                           })
    }

    /// Headers outbound que la operación dejó en los sinks.
    pub(crate) fn outbound_headers(&self) -> impl Iterator<Item = &IndexMap<String, Value>> {
        self.entries.iter().filter_map(|(_, a)| match a {
                               Argument::OutboundHeaders(h) if !h.is_empty() => Some(h),
                               _ => None,
                           })
    }
}
