//! Nested processors: lógica externa que una operación ejecuta bajo demanda.

use std::sync::Arc;

use indexmap::IndexMap;

use super::chain::MessageProcessor;
use crate::errors::InvokeError;
use crate::model::{Event, PropertyScope, Value};

/// Adaptador invocable sobre un sub-pipeline o un literal.
///
/// La variante `Chain` guarda una copia del evento de la invocación que la
/// creó; cada `run` parte de esa copia con el payload indicado.
#[derive(Debug, Clone)]
pub enum NestedProcessor {
    Chain { chain: Arc<dyn MessageProcessor>, event: Event },
    Literal(String),
}

impl NestedProcessor {
    pub fn chain(chain: Arc<dyn MessageProcessor>, event: &Event) -> Self {
        NestedProcessor::Chain { chain,
                                 event: event.clone() }
    }

    pub fn literal(value: &str) -> Self {
        NestedProcessor::Literal(value.to_string())
    }

    /// Ejecuta con el payload actual del evento capturado.
    pub fn run_current(&self) -> Result<Value, InvokeError> {
        match self {
            NestedProcessor::Chain { event, .. } => self.dispatch(event.payload().clone(), None),
            NestedProcessor::Literal(s) => Ok(Value::Str(s.clone())),
        }
    }

    pub fn run(&self, payload: Value) -> Result<Value, InvokeError> {
        self.dispatch(payload, None)
    }

    /// `properties` se fusionan en el scope de invocación antes de ejecutar.
    pub fn run_with_properties(&self, payload: Value, properties: &IndexMap<String, Value>) -> Result<Value, InvokeError> {
        self.dispatch(payload, Some(properties))
    }

    /// Payload actual más propiedades extra.
    pub fn run_extra(&self, properties: &IndexMap<String, Value>) -> Result<Value, InvokeError> {
        match self {
            NestedProcessor::Chain { event, .. } => self.dispatch(event.payload().clone(), Some(properties)),
            NestedProcessor::Literal(s) => Ok(Value::Str(s.clone())),
        }
    }

    fn dispatch(&self, payload: Value, properties: Option<&IndexMap<String, Value>>) -> Result<Value, InvokeError> {
        match self {
            NestedProcessor::Literal(s) => Ok(Value::Str(s.clone())),
            NestedProcessor::Chain { chain, event } => {
                let mut child = event.derive(payload);
                if let Some(props) = properties {
                    child.message.merge_properties(PropertyScope::Invocation, props);
                }
                Ok(chain.process(child)?.message.payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::chain::FnProcessor;
    use crate::model::Message;

    fn echo_flow() -> Arc<dyn MessageProcessor> {
        Arc::new(FnProcessor::new(|mut e: Event| {
            let tag = e.message.property(PropertyScope::Invocation, "tag").cloned().unwrap_or(Value::Null);
            let body = e.payload().as_str().unwrap_or_default().to_string();
            e.message.payload = Value::Seq(vec![Value::from(body), tag]);
            Ok(e)
        }))
    }

    #[test]
    fn literal_ignores_payload() {
        let nested = NestedProcessor::literal("fixed");
        assert_eq!(nested.run(Value::from("anything")).unwrap(), Value::from("fixed"));
        assert_eq!(nested.run_current().unwrap(), Value::from("fixed"));
        assert_eq!(nested.run_extra(&IndexMap::new()).unwrap(), Value::from("fixed"));
    }

    #[test]
    fn chain_substitutes_payload_and_merges_properties() {
        let event = Event::new(Message::new(Value::from("original")));
        let nested = NestedProcessor::chain(echo_flow(), &event);
        assert_eq!(nested.run(Value::from("x")).unwrap(), Value::Seq(vec![Value::from("x"), Value::Null]));

        let mut props = IndexMap::new();
        props.insert("tag".to_string(), Value::from("t"));
        assert_eq!(nested.run_with_properties(Value::from("y"), &props).unwrap(), Value::Seq(vec![Value::from("y"), Value::from("t")]));
        assert_eq!(nested.run_extra(&props).unwrap(), Value::Seq(vec![Value::from("original"), Value::from("t")]));
    }

    #[test]
    fn runs_do_not_leak_into_captured_event() {
        let event = Event::new(Message::new(Value::from("original")));
        let nested = NestedProcessor::chain(echo_flow(), &event);
        let mut props = IndexMap::new();
        props.insert("tag".to_string(), Value::from("t"));
        nested.run_with_properties(Value::from("y"), &props).unwrap();
        assert_eq!(nested.run_current().unwrap(), Value::Seq(vec![Value::from("original"), Value::Null]));
    }
}
