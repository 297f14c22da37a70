//! Callbacks que el protocolo entrega a operaciones interceptoras y a
//! message sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::chain::MessageProcessor;
use crate::errors::InvokeError;
use crate::model::{Event, PropertyScope, Value};

/// Permite a una operación cortar el pipeline.
///
/// Si tras la llamada sigue en "continuar", el evento pasa al listener;
/// si no, el resultado de la operación sobrescribe el payload.
#[derive(Debug)]
pub struct InterceptCallback {
    shall_continue: AtomicBool,
}

impl Default for InterceptCallback {
    fn default() -> Self {
        Self { shall_continue: AtomicBool::new(true) }
    }
}

impl InterceptCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.shall_continue.store(false, Ordering::SeqCst);
    }

    pub fn shall_continue(&self) -> bool {
        self.shall_continue.load(Ordering::SeqCst)
    }
}

/// Entrega mensajes generados por una fuente al listener.
#[derive(Debug, Clone)]
pub struct SourceCallback {
    listener: Arc<dyn MessageProcessor>,
    event: Event,
    stopped: Arc<AtomicBool>,
}

impl SourceCallback {
    pub fn new(listener: Arc<dyn MessageProcessor>, event: &Event, stopped: Arc<AtomicBool>) -> Self {
        Self { listener,
               event: event.clone(),
               stopped }
    }

    /// Despacha un evento nuevo con `payload` y devuelve el payload final.
    pub fn process(&self, payload: impl Into<Value>) -> Result<Value, InvokeError> {
        self.dispatch(payload.into(), None)
    }

    pub fn process_with_properties(&self, payload: impl Into<Value>, properties: &IndexMap<String, Value>) -> Result<Value, InvokeError> {
        self.dispatch(payload.into(), Some(properties))
    }

    /// Despacha el evento actual tal cual (con identidad nueva).
    pub fn process_current(&self) -> Result<Value, InvokeError> {
        self.dispatch(self.event.payload().clone(), None)
    }

    /// La fuente debe terminar su bucle cuando devuelve `true`.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn dispatch(&self, payload: Value, properties: Option<&IndexMap<String, Value>>) -> Result<Value, InvokeError> {
        let mut event = self.event.derive(payload);
        if let Some(props) = properties {
            event.message.merge_properties(PropertyScope::Invocation, props);
        }
        Ok(self.listener.process(event)?.message.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::chain::FnProcessor;

    #[test]
    fn intercept_defaults_to_continue() {
        let cb = InterceptCallback::new();
        assert!(cb.shall_continue());
        cb.stop();
        assert!(!cb.shall_continue());
    }

    #[test]
    fn source_callback_dispatches_fresh_events() {
        let listener: Arc<dyn MessageProcessor> = Arc::new(FnProcessor::new(|mut e: Event| {
            let n = match e.payload() {
                Value::Int(n) => *n,
                _ => 0,
            };
            e.message.payload = Value::Int(n * 2);
            Ok(e)
        }));
        let stopped = Arc::new(AtomicBool::new(false));
        let cb = SourceCallback::new(listener, &Event::with_payload(Value::Int(5)), stopped.clone());
        assert_eq!(cb.process(21).unwrap(), Value::Int(42));
        assert_eq!(cb.process_current().unwrap(), Value::Int(10));
        assert!(!cb.is_stopped());
        stopped.store(true, Ordering::SeqCst);
        assert!(cb.is_stopped());
    }
}
