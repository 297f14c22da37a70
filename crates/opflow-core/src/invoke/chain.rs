//! Procesadores de mensajes y cadenas de procesadores.

use std::fmt;
use std::sync::Arc;

use crate::errors::InvokeError;
use crate::model::Event;

/// Unidad ejecutable de un pipeline: sub-pipelines, listeners y los
/// propios `OperationProcessor` implementan este trait.
pub trait MessageProcessor: Send + Sync {
    fn process(&self, event: Event) -> Result<Event, InvokeError>;

    fn start(&self) -> Result<(), InvokeError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), InvokeError> {
        Ok(())
    }
}

impl fmt::Debug for dyn MessageProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageProcessor")
    }
}

/// Adapta una closure a `MessageProcessor`.
pub struct FnProcessor<F>(pub F);

impl<F> FnProcessor<F> where F: Fn(Event) -> Result<Event, InvokeError> + Send + Sync
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> MessageProcessor for FnProcessor<F> where F: Fn(Event) -> Result<Event, InvokeError> + Send + Sync
{
    fn process(&self, event: Event) -> Result<Event, InvokeError> {
        (self.0)(event)
    }
}

/// Ejecuta procesadores en secuencia; la salida de uno es la entrada del
/// siguiente.
#[derive(Default, Clone)]
pub struct ProcessorChain {
    processors: Vec<Arc<dyn MessageProcessor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, processor: impl MessageProcessor + 'static) -> Self {
        self.processors.push(Arc::new(processor));
        self
    }

    pub fn then_arc(mut self, processor: Arc<dyn MessageProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl MessageProcessor for ProcessorChain {
    fn process(&self, event: Event) -> Result<Event, InvokeError> {
        self.processors.iter().try_fold(event, |ev, p| p.process(ev))
    }

    fn start(&self) -> Result<(), InvokeError> {
        self.processors.iter().try_for_each(|p| p.start())
    }

    fn stop(&self) -> Result<(), InvokeError> {
        self.processors.iter().try_for_each(|p| p.stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn chain_threads_event_through_processors() {
        let chain = ProcessorChain::new().then(FnProcessor::new(|mut e: Event| {
                                              e.message.payload = Value::from("a");
                                              Ok(e)
                                          }))
                                         .then(FnProcessor::new(|mut e: Event| {
                                              let prev = e.payload().as_str().unwrap_or_default().to_string();
                                              e.message.payload = Value::from(format!("{prev}b"));
                                              Ok(e)
                                          }));
        let out = chain.process(Event::with_payload(Value::Null)).unwrap();
        assert_eq!(out.payload(), &Value::from("ab"));
        assert_eq!(chain.len(), 2);
    }
}
