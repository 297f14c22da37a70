//! Message sources: operaciones que generan eventos en vez de procesarlos.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, error};

use super::chain::MessageProcessor;
use super::processor::OperationProcessor;
use super::signature::ParameterKind;
use crate::constants::SOURCE_THREAD_NAME;
use crate::errors::InvokeError;
use crate::model::{Event, Value};
use crate::resource::{ConnectionManager, ObjectPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingModel {
    /// La operación corre en un hilo propio y de larga vida.
    SingleThread,
    /// La operación corre en el hilo que llama a `start`.
    NoThread,
}

/// Fuente respaldada por una operación con un parámetro `SourceCallback`.
pub struct MessageSource<M: ConnectionManager + 'static, P: ObjectPool + 'static> {
    processor: Arc<OperationProcessor<M, P>>,
    threading: ThreadingModel,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<M: ConnectionManager + 'static, P: ObjectPool + 'static> MessageSource<M, P> {
    pub fn new(processor: OperationProcessor<M, P>, threading: ThreadingModel) -> Result<Self, InvokeError> {
        if !processor.signature().has_kind(&ParameterKind::SourceCallback) {
            return Err(InvokeError::Lifecycle(format!("{} does not take a source callback", processor.name())));
        }
        Ok(Self { processor: Arc::new(processor),
                  threading,
                  worker: Mutex::new(None) })
    }

    pub fn processor(&self) -> &Arc<OperationProcessor<M, P>> {
        &self.processor
    }

    pub fn is_stopped(&self) -> bool {
        self.processor.source_flag().load(Ordering::SeqCst)
    }

    /// Arranca la fuente. Con `NoThread` la operación corre aquí mismo y su
    /// error se devuelve; con `SingleThread` sólo se registra.
    pub fn start(&self) -> Result<(), InvokeError> {
        self.processor.start()?;
        match self.threading {
            ThreadingModel::NoThread => self.processor.invoke(Event::with_payload(Value::Null)).map(|_| ()),
            ThreadingModel::SingleThread => {
                let mut worker = self.worker.lock().map_err(|_| InvokeError::Lifecycle("source worker lock poisoned".to_string()))?;
                if worker.is_some() {
                    return Err(InvokeError::Lifecycle(format!("{} is already started", self.processor.name())));
                }
                let processor = self.processor.clone();
                let handle = thread::Builder::new().name(SOURCE_THREAD_NAME.to_string())
                                                   .spawn(move || {
                                                       debug!("Source {} running", processor.name());
                                                       if let Err(e) = processor.invoke(Event::with_payload(Value::Null)) {
                                                           error!("Source {} failed: {e}", processor.name());
                                                       }
                                                   })
                                                   .map_err(|e| InvokeError::Lifecycle(format!("cannot spawn {SOURCE_THREAD_NAME}: {e}")))?;
                *worker = Some(handle);
                Ok(())
            }
        }
    }

    /// Marca la fuente como detenida y espera a su hilo.
    pub fn stop(&self) -> Result<(), InvokeError> {
        self.processor.stop()?;
        let handle = self.worker
                         .lock()
                         .map_err(|_| InvokeError::Lifecycle("source worker lock poisoned".to_string()))?
                         .take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| InvokeError::Lifecycle(format!("{SOURCE_THREAD_NAME} panicked")))?;
        }
        Ok(())
    }
}
