//! `OperationProcessor`: punto de entrada que envuelve una operación.
//!
//! Orden de una invocación:
//! 1. configuración efectiva (referencia explícita o la única por defecto);
//! 2. parámetros de conexión (por llamada, si no los de la configuración);
//! 3. coerción de argumentos;
//! 4. adquisición de conexión e instancia pooled;
//! 5. llamada a la operación;
//! 6. post-proceso (headers outbound, intercepción / payload);
//! 7. liberación de recursos.
//!
//! Los pasos 1–3 fallan antes de tocar ningún recurso. Un fallo
//! "invalidante" invalida la conexión y reentra desde el paso 1 mientras el
//! `RetryState` lo permita.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, error, warn};

use super::args::{Argument, Arguments, RawArgument};
use super::callback::{InterceptCallback, SourceCallback};
use super::chain::MessageProcessor;
use super::config::{ConfigRegistry, ModuleConfig};
use super::nested::NestedProcessor;
use super::operation::{Operation, Target};
use super::signature::{OperationSignature, ParameterKind, ParameterSpec};
use crate::coercion::CoercionEngine;
use crate::config::SETTINGS;
use crate::errors::{InvokeError, OperationError};
use crate::model::{Event, PropertyScope, Value};
use crate::resource::{ConnectionKey, ConnectionLease, ConnectionManager, NoConnections, NoPool, ObjectPool, PooledLease, RetryState};

/// Clasifica los errores de la operación que invalidan la conexión.
pub type InvalidationPolicy = Arc<dyn Fn(&OperationError) -> bool + Send + Sync>;

pub struct OperationProcessor<M: ConnectionManager = NoConnections, P: ObjectPool = NoPool> {
    signature: OperationSignature,
    operation: Box<dyn Operation<M::Connection, P::Instance>>,
    configs: Arc<dyn ConfigRegistry>,
    config_ref: Option<String>,
    engine: CoercionEngine,
    arguments: IndexMap<String, RawArgument>,
    connections: Option<Arc<M>>,
    pool: Option<Arc<P>>,
    invalidate_on: Option<InvalidationPolicy>,
    listener: Option<Arc<dyn MessageProcessor>>,
    retry: RetryState,
    source_stopped: Arc<AtomicBool>,
}

impl OperationProcessor {
    pub fn builder(signature: OperationSignature, configs: Arc<dyn ConfigRegistry>, engine: CoercionEngine) -> ProcessorBuilder {
        ProcessorBuilder { signature,
                           configs,
                           engine,
                           config_ref: None,
                           arguments: IndexMap::new(),
                           connections: None,
                           pool: None,
                           invalidate_on: None,
                           listener: None,
                           max_retry_attempts: SETTINGS.max_retry_attempts }
    }
}

impl<M: ConnectionManager, P: ObjectPool> OperationProcessor<M, P> {
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &OperationSignature {
        &self.signature
    }

    /// Estado de reintentos compartido por todas las invocaciones.
    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub fn set_argument(&mut self, name: &str, raw: impl Into<RawArgument>) {
        self.arguments.insert(name.to_string(), raw.into());
    }

    pub fn set_listener(&mut self, listener: Arc<dyn MessageProcessor>) {
        self.listener = Some(listener);
    }

    pub(crate) fn source_flag(&self) -> &Arc<AtomicBool> {
        &self.source_stopped
    }

    /// Invoca usando el `RetryState` de la instancia.
    pub fn invoke(&self, event: Event) -> Result<Event, InvokeError> {
        self.invoke_with(event, &self.retry)
    }

    /// Invoca con un `RetryState` propio del caller (reintentos por llamada).
    pub fn invoke_with(&self, event: Event, retry: &RetryState) -> Result<Event, InvokeError> {
        let config = self.resolve_config()?;
        let key = self.connection_key(&config, &event)?;
        let mut args = self.prepare_arguments(&event)?;

        let mut connection = match (&self.connections, key) {
            (Some(manager), Some(key)) => {
                let lease = ConnectionLease::acquire(manager.as_ref(), key).map_err(|e| InvokeError::from_acquire(self.name(), e))?;
                Some(lease.ok_or_else(|| InvokeError::ConnectionCreationFailed { operation: self.name().to_string(),
                                                                                  reason: None })?)
            }
            _ => None,
        };
        let mut instance = match &self.pool {
            Some(pool) => Some(PooledLease::borrow(pool.as_ref()).map_err(|e| InvokeError::from_borrow(self.name(), e))?),
            None => None,
        };

        retry.begin_attempt();
        let outcome = {
            let target = Target { config: &config,
                                  connection: connection.as_mut().and_then(|l| l.connection_mut()),
                                  instance: instance.as_mut().and_then(|l| l.instance_mut()) };
            self.operation.call(target, &mut args)
        };

        match outcome {
            Ok(result) => {
                retry.reset();
                let processed = self.post_process(event, result, &args);
                drop(instance);
                let released = match connection {
                    Some(lease) => lease.release(),
                    None => Ok(()),
                };
                match (processed, released) {
                    (Ok(event), Ok(())) => Ok(event),
                    (Ok(_), Err(e)) => Err(InvokeError::ResourceRelease { operation: self.name().to_string(),
                                                                          reason: e.to_string() }),
                    (Err(err), Err(e)) => {
                        error!("Failed to release the connection of {}: {e}", self.name());
                        Err(err)
                    }
                    (Err(err), Ok(())) => Err(err),
                }
            }
            Err(cause) if connection.is_some() && self.invalidates(&cause) => {
                let connection_id = connection.as_ref().and_then(|l| l.id().map(str::to_string));
                if let Some(lease) = connection.take() {
                    if let Err(e) = lease.invalidate() {
                        warn!("Failed to invalidate connection [id={}]: {e}", connection_id.as_deref().unwrap_or("unknown"));
                    }
                }
                drop(instance);
                if retry.should_retry() {
                    debug!("Forcing a retry [time={} out of {}]", retry.attempts(), retry.max_attempts());
                    return self.invoke_with(event, retry);
                }
                Err(InvokeError::RetryExhausted { operation: self.name().to_string(),
                                                  connection_id,
                                                  attempts: retry.attempts(),
                                                  cause })
            }
            Err(cause) => {
                drop(instance);
                if let Some(lease) = connection {
                    if let Err(e) = lease.release() {
                        error!("Failed to release the connection of {}: {e}", self.name());
                    }
                }
                Err(InvokeError::OperationInvocation { operation: self.name().to_string(),
                                                       cause })
            }
        }
    }

    fn invalidates(&self, err: &OperationError) -> bool {
        self.invalidate_on.as_ref().is_some_and(|policy| policy(err))
    }

    fn resolve_config(&self) -> Result<Arc<ModuleConfig>, InvokeError> {
        match &self.config_ref {
            Some(name) => self.configs.find(name).ok_or_else(|| InvokeError::ConfigNotFound(name.clone())),
            None => self.configs.find_default(),
        }
    }

    /// Construye la clave de conexión. Cada parámetro usa el valor de la
    /// llamada si no es nulo, si no el de la configuración; si ambos faltan
    /// falla sin haber tocado ningún recurso.
    fn connection_key(&self, config: &ModuleConfig, event: &Event) -> Result<Option<ConnectionKey>, InvokeError> {
        if self.connections.is_none() {
            return Ok(None);
        }
        let mut params = Vec::with_capacity(self.signature.connection_parameters.len());
        for spec in &self.signature.connection_parameters {
            let per_call = match self.arguments.get(&spec.name) {
                Some(RawArgument::Value(v)) => self.coerce(spec, v.clone(), event)?,
                _ => Value::Null,
            };
            let value = if per_call.is_null() {
                match config.get(&spec.name) {
                    Some(v) => self.coerce(spec, v.clone(), event)?,
                    None => Value::Null,
                }
            } else {
                per_call
            };
            if value.is_null() {
                return Err(InvokeError::MissingConnectionParameter { operation: self.name().to_string(),
                                                                     parameter: spec.name.clone() });
            }
            params.push((spec.name.clone(), value));
        }
        Ok(Some(ConnectionKey::new(params)))
    }

    fn coerce(&self, spec: &ParameterSpec, value: Value, event: &Event) -> Result<Value, InvokeError> {
        self.engine.coerce(value, &spec.shape, spec.mime_type.as_deref(), event)
    }

    fn invalid(spec: &ParameterSpec, reason: &str) -> InvokeError {
        InvokeError::InvalidArgument { parameter: spec.name.clone(),
                                       reason: reason.to_string() }
    }

    fn prepare_arguments(&self, event: &Event) -> Result<Arguments, InvokeError> {
        let mut args = Arguments::default();
        for spec in &self.signature.parameters {
            let argument = match &spec.kind {
                ParameterKind::Standard => {
                    let raw = match self.arguments.get(&spec.name) {
                        Some(RawArgument::Value(v)) => v.clone(),
                        Some(_) => return Err(Self::invalid(spec, "expects a value, got a processor")),
                        None => spec.default.clone().unwrap_or(Value::Null),
                    };
                    Argument::Value(self.coerce(spec, raw, event)?)
                }
                ParameterKind::Message => Argument::Message(event.message.clone()),
                ParameterKind::Payload => Argument::Value(event.payload().clone()),
                ParameterKind::OutboundHeaders => Argument::OutboundHeaders(IndexMap::new()),
                ParameterKind::InboundHeaders(header) => Argument::Value(self.coerce_headers(spec, PropertyScope::Inbound, header, event)?),
                ParameterKind::InvocationHeaders(header) => {
                    Argument::Value(self.coerce_headers(spec, PropertyScope::Invocation, header, event)?)
                }
                ParameterKind::Nested => match self.arguments.get(&spec.name) {
                    Some(raw) => Argument::Nested(Self::nested(spec, raw, event)?),
                    None => return Err(Self::invalid(spec, "no nested processor configured")),
                },
                ParameterKind::NestedList => {
                    let items = match self.arguments.get(&spec.name) {
                        Some(RawArgument::Processors(items)) => items.iter().map(|raw| Self::nested(spec, raw, event)).collect::<Result<Vec<_>, _>>()?,
                        Some(RawArgument::Value(Value::Seq(values))) => values.iter()
                                                                              .map(|v| Self::nested(spec, &RawArgument::Value(v.clone()), event))
                                                                              .collect::<Result<Vec<_>, _>>()?,
                        Some(raw) => vec![Self::nested(spec, raw, event)?],
                        None => vec![],
                    };
                    Argument::NestedList(items)
                }
                ParameterKind::InterceptCallback => Argument::Intercept(Arc::new(InterceptCallback::new())),
                ParameterKind::SourceCallback => {
                    let listener = self.listener.clone().ok_or_else(|| Self::invalid(spec, "a message source needs a listener"))?;
                    Argument::Source(SourceCallback::new(listener, event, self.source_stopped.clone()))
                }
            };
            args.push(&spec.name, argument);
        }
        Ok(args)
    }

    /// `header`, `headers` o `headers-list` según la forma declarada.
    fn coerce_headers(&self, spec: &ParameterSpec, scope: PropertyScope, header: &str, event: &Event) -> Result<Value, InvokeError> {
        let scope = match scope {
            PropertyScope::Inbound => "INBOUND",
            PropertyScope::Invocation => "INVOCATION",
            PropertyScope::Outbound => "OUTBOUND",
        };
        let evaluator = if spec.shape.is_mapping() {
            "headers"
        } else if spec.shape.is_sequence() {
            "headers-list"
        } else {
            "header"
        };
        let expression = self.engine.evaluator().delimit(&format!("{evaluator}:{scope}:{header}"));
        self.coerce(spec, Value::Str(expression), event)
    }

    fn nested(spec: &ParameterSpec, raw: &RawArgument, event: &Event) -> Result<NestedProcessor, InvokeError> {
        match raw {
            RawArgument::Processor(p) => Ok(NestedProcessor::chain(p.clone(), event)),
            RawArgument::Value(Value::Str(s)) => Ok(NestedProcessor::literal(s)),
            _ => Err(Self::invalid(spec, "expects a processor or a literal string")),
        }
    }

    /// Los headers outbound se fusionan en el evento resultante: si hubo
    /// intercepción, después de que el listener lo procese.
    fn post_process(&self, event: Event, result: Value, args: &Arguments) -> Result<Event, InvokeError> {
        let forward = args.any_intercept().is_some_and(|cb| cb.shall_continue());
        let mut event = match &self.listener {
            Some(listener) if forward => listener.process(event)?,
            _ if self.signature.void => event,
            _ => {
                let mut event = event;
                event.message.payload = result;
                event
            }
        };
        for headers in args.outbound_headers() {
            event.message.merge_properties(PropertyScope::Outbound, headers);
        }
        Ok(event)
    }

    fn nested_processors(&self) -> impl Iterator<Item = &Arc<dyn MessageProcessor>> {
        self.arguments.values().flat_map(|raw| raw.processors())
    }
}

impl<M: ConnectionManager, P: ObjectPool> MessageProcessor for OperationProcessor<M, P> {
    fn process(&self, event: Event) -> Result<Event, InvokeError> {
        self.invoke(event)
    }

    /// Propaga el arranque a los sub-pipelines configurados.
    fn start(&self) -> Result<(), InvokeError> {
        self.source_stopped.store(false, Ordering::SeqCst);
        self.nested_processors().try_for_each(|p| p.start())
    }

    fn stop(&self) -> Result<(), InvokeError> {
        self.source_stopped.store(true, Ordering::SeqCst);
        self.nested_processors().try_for_each(|p| p.stop())
    }
}

/// Builder de `OperationProcessor`. `connections` y `pool` cambian los tipos
/// de conexión e instancia que recibirá la operación.
pub struct ProcessorBuilder<M: ConnectionManager = NoConnections, P: ObjectPool = NoPool> {
    signature: OperationSignature,
    configs: Arc<dyn ConfigRegistry>,
    engine: CoercionEngine,
    config_ref: Option<String>,
    arguments: IndexMap<String, RawArgument>,
    connections: Option<Arc<M>>,
    pool: Option<Arc<P>>,
    invalidate_on: Option<InvalidationPolicy>,
    listener: Option<Arc<dyn MessageProcessor>>,
    max_retry_attempts: u32,
}

impl<M: ConnectionManager, P: ObjectPool> ProcessorBuilder<M, P> {
    pub fn config_ref(mut self, name: &str) -> Self {
        self.config_ref = Some(name.to_string());
        self
    }

    pub fn argument(mut self, name: &str, raw: impl Into<RawArgument>) -> Self {
        self.arguments.insert(name.to_string(), raw.into());
        self
    }

    pub fn listener(mut self, listener: Arc<dyn MessageProcessor>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn max_retry_attempts(mut self, max: u32) -> Self {
        self.max_retry_attempts = max;
        self
    }

    pub fn invalidate_on(mut self, policy: impl Fn(&OperationError) -> bool + Send + Sync + 'static) -> Self {
        self.invalidate_on = Some(Arc::new(policy));
        self
    }

    /// Atajo: invalida cuando la clase del error coincide.
    pub fn invalidate_on_class(self, class: &str) -> Self {
        let class = class.to_string();
        self.invalidate_on(move |err| err.class() == class)
    }

    pub fn connections<M2: ConnectionManager>(self, manager: Arc<M2>) -> ProcessorBuilder<M2, P> {
        ProcessorBuilder { signature: self.signature,
                           configs: self.configs,
                           engine: self.engine,
                           config_ref: self.config_ref,
                           arguments: self.arguments,
                           connections: Some(manager),
                           pool: self.pool,
                           invalidate_on: self.invalidate_on,
                           listener: self.listener,
                           max_retry_attempts: self.max_retry_attempts }
    }

    pub fn pool<P2: ObjectPool>(self, pool: Arc<P2>) -> ProcessorBuilder<M, P2> {
        ProcessorBuilder { signature: self.signature,
                           configs: self.configs,
                           engine: self.engine,
                           config_ref: self.config_ref,
                           arguments: self.arguments,
                           connections: self.connections,
                           pool: Some(pool),
                           invalidate_on: self.invalidate_on,
                           listener: self.listener,
                           max_retry_attempts: self.max_retry_attempts }
    }

    pub fn build(self, operation: impl Operation<M::Connection, P::Instance> + 'static) -> OperationProcessor<M, P> {
        OperationProcessor { signature: self.signature,
                             operation: Box::new(operation),
                             configs: self.configs,
                             config_ref: self.config_ref,
                             engine: self.engine,
                             arguments: self.arguments,
                             connections: self.connections,
                             pool: self.pool,
                             invalidate_on: self.invalidate_on,
                             listener: self.listener,
                             retry: RetryState::new(self.max_retry_attempts),
                             source_stopped: Arc::new(AtomicBool::new(false)) }
    }

    /// Igual que `build` pero fija la firma de la closure para que infiera
    /// los lifetimes de `Target`.
    pub fn build_fn<F>(self, operation: F) -> OperationProcessor<M, P>
        where F: Fn(Target<'_, M::Connection, P::Instance>, &mut Arguments) -> Result<Value, OperationError> + Send + Sync + 'static
    {
        self.build(operation)
    }
}
