use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use opflow_core::invoke::{OperationSignature, Target};
use opflow_core::{default_engine, ConnectionKey, ConnectionManager, DeclaredType, Event, InMemoryConfigRegistry, InvokeError, ModuleConfig,
                  ObjectPool, OperationError, OperationProcessor, ResourceError, RetryState, TypeResolver, Value};

#[derive(Default)]
struct CountingConnections {
    acquired: AtomicUsize,
    released: AtomicUsize,
    invalidated: AtomicUsize,
    fail_release: AtomicBool,
    refuse: AtomicBool,
    time_out: AtomicBool,
    keys: std::sync::Mutex<Vec<ConnectionKey>>,
}

impl ConnectionManager for CountingConnections {
    type Connection = usize;

    fn acquire(&self, key: &ConnectionKey) -> Result<Option<usize>, ResourceError> {
        if self.time_out.load(Ordering::SeqCst) {
            return Err(ResourceError::Timeout("connection".into()));
        }
        self.keys.lock().unwrap().push(key.clone());
        let n = self.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        if self.refuse.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(n))
    }

    fn release(&self, _key: &ConnectionKey, _connection: usize) -> Result<(), ResourceError> {
        self.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(ResourceError::Failed("release refused".into()));
        }
        Ok(())
    }

    fn invalidate(&self, _key: &ConnectionKey, _connection: usize) -> Result<(), ResourceError> {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
        Err(ResourceError::Failed("invalidation failures are only logged".into()))
    }

    fn connection_id(&self, connection: &usize) -> Option<String> {
        Some(format!("conn-{connection}"))
    }
}

#[derive(Default)]
struct CountingPool {
    borrowed: AtomicUsize,
    returned: AtomicUsize,
    fail_borrow: AtomicBool,
}

impl ObjectPool for CountingPool {
    type Instance = String;

    fn borrow(&self) -> Result<String, ResourceError> {
        self.borrowed.fetch_add(1, Ordering::SeqCst);
        if self.fail_borrow.load(Ordering::SeqCst) {
            return Err(ResourceError::Failed("worker factory down".into()));
        }
        Ok("worker".to_string())
    }

    fn give_back(&self, _instance: String) {
        self.returned.fetch_add(1, Ordering::SeqCst);
    }
}

fn configs() -> Arc<InMemoryConfigRegistry> {
    Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("db").with_value("username", "admin").with_value("port", "5432")))
}

fn signature() -> OperationSignature {
    OperationSignature::builder("query").param("sql", DeclaredType::scalar("String"))
                                        .connection_param("username", DeclaredType::scalar("String"))
                                        .connection_param("port", DeclaredType::scalar("int"))
                                        .build(&TypeResolver::default())
}

/// Operación que falla con `SessionExpired` las primeras `failures` veces.
fn flaky(failures: usize, calls: Arc<AtomicUsize>) -> impl Fn(Target<'_, usize, ()>, &mut opflow_core::Arguments) -> Result<Value, OperationError> {
    move |target, args| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        assert!(target.connection.is_some());
        if n < failures {
            return Err(OperationError::new("SessionExpired", "session gone"));
        }
        Ok(args.value("sql").cloned().unwrap_or(Value::Null))
    }
}

#[test]
fn two_retries_then_success() {
    let manager = Arc::new(CountingConnections::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .invalidate_on_class("SessionExpired")
                                                                                       .max_retry_attempts(2)
                                                                                       .argument("sql", "select 1")
                                                                                       .build_fn(flaky(2, calls.clone()));

    let out = processor.invoke(Event::with_payload(Value::Null)).expect("third attempt succeeds");
    assert_eq!(out.payload(), &Value::from("select 1"));
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 3);
    assert_eq!(manager.invalidated.load(Ordering::SeqCst), 2);
    assert_eq!(manager.released.load(Ordering::SeqCst), 1);
    assert_eq!(processor.retry_state().attempts(), 0);
}

#[test]
fn zero_bound_surfaces_retry_exhausted() {
    let manager = Arc::new(CountingConnections::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .invalidate_on_class("SessionExpired")
                                                                                       .max_retry_attempts(0)
                                                                                       .build_fn(flaky(usize::MAX, calls));

    let err = processor.invoke(Event::with_payload(Value::Null)).unwrap_err();
    match err {
        InvokeError::RetryExhausted { operation,
                                      connection_id,
                                      attempts,
                                      cause, } => {
            assert_eq!(operation, "query");
            assert_eq!(connection_id.as_deref(), Some("conn-1"));
            assert_eq!(attempts, 1);
            assert_eq!(cause.class(), "SessionExpired");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(manager.invalidated.load(Ordering::SeqCst), 1);
    assert_eq!(manager.released.load(Ordering::SeqCst), 0);
}

#[test]
fn retry_budget_is_shared_until_success() {
    let manager = Arc::new(CountingConnections::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .invalidate_on_class("SessionExpired")
                                                                                       .max_retry_attempts(1)
                                                                                       .build_fn(flaky(usize::MAX, calls));

    assert!(matches!(processor.invoke(Event::with_payload(Value::Null)), Err(InvokeError::RetryExhausted { attempts: 2, .. })));
    // El contador no se reinicia tras un fallo: la siguiente llamada ya no reintenta.
    assert!(matches!(processor.invoke(Event::with_payload(Value::Null)), Err(InvokeError::RetryExhausted { attempts: 3, .. })));
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 3);
}

#[test]
fn call_scoped_retry_state_is_independent() {
    let manager = Arc::new(CountingConnections::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .invalidate_on_class("SessionExpired")
                                                                                       .max_retry_attempts(0)
                                                                                       .build_fn(flaky(1, calls));

    let retry = RetryState::new(1);
    assert!(processor.invoke_with(Event::with_payload(Value::Null), &retry).is_ok());
    assert_eq!(retry.attempts(), 0);
    assert_eq!(processor.retry_state().attempts(), 0);
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 2);
}

#[test]
fn non_invalidating_failure_releases_without_invalidating() {
    let manager = Arc::new(CountingConnections::default());
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .invalidate_on_class("SessionExpired")
                                                                                       .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| {
                                                                                           Err(OperationError::new("BadQuery", "syntax error"))
                                                                                       });

    let err = processor.invoke(Event::with_payload(Value::Null)).unwrap_err();
    assert!(matches!(err, InvokeError::OperationInvocation { ref cause, .. } if cause.class() == "BadQuery"));
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(manager.released.load(Ordering::SeqCst), 1);
    assert_eq!(manager.invalidated.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_connection_parameter_fails_before_acquire() {
    let manager = Arc::new(CountingConnections::default());
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("db").with_value("port", 1)));
    let processor = OperationProcessor::builder(signature(), configs, default_engine()).connections(manager.clone())
                                                                                     .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));

    let err = processor.invoke(Event::with_payload(Value::Null)).unwrap_err();
    assert!(matches!(err, InvokeError::MissingConnectionParameter { ref parameter, .. } if parameter == "username"));
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn per_call_connection_values_override_config_defaults() {
    let manager = Arc::new(CountingConnections::default());
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .argument("username", "#[header:INBOUND:user]")
                                                                                       .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));

    let event = Event::new(opflow_core::Message::new(Value::Null).with_property(opflow_core::PropertyScope::Inbound, "user", "alice"));
    processor.invoke(event).unwrap();
    // Sin header, el valor por llamada es nulo y se usa el de la configuración.
    processor.invoke(Event::with_payload(Value::Null)).unwrap();

    let keys = manager.keys.lock().unwrap();
    assert_eq!(keys[0].get("username"), Some(&Value::from("alice")));
    assert_eq!(keys[0].get("port"), Some(&Value::Int(5432)));
    assert_eq!(keys[1].get("username"), Some(&Value::from("admin")));
    assert_ne!(keys[0], keys[1]);
}

#[test]
fn refused_connection_is_creation_failure() {
    let manager = Arc::new(CountingConnections::default());
    manager.refuse.store(true, Ordering::SeqCst);
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));
    assert!(matches!(processor.invoke(Event::with_payload(Value::Null)), Err(InvokeError::ConnectionCreationFailed { .. })));
}

#[test]
fn acquire_timeout_is_a_distinct_error() {
    let manager = Arc::new(CountingConnections::default());
    manager.time_out.store(true, Ordering::SeqCst);
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager)
                                                                                       .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));
    assert!(matches!(processor.invoke(Event::with_payload(Value::Null)), Err(InvokeError::ResourceTimeout { .. })));
}

#[test]
fn release_failure_only_escalates_on_success() {
    let manager = Arc::new(CountingConnections::default());
    manager.fail_release.store(true, Ordering::SeqCst);
    let ok = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));
    assert!(matches!(ok.invoke(Event::with_payload(Value::Null)), Err(InvokeError::ResourceRelease { .. })));

    let failing = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                     .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| {
                                                                                         Err(OperationError::new("BadQuery", "boom"))
                                                                                     });
    assert!(matches!(failing.invoke(Event::with_payload(Value::Null)), Err(InvokeError::OperationInvocation { .. })));
    assert_eq!(manager.released.load(Ordering::SeqCst), 2);
}

#[test]
fn pooled_instance_is_returned_when_operation_throws() {
    let pool = Arc::new(CountingPool::default());
    let sig = OperationSignature::builder("convert").build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs(), default_engine()).pool(pool.clone())
                                                                               .build_fn(|target: Target<'_, (), String>, _a: &mut opflow_core::Arguments| {
                                                                                   assert_eq!(target.instance.as_deref().map(String::as_str), Some("worker"));
                                                                                   Err(OperationError::new("Boom", "instance failed"))
                                                                               });

    assert!(processor.invoke(Event::with_payload(Value::Null)).is_err());
    assert_eq!(pool.borrowed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.returned.load(Ordering::SeqCst), 1);
}

#[test]
fn pool_and_connection_are_both_released_once() {
    let pool = Arc::new(CountingPool::default());
    let manager = Arc::new(CountingConnections::default());
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .pool(pool.clone())
                                                                                       .build_fn(|target: Target<'_, usize, String>, _a: &mut opflow_core::Arguments| {
                                                                                           Ok(Value::from(format!("{}@{}",
                                                                                                                  target.instance.map(|s| s.clone()).unwrap_or_default(),
                                                                                                                  target.connection.map(|c| *c).unwrap_or_default())))
                                                                                       });

    let out = processor.invoke(Event::with_payload(Value::Null)).unwrap();
    assert_eq!(out.payload(), &Value::from("worker@1"));
    assert_eq!(pool.returned.load(Ordering::SeqCst), 1);
    assert_eq!(manager.released.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_borrow_is_reported_as_instance_failure_and_releases_connection() {
    let pool = Arc::new(CountingPool::default());
    pool.fail_borrow.store(true, Ordering::SeqCst);
    let manager = Arc::new(CountingConnections::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let op_calls = calls.clone();
    let processor = OperationProcessor::builder(signature(), configs(), default_engine()).connections(manager.clone())
                                                                                       .pool(pool.clone())
                                                                                       .build_fn(move |_t: Target<'_, usize, String>, _a: &mut opflow_core::Arguments| {
                                                                                           op_calls.fetch_add(1, Ordering::SeqCst);
                                                                                           Ok(Value::Null)
                                                                                       });

    let err = processor.invoke(Event::with_payload(Value::Null)).unwrap_err();
    assert!(matches!(err, InvokeError::InstanceBorrowFailed { ref reason, .. } if reason == "worker factory down"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(manager.released.load(Ordering::SeqCst), 1);
    assert_eq!(pool.returned.load(Ordering::SeqCst), 0);
}

#[test]
fn configuration_errors_touch_no_resources() {
    let manager = Arc::new(CountingConnections::default());
    let two = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("a")).with(ModuleConfig::new("b")));
    let ambiguous = OperationProcessor::builder(signature(), two.clone(), default_engine()).connections(manager.clone())
                                                                                         .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));
    assert!(matches!(ambiguous.invoke(Event::with_payload(Value::Null)), Err(InvokeError::AmbiguousConfiguration(2))));

    let unknown = OperationProcessor::builder(signature(), two, default_engine()).connections(manager.clone())
                                                                               .config_ref("missing")
                                                                               .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));
    assert!(matches!(unknown.invoke(Event::with_payload(Value::Null)), Err(InvokeError::ConfigNotFound(ref n)) if n == "missing"));
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 0);
}

#[test]
fn coercion_errors_touch_no_resources() {
    let manager = Arc::new(CountingConnections::default());
    let sig = OperationSignature::builder("query").param("limit", DeclaredType::scalar("int"))
                                                  .connection_param("username", DeclaredType::scalar("String"))
                                                  .build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs(), default_engine()).connections(manager.clone())
                                                                               .argument("limit", "ten")
                                                                               .build_fn(|_t: Target<'_, usize, ()>, _a: &mut opflow_core::Arguments| Ok(Value::Null));
    assert!(matches!(processor.invoke(Event::with_payload(Value::Null)), Err(InvokeError::Transform(_))));
    assert_eq!(manager.acquired.load(Ordering::SeqCst), 0);
}
