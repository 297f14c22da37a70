use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use opflow_core::invoke::{OperationSignature, Target};
use opflow_core::resource::ConnectionKey;
use opflow_core::{default_engine, Arguments, DeclaredType, Event, FnProcessor, InMemoryConfigRegistry, InvokeError, Message, MessageProcessor,
                  MessageSource, ModuleConfig, OperationError, OperationProcessor, ProcessorChain, PropertyScope, RawArgument, ThreadingModel,
                  TypeResolver, Value};
use opflow_pool::{ConnectionFactory, InstanceFactory, InstanceManager, InstancePool, KeyedConnectionPool, KeyedManager, PoolError};
use log::info;
use opflow_rust::{AppError, CONFIG};

/// Factory de sesiones de demo: una "sesión" por usuario.
struct DemoSessions {
    connects: AtomicUsize,
}

impl ConnectionFactory for DemoSessions {
    type Connection = String;

    fn connect(&self, key: &ConnectionKey) -> Result<String, PoolError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        let user = key.get("username")
                      .and_then(Value::as_str)
                      .ok_or_else(|| PoolError::Connect("username ausente".into()))?;
        Ok(format!("{user}#{n}"))
    }
}

/// Instancias sin estado del "módulo" de demo.
struct DemoGreeter;

impl InstanceFactory for DemoGreeter {
    type Instance = String;

    fn create(&self) -> Result<String, PoolError> {
        Ok("hola".to_string())
    }
}

type DemoTarget<'a> = Target<'a, r2d2::PooledConnection<KeyedManager<DemoSessions>>, r2d2::PooledConnection<InstanceManager<DemoGreeter>>>;
type NoTarget<'a> = Target<'a, (), ()>;

fn check(cond: bool, msg: &str) -> Result<(), AppError> {
    if cond {
        Ok(())
    } else {
        Err(AppError::Demo(msg.to_string()))
    }
}

fn main() {
    // Cargar variables de entorno desde .env si existe (antes de leer CONFIG)
    let _ = dotenvy::dotenv();
    env_logger::init();
    if let Err(e) = CONFIG.validate() {
        eprintln!("[CONFIG] Error: {e}");
        std::process::exit(1);
    }
    info!("main-core con {} reintento(s) y pool de {} conexiones", CONFIG.runtime.max_retry_attempts, CONFIG.pooling.max_active);
    println!("Configuración: {:?}", *CONFIG);

    println!("--- Iniciando validación de coerción ---");
    if let Err(e) = run_coercion_validation() {
        eprintln!("[COERCION] Error: {e}");
        std::process::exit(1);
    }
    println!("[COERCION] Validación OK");

    println!("--- Iniciando validación de recursos y reintentos ---");
    if let Err(e) = run_resource_validation() {
        eprintln!("[RESOURCES] Error: {e}");
        std::process::exit(1);
    }
    println!("[RESOURCES] Validación OK");

    println!("--- Iniciando validación de nested processors ---");
    if let Err(e) = run_nested_validation() {
        eprintln!("[NESTED] Error: {e}");
        std::process::exit(1);
    }
    println!("[NESTED] Validación OK");

    println!("--- Iniciando validación de message source ---");
    if let Err(e) = run_source_validation() {
        eprintln!("[SOURCE] Error: {e}");
        std::process::exit(1);
    }
    println!("[SOURCE] Validación OK");
}

/// Coerción de headers y payload según el tipo declarado de cada parámetro.
fn run_coercion_validation() -> Result<(), AppError> {
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("default")));
    let sig = OperationSignature::builder("sum").param("items", DeclaredType::sequence(DeclaredType::scalar("int")))
                                                .inbound_headers("factor", "factor", DeclaredType::scalar("long"))
                                                .build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs, default_engine()).argument("items", Value::from(vec!["1", "#[header:INBOUND:second]", "3"]))
                                                                              .build_fn(|_t: NoTarget<'_>, args: &mut Arguments| {
                                                                                  let factor = match args.value("factor") {
                                                                                      Some(Value::Long(f)) => *f,
                                                                                      _ => return Err(OperationError::new("BadInput", "factor no es long")),
                                                                                  };
                                                                                  let Some(Value::Seq(items)) = args.value("items") else {
                                                                                      return Err(OperationError::new("BadInput", "items no es lista"));
                                                                                  };
                                                                                  let total: i64 = items.iter()
                                                                                                        .filter_map(|v| match v {
                                                                                                            Value::Int(i) => Some(i64::from(*i)),
                                                                                                            _ => None,
                                                                                                        })
                                                                                                        .sum();
                                                                                  Ok(Value::Long(total * factor))
                                                                              });
    let message = Message::new(Value::Null).with_property(PropertyScope::Inbound, "factor", "10")
                                           .with_property(PropertyScope::Inbound, "second", "2");
    let out = processor.invoke(Event::new(message))?;
    println!("[COERCION] resultado: {:?}", out.payload());
    check(out.payload() == &Value::Long(60), "la suma coercionada debe ser 60")
}

/// Pool de conexiones por clave + pool de instancias, con una invalidación
/// forzada que consume un reintento.
fn run_resource_validation() -> Result<(), AppError> {
    let profile = CONFIG.pooling.clone();
    let connections = Arc::new(KeyedConnectionPool::new(DemoSessions { connects: AtomicUsize::new(0) }, profile.clone()));
    let instances = Arc::new(InstancePool::new(DemoGreeter, &profile));
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("crm").with_value("username", "demo")));
    let sig = OperationSignature::builder("greet").payload("name")
                                                  .connection_param("username", DeclaredType::scalar("String"))
                                                  .build(&TypeResolver::default());
    let failures = Arc::new(AtomicUsize::new(0));
    let op_failures = failures.clone();
    let processor = OperationProcessor::builder(sig, configs, default_engine()).connections(connections.clone())
                                                                              .pool(instances)
                                                                              .invalidate_on_class("SessionExpired")
                                                                              .max_retry_attempts(CONFIG.runtime.max_retry_attempts.max(1))
                                                                              .build_fn(move |target: DemoTarget<'_>, args: &mut Arguments| {
                                                                                  if op_failures.fetch_add(1, Ordering::SeqCst) == 0 {
                                                                                      return Err(OperationError::new("SessionExpired", "sesión caducada"));
                                                                                  }
                                                                                  let session = target.connection.map(|c| c.as_str().to_string()).unwrap_or_default();
                                                                                  let greeting = target.instance.map(|i| i.as_str().to_string()).unwrap_or_default();
                                                                                  let name = args.value("name").and_then(Value::as_str).unwrap_or("?").to_string();
                                                                                  Ok(Value::from(format!("{greeting} {name} via {session}")))
                                                                              });

    let out = processor.invoke(Event::with_payload("mundo"))?;
    println!("[RESOURCES] resultado: {:?}", out.payload());
    check(out.payload() == &Value::from("hola mundo via demo#2"), "la segunda sesión debe atender la invocación")?;
    check(processor.retry_state().attempts() == 0, "el contador debe reiniciarse tras el éxito")?;
    println!("[RESOURCES] claves con pool: {}", connections.key_count());
    Ok(())
}

/// Un nested processor ejecutado por elemento más un literal de respaldo.
fn run_nested_validation() -> Result<(), AppError> {
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("default")));
    let shout = ProcessorChain::new().then(FnProcessor::new(|mut e: Event| {
                                         let text = e.payload().as_str().unwrap_or_default().to_uppercase();
                                         e.message.payload = Value::from(text);
                                         Ok(e)
                                     }));
    let sig = OperationSignature::builder("for_each").payload("items")
                                                     .nested("each")
                                                     .nested("empty")
                                                     .build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs, default_engine()).argument("each", RawArgument::processor(shout))
                                                                              .argument("empty", "(vacío)")
                                                                              .build_fn(|_t: NoTarget<'_>, args: &mut Arguments| {
                                                                                  let items = match args.value("items") {
                                                                                      Some(Value::Seq(items)) if !items.is_empty() => items.clone(),
                                                                                      _ => {
                                                                                          let empty = args.nested("empty").ok_or_else(|| OperationError::new("BadInput", "sin literal"))?;
                                                                                          return Ok(empty.run_current()?);
                                                                                      }
                                                                                  };
                                                                                  let each = args.nested("each").ok_or_else(|| OperationError::new("BadInput", "sin nested"))?;
                                                                                  let out = items.into_iter().map(|i| each.run(i)).collect::<Result<Vec<_>, InvokeError>>()?;
                                                                                  Ok(Value::Seq(out))
                                                                              });
    let out = processor.invoke(Event::with_payload(vec!["uno", "dos"]))?;
    println!("[NESTED] resultado: {:?}", out.payload());
    check(out.payload() == &Value::from(vec!["UNO", "DOS"]), "cada elemento debe pasar por la cadena")?;
    let empty = processor.invoke(Event::with_payload(Vec::<Value>::new()))?;
    check(empty.payload() == &Value::from("(vacío)"), "una lista vacía usa el literal")
}

/// Source inline que emite tres eventos hacia un listener.
fn run_source_validation() -> Result<(), AppError> {
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("default")));
    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink = collected.clone();
    let listener: Arc<dyn MessageProcessor> = Arc::new(FnProcessor::new(move |e: Event| {
                                                           if let Ok(mut seen) = sink.lock() {
                                                               seen.push(e.payload().clone());
                                                           }
                                                           Ok(e)
                                                       }));
    let sig = OperationSignature::builder("tick").source_callback("callback").void().build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs, default_engine()).listener(listener)
                                                                              .build_fn(|_t: NoTarget<'_>, args: &mut Arguments| {
                                                                                  let cb = args.source("callback").ok_or_else(|| OperationError::new("BadInput", "sin callback"))?;
                                                                                  for n in 1..=3 {
                                                                                      cb.process(n)?;
                                                                                  }
                                                                                  Ok(Value::Null)
                                                                              });
    let source = MessageSource::new(processor, ThreadingModel::NoThread)?;
    source.start()?;
    source.stop()?;
    let seen = collected.lock().map(|s| s.clone()).unwrap_or_default();
    println!("[SOURCE] eventos: {:?}", seen);
    check(seen == vec![Value::Int(1), Value::Int(2), Value::Int(3)], "el listener debe recibir 1, 2, 3")
}
