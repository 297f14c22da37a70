use std::sync::Arc;

use opflow_rust::core::invoke::{OperationSignature, Target};
use opflow_rust::core::{default_engine, Arguments, DeclaredType, Event, InMemoryConfigRegistry, InvokeError, ModuleConfig, OperationProcessor, TypeResolver,
                        Value};
use opflow_rust::{AppConfig, AppError};

#[test]
fn app_config_exposes_sane_defaults() {
    let cfg = AppConfig::from_env();
    assert!(!cfg.runtime.expression_prefix.is_empty());
    assert!(!cfg.runtime.expression_suffix.is_empty());
    assert!(cfg.pooling.max_active >= 1);
    assert!(cfg.validate().is_ok());
}

#[test]
fn invocation_errors_convert_into_app_errors() {
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("a")).with(ModuleConfig::new("b")));
    let sig = OperationSignature::builder("noop").build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs, default_engine()).build_fn(|_t: Target<'_, (), ()>, _a: &mut Arguments| Ok(Value::Null));

    let run = || -> Result<Event, AppError> { Ok(processor.invoke(Event::with_payload("x"))?) };
    match run() {
        Err(AppError::Invoke(InvokeError::AmbiguousConfiguration(n))) => assert_eq!(n, 2),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn config_ref_selects_one_of_many_configurations() {
    let configs = Arc::new(InMemoryConfigRegistry::new().with(ModuleConfig::new("a").with_value("tag", "A"))
                                                        .with(ModuleConfig::new("b").with_value("tag", "B")));
    let sig = OperationSignature::builder("which").param("unused", DeclaredType::any()).build(&TypeResolver::default());
    let processor = OperationProcessor::builder(sig, configs, default_engine()).config_ref("b")
                                                                              .argument("unused", "ignored")
                                                                              .build_fn(|t: Target<'_, (), ()>, _a: &mut Arguments| {
                                                                                  Ok(t.config.get("tag").cloned().unwrap_or(Value::Null))
                                                                              });
    let out = processor.invoke(Event::with_payload(Value::Null)).unwrap();
    assert_eq!(out.payload(), &Value::from("B"));
}
