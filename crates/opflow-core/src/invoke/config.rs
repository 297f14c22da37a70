//! Configuraciones de módulo y su registro.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::InvokeError;
use crate::model::Value;

/// Configuración de un módulo: nombre más valores por defecto (p.ej. los
/// parámetros de conexión).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleConfig {
    pub name: String,
    pub values: IndexMap<String, Value>,
}

impl ModuleConfig {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(),
               values: IndexMap::new() }
    }

    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Valor configurado; `Null` cuenta como ausente.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }
}

pub trait ConfigRegistry: Send + Sync {
    fn find(&self, name: &str) -> Option<Arc<ModuleConfig>>;

    /// La única configuración registrada. Más de una es ambigua.
    fn find_default(&self) -> Result<Arc<ModuleConfig>, InvokeError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigRegistry {
    configs: IndexMap<String, Arc<ModuleConfig>>,
}

impl InMemoryConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, config: ModuleConfig) -> &mut Self {
        self.configs.insert(config.name.clone(), Arc::new(config));
        self
    }

    pub fn with(mut self, config: ModuleConfig) -> Self {
        self.register(config);
        self
    }
}

impl ConfigRegistry for InMemoryConfigRegistry {
    fn find(&self, name: &str) -> Option<Arc<ModuleConfig>> {
        self.configs.get(name).cloned()
    }

    fn find_default(&self) -> Result<Arc<ModuleConfig>, InvokeError> {
        match self.configs.len() {
            0 => Err(InvokeError::ConfigNotFound("<default>".to_string())),
            1 => Ok(self.configs[0].clone()),
            n => Err(InvokeError::AmbiguousConfiguration(n)),
        }
    }
}
