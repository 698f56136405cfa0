use crate::config::ResolvedConfig;
use crate::error::{CgError, Result};
use crate::storage::{DgraphEngine, StorageEngine, dgraph};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

pub type EngineConstructor =
    Box<dyn Fn(&ResolvedConfig) -> Result<Arc<dyn StorageEngine>> + Send + Sync>;

/// Maps engine names to constructors and keeps one instance per name for
/// the lifetime of a run.
pub struct StorageEngineRegistry {
    constructors: BTreeMap<String, EngineConstructor>,
    instances: Mutex<HashMap<String, Arc<dyn StorageEngine>>>,
}

impl StorageEngineRegistry {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(dgraph::ENGINE_NAME, Box::new(DgraphEngine::connect));
        registry
    }

    pub fn register(&mut self, name: &str, constructor: EngineConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Return the engine registered under `name`, constructing it on first use.
    /// A failed construction is not cached.
    pub fn get(&self, name: &str, config: &ResolvedConfig) -> Result<Arc<dyn StorageEngine>> {
        let mut instances = self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = instances.get(name) {
            return Ok(engine.clone());
        }

        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| CgError::UnknownStorageEngine(name.to_string()))?;

        let engine = constructor(config)?;
        instances.insert(name.to_string(), engine.clone());
        Ok(engine)
    }

    pub fn close_all(&self) -> Result<()> {
        let instances: Vec<Arc<dyn StorageEngine>> = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, engine)| engine)
            .collect();

        for engine in instances {
            engine.close()?;
        }
        Ok(())
    }
}

impl Default for StorageEngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullEngine;

    impl StorageEngine for NullEngine {
        fn name(&self) -> &str {
            "null"
        }

        fn host(&self) -> &str {
            "memory"
        }

        fn query(&self, _query: &str) -> Result<Value> {
            Ok(Value::Null)
        }

        fn write(&self, _mutation: &Value) -> Result<()> {
            Ok(())
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn counting_registry(count: Arc<AtomicUsize>) -> StorageEngineRegistry {
        let mut registry = StorageEngineRegistry::new();
        registry.register(
            "null",
            Box::new(move |_config: &ResolvedConfig| {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(NullEngine) as Arc<dyn StorageEngine>)
            }),
        );
        registry
    }

    #[test]
    fn same_instance_is_returned_for_a_name() {
        let registry = StorageEngineRegistry::with_builtin();
        let config = ResolvedConfig::default();

        let first = registry.get("dgraph", &config).unwrap();
        let second = registry.get("dgraph", &config).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.host(), "http://localhost:8080");
    }

    #[test]
    fn constructor_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(count.clone());
        let config = ResolvedConfig::default();

        for _ in 0..3 {
            registry.get("null", &config).unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_engine_is_an_error() {
        let registry = StorageEngineRegistry::with_builtin();
        let err = registry.get("neo4j", &ResolvedConfig::default()).err().unwrap();
        assert!(matches!(err, CgError::UnknownStorageEngine(name) if name == "neo4j"));
    }

    #[test]
    fn failed_construction_is_not_cached() {
        let registry = StorageEngineRegistry::with_builtin();
        let bad = ResolvedConfig {
            host: "not a url".into(),
            ..Default::default()
        };

        assert!(registry.get("dgraph", &bad).is_err());
        let engine = registry.get("dgraph", &ResolvedConfig::default()).unwrap();
        assert_eq!(engine.name(), "dgraph");
    }

    #[test]
    fn close_all_forgets_instances() {
        let count = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(count.clone());
        let config = ResolvedConfig::default();

        registry.get("null", &config).unwrap();
        registry.close_all().unwrap();
        registry.get("null", &config).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(registry.engine_names(), vec!["null"]);
    }
}
