use crate::error::Result;
use serde_json::Value;

pub mod dgraph;
pub mod registry;

pub use dgraph::DgraphEngine;
pub use registry::StorageEngineRegistry;

/// A backend that persists and queries collected graph data
pub trait StorageEngine: Send + Sync {
    fn name(&self) -> &str;

    fn host(&self) -> &str;

    fn query(&self, query: &str) -> Result<Value>;

    fn write(&self, mutation: &Value) -> Result<()>;

    fn close(&self) -> Result<()>;
}
