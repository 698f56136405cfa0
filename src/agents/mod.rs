pub mod client_cache;
pub mod update;

pub use client_cache::ProviderClientCache;
pub use update::{UpdateOrchestrator, UpdateReport};
