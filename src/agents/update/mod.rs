pub mod orchestrator;
pub mod report;

pub use orchestrator::UpdateOrchestrator;
pub use report::{ProviderUpdateState, UpdateReport};
