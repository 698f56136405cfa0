pub mod installer;
pub mod loader;
pub mod lock;
pub mod reference;
pub mod resolver;
pub mod version;

pub use installer::{InstalledPlugin, Installer, LocalInstaller};
pub use loader::{PluginLoader, ProviderClient, ProviderSettings, StaticPluginLoader};
pub use lock::{LockEntry, LockFile, LockStore};
pub use reference::ProviderReference;
pub use resolver::{PluginResolver, Resolution, ResolutionOutcome};
pub use version::VersionSpec;
