pub mod registry;

pub use registry::RegistryInstaller;
