//! Module registry
//!
//! Descriptors of installed modules, the catalog they are read from, and
//! the host-side registry of loaded components.

pub mod catalog;
pub mod components;
pub mod descriptor;

pub use catalog::ModuleCatalog;
pub use components::ComponentRegistry;
pub use descriptor::{DescriptorSet, ModuleDescriptor};
