//! Module loading system
//!
//! Turns a descriptor set into live module instances, one isolated loading
//! context per group.

pub mod instantiator;
pub mod loader;

pub use instantiator::EntryPointInstantiator;
pub use loader::{LoadedModules, ModuleLoader};
