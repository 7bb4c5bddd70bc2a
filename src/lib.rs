//! Module Isolation - isolated loading of host modules
//!
//! This crate turns a set of installed module descriptors into live module
//! instances. Modules are partitioned into isolation groups, each group gets
//! its own loading context, and every module's entry point is instantiated
//! inside the context of its group.
//!
//! ## Pipeline
//!
//! 1. Descriptor validation
//! 2. Bundle resolution (main artifact plus bundled libraries)
//! 3. Isolation group definition (root module plus its extensions)
//! 4. One loading context per group
//! 5. Entry point instantiation, all-or-nothing
//!
//! ## Design Principles
//!
//! 1. **Root owns isolation**: strategy and compatibility mode come from the root module only
//! 2. **Deterministic**: the same descriptor set always yields the same groups
//! 3. **No partial loads**: the host refuses to start with a partial module set
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use module_isolation::module::{
//!     DescriptorSet, EntrySymbol, Module, ModuleContext, ModuleDescriptor, ModuleLoader,
//!     RegistryEnvironmentFactory, SymbolRegistry, SymbolTable,
//! };
//!
//! #[derive(Default)]
//! struct FooPlugin;
//!
//! impl Module for FooPlugin {
//!     fn define(&self, context: &mut ModuleContext) {
//!         context.add_extension("FooSensor");
//!     }
//!     fn as_any(&self) -> &dyn std::any::Any {
//!         self
//!     }
//! }
//!
//! let mut registry = SymbolRegistry::new();
//! registry.register_artifact(
//!     "/plugins/foo.jar",
//!     SymbolTable::new().with(EntrySymbol::module::<FooPlugin>("org.foo.FooPlugin")),
//! );
//!
//! let descriptors = DescriptorSet::from_descriptors(vec![ModuleDescriptor::new(
//!     "foo",
//!     "/plugins/foo.jar",
//!     "org.foo.FooPlugin",
//! )])?;
//!
//! let loader = ModuleLoader::new(Arc::new(RegistryEnvironmentFactory::new(registry)));
//! let loaded = loader.load(&descriptors)?;
//! assert!(loaded.get("foo").is_some());
//! # Ok::<(), module_isolation::module::ModuleError>(())
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{LoaderConfig, LoggingConfig};
pub use module::{
    ComponentRegistry, DescriptorSet, HostVersion, IsolationGroup, IsolationGroupBuilder,
    LoadedModules, Module, ModuleDescriptor, ModuleError, ModuleInstance, ModuleLoader,
};
