//! Module system
//!
//! Loads modules into isolated loading contexts.
//!
//! ## Architecture
//!
//! - **Isolation groups**: a root module and its extensions share one context
//! - **Root-owned strategy**: self-first resolution and compatibility mode come from the root
//! - **Registered entry points**: artifacts register named entry symbols, no scanning
//! - **All-or-nothing loading**: any failure aborts the whole load

pub mod bundle;
pub mod isolation;
pub mod loader;
pub mod registry;
pub mod traits;
pub mod validation;
pub mod version;

pub use bundle::{BundleResolver, DirectoryBundleResolver, ExplodedBundle, PassthroughBundleResolver};
pub use isolation::{
    EntrySymbol, IsolationGroup, IsolationGroupBuilder, LoadingContext, LoadingEnvironmentFactory,
    RegistryEnvironmentFactory, SymbolRegistry, SymbolSource, SymbolTable,
};
pub use loader::{EntryPointInstantiator, LoadedModules, ModuleLoader};
pub use registry::{ComponentRegistry, DescriptorSet, ModuleCatalog, ModuleDescriptor};
pub use traits::{InstantiationCause, Module, ModuleContext, ModuleError, ModuleInstance};
pub use version::HostVersion;
