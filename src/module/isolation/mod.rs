//! Module isolation
//!
//! Groups modules into isolation groups and provides the loading contexts
//! that resolve their entry symbols.

pub mod context;
pub mod group;
pub mod symbols;

pub use context::{
    LoadingContext, LoadingEnvironmentFactory, RegistryEnvironmentFactory, RegistryLoadingContext,
    SymbolSource,
};
pub use group::{IsolationGroup, IsolationGroupBuilder, MemberPreference};
pub use symbols::{EntrySymbol, SymbolRegistry, SymbolTable, HOST_ABI_VERSION};
