//! Entry symbols and symbol tables
//!
//! Modules do not get discovered by scanning their code. Each artifact
//! registers the entry symbols it provides under their fully qualified
//! names, and a loading context resolves an entry class by looking the name
//! up in the tables of its group's artifacts and in the host's shared table.
//!
//! An entry symbol optionally carries a zero-argument constructor. The
//! constructor returns a type-erased object; only objects built through
//! [`EntrySymbol::module`] or [`EntrySymbol::module_with`] satisfy the module
//! contract.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::module::traits::{Module, ModuleInstance};

/// ABI revision implemented by this host
pub const HOST_ABI_VERSION: u32 = 1;

/// Type-erased constructed object
pub type ErasedInstance = Box<dyn Any + Send + Sync>;

/// Zero-argument constructor of an entry symbol
pub type Constructor = Arc<dyn Fn() -> Result<ErasedInstance, String> + Send + Sync>;

/// A named construction entry point
#[derive(Clone)]
pub struct EntrySymbol {
    name: String,
    constructor: Option<Constructor>,
    type_name: &'static str,
    abi_version: u32,
}

impl EntrySymbol {
    /// Entry symbol for a module type with a `Default` constructor
    pub fn module<T>(name: impl Into<String>) -> Self
    where
        T: Module + Default + 'static,
    {
        Self::module_with(name, || Ok(T::default()))
    }

    /// Entry symbol for a module type with a fallible constructor
    pub fn module_with<T, F>(name: impl Into<String>, constructor: F) -> Self
    where
        T: Module + 'static,
        F: Fn() -> Result<T, String> + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(move || {
            let module: ModuleInstance = Box::new(constructor()?);
            let erased: ErasedInstance = Box::new(module);
            Ok(erased)
        });
        Self {
            name: name.into(),
            constructor: Some(constructor),
            type_name: std::any::type_name::<T>(),
            abi_version: HOST_ABI_VERSION,
        }
    }

    /// Entry symbol whose constructor builds an arbitrary object
    ///
    /// The object does not satisfy the module contract unless it is itself a
    /// [`ModuleInstance`].
    pub fn object<T>(name: impl Into<String>) -> Self
    where
        T: Any + Send + Sync + Default,
    {
        let constructor: Constructor = Arc::new(|| {
            let erased: ErasedInstance = Box::new(T::default());
            Ok(erased)
        });
        Self {
            name: name.into(),
            constructor: Some(constructor),
            type_name: std::any::type_name::<T>(),
            abi_version: HOST_ABI_VERSION,
        }
    }

    /// Entry symbol that exists but cannot be built without arguments
    pub fn without_default_constructor<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
            type_name: std::any::type_name::<T>(),
            abi_version: HOST_ABI_VERSION,
        }
    }

    /// Override the ABI revision the symbol was built for
    pub fn with_abi_version(mut self, abi_version: u32) -> Self {
        self.abi_version = abi_version;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn has_default_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Rust type the constructor builds
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn abi_version(&self) -> u32 {
        self.abi_version
    }
}

impl fmt::Debug for EntrySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrySymbol")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("has_default_constructor", &self.has_default_constructor())
            .field("abi_version", &self.abi_version)
            .finish()
    }
}

/// Entry symbols provided by one artifact, or by the host
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, EntrySymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol, replacing any previous one with the same name
    pub fn register(&mut self, symbol: EntrySymbol) -> &mut Self {
        self.symbols.insert(symbol.name.clone(), symbol);
        self
    }

    /// Builder-style registration
    pub fn with(mut self, symbol: EntrySymbol) -> Self {
        self.register(symbol);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EntrySymbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }
}

/// Symbols of every known artifact plus the host's shared symbols
///
/// Host symbols whose name starts with one of the export prefixes are
/// visible to every context; the others only to contexts running in
/// compatibility mode.
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    artifacts: HashMap<PathBuf, Arc<SymbolTable>>,
    host: Arc<SymbolTable>,
    host_exports: Vec<String>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the symbols an artifact file provides
    pub fn register_artifact(&mut self, path: impl Into<PathBuf>, table: SymbolTable) -> &mut Self {
        self.artifacts.insert(path.into(), Arc::new(table));
        self
    }

    /// Set the host's shared symbols and the prefixes it exports
    pub fn with_host_symbols(mut self, table: SymbolTable, exports: Vec<String>) -> Self {
        self.host = Arc::new(table);
        self.host_exports = exports;
        self
    }

    /// Replace the prefixes of host symbols visible outside compatibility mode
    pub fn with_host_exports(mut self, exports: Vec<String>) -> Self {
        self.host_exports = exports;
        self
    }

    pub fn artifact(&self, path: &Path) -> Option<&Arc<SymbolTable>> {
        self.artifacts.get(path)
    }

    pub fn host(&self) -> &Arc<SymbolTable> {
        &self.host
    }

    pub fn host_exports(&self) -> &[String] {
        &self.host_exports
    }

    /// Whether a host symbol is visible outside compatibility mode
    pub fn is_host_exported(&self, name: &str) -> bool {
        self.host_exports
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}
