//! Module system traits and errors
//!
//! Defines the capability contract every loaded module implements and the
//! errors raised while isolating and loading modules.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::module::version::HostVersion;

/// Module trait that every entry point must satisfy
///
/// An entry symbol whose constructor produces anything other than a boxed
/// `Module` fails the capability check during instantiation.
pub trait Module: Send + Sync {
    /// Declare the extensions this module contributes to the host
    fn define(&self, context: &mut ModuleContext);

    /// Access the concrete instance, used by the host to recover its type
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("type_id", &self.as_any().type_id())
            .finish()
    }
}

/// A live module as handed to the host's registry
pub type ModuleInstance = Box<dyn Module>;

/// Context handed to a module's `define` hook
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Key of the module being defined
    pub module_key: String,
    /// Version of the running host
    pub host_version: HostVersion,
    /// Module configuration (key-value pairs from config file)
    pub config: HashMap<String, String>,
    extensions: Vec<String>,
}

impl ModuleContext {
    /// Create a new module context
    pub fn new(
        module_key: impl Into<String>,
        host_version: HostVersion,
        config: HashMap<String, String>,
    ) -> Self {
        Self {
            module_key: module_key.into(),
            host_version,
            config,
            extensions: Vec::new(),
        }
    }

    /// Register an extension by name
    pub fn add_extension(&mut self, name: impl Into<String>) -> &mut Self {
        self.extensions.push(name.into());
        self
    }

    /// Extensions registered so far, in declaration order
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Get a configuration value
    pub fn get_config(&self, key: &str) -> Option<&String> {
        self.config.get(key)
    }

    /// Get a configuration value with default
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.config
            .get(key)
            .map(|s| s.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

/// Why an entry point could not be instantiated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiationCause {
    #[error("entry symbol not found in loading context of group [{group}]")]
    SymbolNotFound { group: String },

    #[error("entry symbol has no zero-argument constructor")]
    NoDefaultConstructor,

    #[error("constructor failed: {0}")]
    ConstructorFailed(String),

    #[error("constructed object of type {type_name} does not implement the module contract")]
    ContractMismatch { type_name: String },
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module [{key}] declares base module [{base_key}] which is not an installed root module")]
    MissingBaseModule { key: String, base_key: String },

    #[error("Module key [{0}] is declared more than once")]
    DuplicateModuleKey(String),

    #[error("Fail to instantiate class [{class}] of plugin [{key}]")]
    Instantiation {
        class: String,
        key: String,
        #[source]
        cause: InstantiationCause,
    },

    #[error("The plugin [{key}] does not support host ABI {host_abi} (built for ABI {module_abi})")]
    UnsupportedAbi {
        key: String,
        host_abi: u32,
        module_abi: u32,
    },

    #[error("Invalid module descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid host version: {0}")]
    InvalidVersion(String),

    #[error("Failed to resolve bundle of module [{key}]: {reason}")]
    BundleResolution { key: String, reason: String },

    #[error("Failed to create loading context for group [{base_key}]: {reason}")]
    ContextCreation { base_key: String, reason: String },

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Module operation failed: {0}")]
    OperationError(String),
}

impl ModuleError {
    /// Key of the module this error is attributed to, if any
    pub fn module_key(&self) -> Option<&str> {
        match self {
            ModuleError::MissingBaseModule { key, .. }
            | ModuleError::Instantiation { key, .. }
            | ModuleError::UnsupportedAbi { key, .. }
            | ModuleError::BundleResolution { key, .. } => Some(key.as_str()),
            ModuleError::DuplicateModuleKey(key) | ModuleError::ComponentNotFound(key) => {
                Some(key.as_str())
            }
            ModuleError::ContextCreation { base_key, .. } => Some(base_key.as_str()),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ModuleError {
    fn from(e: toml::de::Error) -> Self {
        ModuleError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for ModuleError {
    fn from(e: serde_json::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}

impl From<anyhow::Error> for ModuleError {
    fn from(e: anyhow::Error) -> Self {
        ModuleError::OperationError(e.to_string())
    }
}
