//! Module catalog files
//!
//! A catalog is a TOML list of descriptors, one `[[module]]` table per
//! module. It stands in for the artifact scanner when descriptors are kept
//! in configuration, e.g. by the planning tool.
//!
//! ```toml
//! [[module]]
//! key = "foo"
//! artifact = "plugins/foo"
//! entry_class = "org.foo.FooPlugin"
//! minimum_host_version = "5.2"
//!
//! [[module]]
//! key = "fooExtension"
//! artifact = "plugins/foo-extension"
//! entry_class = "org.foo.ExtensionPlugin"
//! base_module = "foo"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::module::registry::descriptor::{DescriptorSet, ModuleDescriptor};
use crate::module::traits::ModuleError;

/// Parsed catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleCatalog {
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleDescriptor>,
}

impl ModuleCatalog {
    /// Parse a catalog from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        let catalog: ModuleCatalog = toml::from_str(contents)?;
        Ok(catalog)
    }

    /// Load a catalog file
    ///
    /// Relative artifact locations are resolved against the directory that
    /// contains the catalog.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ModuleError::ConfigError(format!(
                "Failed to read catalog {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut catalog = Self::from_toml_str(&contents)?;
        if let Some(dir) = path.parent() {
            for module in &mut catalog.modules {
                if module.artifact.is_relative() {
                    module.artifact = dir.join(&module.artifact);
                }
            }
        }

        info!(
            "Loaded catalog {} with {} modules",
            path.display(),
            catalog.modules.len()
        );
        Ok(catalog)
    }

    /// Convert into a descriptor set, rejecting duplicate keys
    pub fn into_descriptor_set(self) -> Result<DescriptorSet, ModuleError> {
        debug!("Building descriptor set from catalog");
        DescriptorSet::from_descriptors(self.modules)
    }
}
