//! Module descriptors
//!
//! A descriptor is the metadata the external scanner extracted from a module
//! artifact. Descriptors are immutable once a [`DescriptorSet`] is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::module::traits::ModuleError;
use crate::module::version::HostVersion;

/// Metadata of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Unique module key
    pub key: String,
    /// Location of the module artifact
    pub artifact: PathBuf,
    /// Fully qualified name of the entry symbol
    pub entry_class: String,
    /// Key of the module this one extends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_module: Option<String>,
    /// Minimum host version the module was built against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_host_version: Option<HostVersion>,
    /// Requested symbol-resolution order: own artifacts before the host's
    #[serde(default)]
    pub child_first: bool,
    /// Module version (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModuleDescriptor {
    /// Create a parent-first root descriptor with no version constraint
    pub fn new(
        key: impl Into<String>,
        artifact: impl Into<PathBuf>,
        entry_class: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            artifact: artifact.into(),
            entry_class: entry_class.into(),
            base_module: None,
            minimum_host_version: None,
            child_first: false,
            version: None,
            description: None,
        }
    }

    /// Declare the module this one extends
    pub fn with_base_module(mut self, base: impl Into<String>) -> Self {
        self.base_module = Some(base.into());
        self
    }

    /// Set the minimum host version
    pub fn with_minimum_host_version(mut self, version: HostVersion) -> Self {
        self.minimum_host_version = Some(version);
        self
    }

    /// Request child-first (self-first) symbol resolution
    pub fn with_child_first(mut self, child_first: bool) -> Self {
        self.child_first = child_first;
        self
    }

    /// Whether this module extends another one
    pub fn is_extension(&self) -> bool {
        self.base_module.is_some()
    }

    /// Artifact location
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }
}

/// Immutable key → descriptor map with unique keys
///
/// Iteration is ordered by key so that grouping and diagnostics are
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    descriptors: BTreeMap<String, ModuleDescriptor>,
}

impl DescriptorSet {
    /// Build a set from a list of descriptors, rejecting duplicate keys
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, ModuleError>
    where
        I: IntoIterator<Item = ModuleDescriptor>,
    {
        let mut map = BTreeMap::new();
        for descriptor in descriptors {
            if map.contains_key(&descriptor.key) {
                return Err(ModuleError::DuplicateModuleKey(descriptor.key));
            }
            map.insert(descriptor.key.clone(), descriptor);
        }
        debug!("Descriptor set contains {} modules", map.len());
        Ok(Self { descriptors: map })
    }

    /// Build a set from a map produced by the scanner
    ///
    /// Every map key must equal the key declared by its descriptor.
    pub fn from_map<I>(map: I) -> Result<Self, ModuleError>
    where
        I: IntoIterator<Item = (String, ModuleDescriptor)>,
    {
        let mut descriptors = BTreeMap::new();
        for (key, descriptor) in map {
            if key != descriptor.key {
                return Err(ModuleError::InvalidDescriptor(format!(
                    "descriptor registered under key [{}] declares key [{}]",
                    key, descriptor.key
                )));
            }
            if descriptors.insert(key.clone(), descriptor).is_some() {
                return Err(ModuleError::DuplicateModuleKey(key));
            }
        }
        Ok(Self { descriptors })
    }

    pub fn get(&self, key: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in key order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.values()
    }

    /// Module keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a DescriptorSet {
    type Item = &'a ModuleDescriptor;
    type IntoIter = std::collections::btree_map::Values<'a, String, ModuleDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.values()
    }
}
