//! Isolation groups
//!
//! Partitions module descriptors into isolation groups. A group is made of a
//! root module (one without a base module) and every extension declaring
//! that root as its base. All members of a group share one loading context.
//!
//! The group's symbol-resolution strategy and compatibility mode come from
//! the root alone. Extensions can add files and entry points to the group
//! but never change how it is isolated.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::module::bundle::ExplodedBundle;
use crate::module::registry::descriptor::{DescriptorSet, ModuleDescriptor};
use crate::module::traits::ModuleError;
use crate::module::version::{HostVersion, DEFAULT_COMPATIBILITY_THRESHOLD};

/// Resource roots exported by every member unless configured otherwise
pub const DEFAULT_SHARED_RESOURCE_ROOTS: [&str; 2] = ["static", "webservices"];

/// Preferences a member declared, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberPreference {
    /// Whether this member is the group's root
    pub root: bool,
    /// Requested child-first resolution
    pub child_first: bool,
    /// Declared minimum host version
    pub minimum_host_version: Option<HostVersion>,
}

/// A set of modules sharing one loading context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IsolationGroup {
    base_key: String,
    files: BTreeSet<PathBuf>,
    entry_classes: BTreeMap<String, String>,
    self_first: bool,
    compatibility_mode: bool,
    export_mask: BTreeSet<String>,
    members: BTreeMap<String, MemberPreference>,
}

impl IsolationGroup {
    fn seed(root: &ModuleDescriptor, compatibility_mode: bool) -> Self {
        let mut members = BTreeMap::new();
        members.insert(
            root.key.clone(),
            MemberPreference {
                root: true,
                child_first: root.child_first,
                minimum_host_version: root.minimum_host_version.clone(),
            },
        );

        Self {
            base_key: root.key.clone(),
            files: BTreeSet::new(),
            entry_classes: BTreeMap::new(),
            self_first: root.child_first,
            compatibility_mode,
            export_mask: BTreeSet::new(),
            members,
        }
    }

    fn add_member(&mut self, descriptor: &ModuleDescriptor, files: Vec<PathBuf>, roots: &[String]) {
        self.files.extend(files);
        self.entry_classes
            .insert(descriptor.key.clone(), descriptor.entry_class.clone());
        for root in roots {
            self.export_mask
                .insert(format!("{}/{}/api/", root, descriptor.key));
        }
        self.members
            .entry(descriptor.key.clone())
            .or_insert_with(|| MemberPreference {
                root: false,
                child_first: descriptor.child_first,
                minimum_host_version: descriptor.minimum_host_version.clone(),
            });
    }

    /// Key of the root module, identity of the group
    pub fn base_key(&self) -> &str {
        &self.base_key
    }

    /// Union of all member files
    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    /// Member key → entry class
    pub fn entry_classes(&self) -> &BTreeMap<String, String> {
        &self.entry_classes
    }

    /// Whether the group's own symbols take precedence over the host's
    pub fn is_self_first(&self) -> bool {
        self.self_first
    }

    /// Whether legacy symbol visibility applies to the group
    pub fn is_compatibility_mode(&self) -> bool {
        self.compatibility_mode
    }

    /// Resource prefixes the group exposes outside its context
    pub fn export_mask(&self) -> &BTreeSet<String> {
        &self.export_mask
    }

    /// Whether a resource path falls under the export mask
    pub fn is_exported(&self, resource: &str) -> bool {
        self.export_mask
            .iter()
            .any(|prefix| resource.starts_with(prefix.as_str()))
    }

    /// Declared preferences of every member
    pub fn members(&self) -> &BTreeMap<String, MemberPreference> {
        &self.members
    }

    /// Member keys in order
    pub fn member_keys(&self) -> impl Iterator<Item = &str> {
        self.entry_classes.keys().map(String::as_str)
    }

    pub fn contains_file(&self, file: &Path) -> bool {
        self.files.contains(file)
    }
}

/// Builds isolation groups from a descriptor set
#[derive(Debug, Clone)]
pub struct IsolationGroupBuilder {
    threshold: HostVersion,
    shared_resource_roots: Vec<String>,
}

impl IsolationGroupBuilder {
    /// Builder with the default threshold (5.2) and resource roots
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_COMPATIBILITY_THRESHOLD,
            shared_resource_roots: DEFAULT_SHARED_RESOURCE_ROOTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Builder configured from the loader configuration
    pub fn from_config(config: &LoaderConfig) -> Result<Self, ModuleError> {
        Ok(Self {
            threshold: config.threshold()?,
            shared_resource_roots: config.shared_resource_roots.clone(),
        })
    }

    pub fn with_threshold(mut self, threshold: HostVersion) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_shared_resource_roots(mut self, roots: Vec<String>) -> Self {
        self.shared_resource_roots = roots;
        self
    }

    pub fn threshold(&self) -> &HostVersion {
        &self.threshold
    }

    /// Whether a root declaring `minimum` needs compatibility mode
    ///
    /// Qualifiers are ignored; no declared version means the module is
    /// assumed to be built for the current API.
    pub fn requires_compatibility_mode(&self, minimum: Option<&HostVersion>) -> bool {
        minimum.map_or(false, |version| {
            version.compare_ignoring_qualifier(&self.threshold) == Ordering::Less
        })
    }

    /// Build groups using each descriptor's declared artifact as its only file
    pub fn build(&self, descriptors: &DescriptorSet) -> Result<Vec<IsolationGroup>, ModuleError> {
        self.build_with_bundles(descriptors, &BTreeMap::new())
    }

    /// Build groups, taking member files from resolved bundles
    ///
    /// A module without a resolved bundle contributes its declared artifact.
    /// Groups are returned ordered by base key. Fails without returning any
    /// group if an extension's base key is not a root module.
    pub fn build_with_bundles(
        &self,
        descriptors: &DescriptorSet,
        bundles: &BTreeMap<String, ExplodedBundle>,
    ) -> Result<Vec<IsolationGroup>, ModuleError> {
        let (roots, extensions): (Vec<&ModuleDescriptor>, Vec<&ModuleDescriptor>) =
            descriptors.iter().partition(|d| !d.is_extension());

        let mut groups: BTreeMap<String, IsolationGroup> = BTreeMap::new();

        for root in roots {
            let compatibility_mode =
                self.requires_compatibility_mode(root.minimum_host_version.as_ref());
            if compatibility_mode {
                info!(
                    "API compatibility mode is enabled on module {} (built with host version {} lower than {})",
                    root.key,
                    root.minimum_host_version
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    self.threshold
                );
            }

            let mut group = IsolationGroup::seed(root, compatibility_mode);
            group.add_member(root, Self::member_files(root, bundles), &self.shared_resource_roots);
            groups.insert(root.key.clone(), group);
        }

        for extension in extensions {
            let base_key = extension.base_module.as_deref().unwrap_or_default();
            let group = groups
                .get_mut(base_key)
                .ok_or_else(|| ModuleError::MissingBaseModule {
                    key: extension.key.clone(),
                    base_key: base_key.to_string(),
                })?;

            if extension.child_first != group.self_first {
                warn!(
                    "Module {} requests {} resolution but shares the {} context of base module {}; request ignored",
                    extension.key,
                    strategy_name(extension.child_first),
                    strategy_name(group.self_first),
                    base_key
                );
            }

            group.add_member(
                extension,
                Self::member_files(extension, bundles),
                &self.shared_resource_roots,
            );
            debug!("Module {} joined isolation group {}", extension.key, base_key);
        }

        info!(
            "Defined {} isolation groups for {} modules",
            groups.len(),
            descriptors.len()
        );
        Ok(groups.into_values().collect())
    }

    fn member_files(
        descriptor: &ModuleDescriptor,
        bundles: &BTreeMap<String, ExplodedBundle>,
    ) -> Vec<PathBuf> {
        match bundles.get(&descriptor.key) {
            Some(bundle) => bundle.files().map(Path::to_path_buf).collect(),
            None => vec![descriptor.artifact.clone()],
        }
    }
}

impl Default for IsolationGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn strategy_name(self_first: bool) -> &'static str {
    if self_first {
        "child-first"
    } else {
        "parent-first"
    }
}
