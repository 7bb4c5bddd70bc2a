//! Loading contexts
//!
//! A loading context owns the code of one isolation group and resolves
//! entry symbols with an explicit precedence between the group's own
//! artifacts and the host's shared symbols:
//!
//! - self-first (child-first): group artifacts, then host
//! - parent-first: host, then group artifacts
//!
//! Contexts of different groups never see each other's symbols.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::module::isolation::group::IsolationGroup;
use crate::module::isolation::symbols::{EntrySymbol, SymbolRegistry, SymbolTable};
use crate::module::traits::ModuleError;

/// Where a symbol lookup is directed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSource {
    /// The artifacts of the context's own group
    Group,
    /// The host's shared symbols
    Host,
}

/// Isolated loading context of one group
pub trait LoadingContext: Send + Sync {
    /// Base key of the group this context serves
    fn group_key(&self) -> &str;

    /// Order in which symbol sources are searched
    fn precedence(&self) -> &[SymbolSource];

    /// Resolve an entry symbol by fully qualified name
    fn resolve(&self, name: &str) -> Option<EntrySymbol>;

    /// Whether a resource path is exported outside the context
    fn is_exported(&self, resource: &str) -> bool;

    /// Release the context's resources
    fn close(&self) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Produces a loading context for a group definition
pub trait LoadingEnvironmentFactory: Send + Sync {
    fn create(&self, group: &IsolationGroup) -> Result<Box<dyn LoadingContext>, ModuleError>;
}

/// Factory backed by a [`SymbolRegistry`]
#[derive(Debug, Clone)]
pub struct RegistryEnvironmentFactory {
    registry: Arc<SymbolRegistry>,
}

impl RegistryEnvironmentFactory {
    pub fn new(registry: SymbolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }
}

impl LoadingEnvironmentFactory for RegistryEnvironmentFactory {
    fn create(&self, group: &IsolationGroup) -> Result<Box<dyn LoadingContext>, ModuleError> {
        let mut artifacts = Vec::with_capacity(group.files().len());
        for file in group.files() {
            match self.registry.artifact(file) {
                Some(table) => artifacts.push((file.clone(), Arc::clone(table))),
                None => debug!(
                    "File {} of group {} provides no entry symbols",
                    file.display(),
                    group.base_key()
                ),
            }
        }

        let precedence = if group.is_self_first() {
            vec![SymbolSource::Group, SymbolSource::Host]
        } else {
            vec![SymbolSource::Host, SymbolSource::Group]
        };

        info!(
            "Created loading context for group {} ({} files, {:?}, compatibility mode {})",
            group.base_key(),
            group.files().len(),
            precedence,
            group.is_compatibility_mode()
        );

        Ok(Box::new(RegistryLoadingContext {
            group_key: group.base_key().to_string(),
            artifacts,
            registry: Arc::clone(&self.registry),
            precedence,
            compatibility_mode: group.is_compatibility_mode(),
            export_mask: group.export_mask().iter().cloned().collect(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Context created by [`RegistryEnvironmentFactory`]
pub struct RegistryLoadingContext {
    group_key: String,
    artifacts: Vec<(PathBuf, Arc<SymbolTable>)>,
    registry: Arc<SymbolRegistry>,
    precedence: Vec<SymbolSource>,
    compatibility_mode: bool,
    export_mask: Vec<String>,
    closed: AtomicBool,
}

impl RegistryLoadingContext {
    fn resolve_in_group(&self, name: &str) -> Option<EntrySymbol> {
        // Artifacts are searched in path order; the first definition wins
        self.artifacts
            .iter()
            .find_map(|(_, table)| table.get(name))
            .cloned()
    }

    fn resolve_in_host(&self, name: &str) -> Option<EntrySymbol> {
        if !self.compatibility_mode && !self.registry.is_host_exported(name) {
            return None;
        }
        self.registry.host().get(name).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl LoadingContext for RegistryLoadingContext {
    fn group_key(&self) -> &str {
        &self.group_key
    }

    fn precedence(&self) -> &[SymbolSource] {
        &self.precedence
    }

    fn resolve(&self, name: &str) -> Option<EntrySymbol> {
        if self.is_closed() {
            return None;
        }
        self.precedence.iter().find_map(|source| match source {
            SymbolSource::Group => self.resolve_in_group(name),
            SymbolSource::Host => self.resolve_in_host(name),
        })
    }

    fn is_exported(&self, resource: &str) -> bool {
        self.export_mask
            .iter()
            .any(|prefix| resource.starts_with(prefix.as_str()))
    }

    fn close(&self) -> Result<(), ModuleError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ModuleError::OperationError(format!(
                "Loading context of group {} is already closed",
                self.group_key
            )));
        }
        debug!("Closed loading context of group {}", self.group_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::isolation::group::IsolationGroupBuilder;
    use crate::module::registry::descriptor::{DescriptorSet, ModuleDescriptor};
    use crate::module::version::HostVersion;

    #[derive(Default)]
    struct HostImpl;
    #[derive(Default)]
    struct GroupImpl;

    fn group(child_first: bool, version: &str) -> IsolationGroup {
        let descriptors = DescriptorSet::from_descriptors(vec![ModuleDescriptor::new(
            "foo",
            "/p/foo.jar",
            "org.foo.FooPlugin",
        )
        .with_child_first(child_first)
        .with_minimum_host_version(HostVersion::parse(version).unwrap())])
        .unwrap();
        IsolationGroupBuilder::new()
            .build(&descriptors)
            .unwrap()
            .remove(0)
    }

    fn factory() -> RegistryEnvironmentFactory {
        let mut registry = SymbolRegistry::new().with_host_symbols(
            SymbolTable::new()
                .with(EntrySymbol::object::<HostImpl>("host.api.Shared"))
                .with(EntrySymbol::object::<HostImpl>("host.internal.Legacy")),
            vec!["host.api.".to_string()],
        );
        registry.register_artifact(
            "/p/foo.jar",
            SymbolTable::new()
                .with(EntrySymbol::object::<GroupImpl>("host.api.Shared"))
                .with(EntrySymbol::object::<GroupImpl>("org.foo.FooPlugin")),
        );
        RegistryEnvironmentFactory::new(registry)
    }

    #[test]
    fn test_parent_first_prefers_host() {
        let context = factory().create(&group(false, "5.2")).unwrap();
        assert_eq!(context.precedence(), [SymbolSource::Host, SymbolSource::Group]);
        let symbol = context.resolve("host.api.Shared").unwrap();
        assert!(symbol.type_name().ends_with("HostImpl"));
        assert!(context.resolve("org.foo.FooPlugin").is_some());
    }

    #[test]
    fn test_self_first_prefers_group() {
        let context = factory().create(&group(true, "5.2")).unwrap();
        assert_eq!(context.precedence(), [SymbolSource::Group, SymbolSource::Host]);
        let symbol = context.resolve("host.api.Shared").unwrap();
        assert!(symbol.type_name().ends_with("GroupImpl"));
    }

    #[test]
    fn test_internal_host_symbols_need_compatibility_mode() {
        let strict = factory().create(&group(false, "5.2")).unwrap();
        assert!(strict.resolve("host.internal.Legacy").is_none());

        let legacy = factory().create(&group(false, "4.5.2")).unwrap();
        assert!(legacy.resolve("host.internal.Legacy").is_some());
    }

    #[test]
    fn test_close_is_single_shot() {
        let context = factory().create(&group(false, "5.2")).unwrap();
        assert!(context.is_exported("static/foo/api/x"));
        context.close().unwrap();
        assert!(context.close().is_err());
        assert!(context.resolve("org.foo.FooPlugin").is_none());
    }
}
