//! Module loader implementation
//!
//! Runs the startup pass: validate descriptors, resolve bundles, define
//! isolation groups, create one loading context per group and instantiate
//! every member inside it. The pass is all-or-nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::LoaderConfig;
use crate::module::bundle::{BundleResolver, ExplodedBundle, PassthroughBundleResolver};
use crate::module::isolation::context::{
    LoadingContext, LoadingEnvironmentFactory, RegistryEnvironmentFactory,
};
use crate::module::isolation::group::{IsolationGroup, IsolationGroupBuilder};
use crate::module::isolation::symbols::SymbolRegistry;
use crate::module::loader::instantiator::EntryPointInstantiator;
use crate::module::registry::descriptor::DescriptorSet;
use crate::module::traits::{ModuleError, ModuleInstance};
use crate::module::validation::DescriptorValidator;

type GroupOutcome = Result<(Box<dyn LoadingContext>, BTreeMap<String, ModuleInstance>), ModuleError>;

/// Result of a successful load
///
/// Owns the loading contexts; they must outlive the instances built in them.
pub struct LoadedModules {
    groups: Vec<IsolationGroup>,
    contexts: BTreeMap<String, Box<dyn LoadingContext>>,
    instances: BTreeMap<String, ModuleInstance>,
}

impl LoadedModules {
    /// Groups in base-key order
    pub fn groups(&self) -> &[IsolationGroup] {
        &self.groups
    }

    /// Group a module was loaded in
    pub fn group_of(&self, key: &str) -> Option<&IsolationGroup> {
        self.groups
            .iter()
            .find(|group| group.entry_classes().contains_key(key))
    }

    /// Loading context of a group
    pub fn context(&self, base_key: &str) -> Option<&dyn LoadingContext> {
        self.contexts.get(base_key).map(|context| context.as_ref())
    }

    pub fn instances(&self) -> &BTreeMap<String, ModuleInstance> {
        &self.instances
    }

    pub fn get(&self, key: &str) -> Option<&ModuleInstance> {
        self.instances.get(key)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Move the instances out, e.g. into the host's component registry
    ///
    /// The contexts stay here and are closed by [`ModuleLoader::unload`].
    pub fn take_instances(&mut self) -> BTreeMap<String, ModuleInstance> {
        std::mem::take(&mut self.instances)
    }
}

impl std::fmt::Debug for LoadedModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModules")
            .field("groups", &self.groups)
            .field("contexts", &self.contexts.keys().collect::<Vec<_>>())
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Module loader for loading and initializing modules
pub struct ModuleLoader {
    resolver: Arc<dyn BundleResolver>,
    factory: Arc<dyn LoadingEnvironmentFactory>,
    builder: IsolationGroupBuilder,
    instantiator: EntryPointInstantiator,
    validator: DescriptorValidator,
}

impl ModuleLoader {
    /// Loader with default grouping rules and pass-through bundles
    pub fn new(factory: Arc<dyn LoadingEnvironmentFactory>) -> Self {
        Self {
            resolver: Arc::new(PassthroughBundleResolver),
            factory,
            builder: IsolationGroupBuilder::new(),
            instantiator: EntryPointInstantiator::new(),
            validator: DescriptorValidator::new(),
        }
    }

    /// Loader over a symbol registry, configured from `config`
    ///
    /// The registry's host exports are replaced by the configured ones.
    pub fn from_config(config: &LoaderConfig, registry: SymbolRegistry) -> Result<Self, ModuleError> {
        config.validate()?;
        let registry = registry.with_host_exports(config.host_exports.clone());
        Ok(Self {
            resolver: Arc::new(PassthroughBundleResolver),
            factory: Arc::new(RegistryEnvironmentFactory::new(registry)),
            builder: IsolationGroupBuilder::from_config(config)?,
            instantiator: EntryPointInstantiator::with_host_abi_version(config.host_abi_version),
            validator: DescriptorValidator::new(),
        })
    }

    pub fn with_bundle_resolver(mut self, resolver: Arc<dyn BundleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_group_builder(mut self, builder: IsolationGroupBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_instantiator(mut self, instantiator: EntryPointInstantiator) -> Self {
        self.instantiator = instantiator;
        self
    }

    pub fn group_builder(&self) -> &IsolationGroupBuilder {
        &self.builder
    }

    /// Validate descriptors, resolve bundles and define groups
    ///
    /// Nothing is instantiated; used to inspect the layout before loading.
    pub fn plan(&self, descriptors: &DescriptorSet) -> Result<Vec<IsolationGroup>, ModuleError> {
        for descriptor in descriptors {
            self.validator
                .validate(descriptor)
                .into_result(&descriptor.key)?;
        }

        let bundles = self.resolve_bundles(descriptors)?;
        self.builder.build_with_bundles(descriptors, &bundles)
    }

    /// Load every module of the set
    ///
    /// On failure no instance is returned and every context created so far
    /// is closed.
    pub fn load(&self, descriptors: &DescriptorSet) -> Result<LoadedModules, ModuleError> {
        info!("Loading {} modules", descriptors.len());
        let groups = self.plan(descriptors)?;

        let outcomes = self.load_groups(&groups);

        let mut contexts = BTreeMap::new();
        let mut instances = BTreeMap::new();
        let mut failure = None;
        for (group, outcome) in groups.iter().zip(outcomes) {
            match outcome {
                Ok((context, group_instances)) if failure.is_none() => {
                    contexts.insert(group.base_key().to_string(), context);
                    for (key, instance) in group_instances {
                        if instances.insert(key.clone(), instance).is_some() {
                            failure = Some(ModuleError::DuplicateModuleKey(key));
                        }
                    }
                }
                Ok((context, group_instances)) => {
                    drop(group_instances);
                    close_quietly(context.as_ref());
                }
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = failure {
            drop(instances);
            for context in contexts.values() {
                close_quietly(context.as_ref());
            }
            return Err(e);
        }

        info!(
            "Loaded {} modules in {} isolation groups",
            instances.len(),
            groups.len()
        );
        Ok(LoadedModules {
            groups,
            contexts,
            instances,
        })
    }

    /// Release a load result
    ///
    /// Instances are dropped before their contexts are closed. Close
    /// failures are logged, not propagated.
    pub fn unload(&self, loaded: LoadedModules) {
        let LoadedModules {
            groups,
            contexts,
            instances,
        } = loaded;

        let dropped = instances.len();
        drop(instances);
        debug!("Dropped {} module instances", dropped);

        for (base_key, context) in &contexts {
            if let Err(e) = context.close() {
                warn!("Failed to close loading context of group {}: {}", base_key, e);
            }
        }
        info!("Unloaded {} isolation groups", groups.len());
    }

    fn resolve_bundles(
        &self,
        descriptors: &DescriptorSet,
    ) -> Result<BTreeMap<String, ExplodedBundle>, ModuleError> {
        let mut bundles = BTreeMap::new();
        for descriptor in descriptors {
            let bundle = self.resolver.resolve(descriptor)?;
            if bundle.key != descriptor.key {
                return Err(ModuleError::BundleResolution {
                    key: descriptor.key.clone(),
                    reason: format!("resolver returned bundle of module {}", bundle.key),
                });
            }
            bundles.insert(descriptor.key.clone(), bundle);
        }
        debug!("Resolved {} bundles", bundles.len());
        Ok(bundles)
    }

    fn load_group(&self, group: &IsolationGroup) -> GroupOutcome {
        let context = self.factory.create(group).map_err(|e| match e {
            e @ ModuleError::ContextCreation { .. } => e,
            other => ModuleError::ContextCreation {
                base_key: group.base_key().to_string(),
                reason: other.to_string(),
            },
        })?;

        match self
            .instantiator
            .instantiate(context.as_ref(), group.entry_classes())
        {
            Ok(instances) => Ok((context, instances)),
            Err(e) => {
                close_quietly(context.as_ref());
                Err(e)
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn load_groups(&self, groups: &[IsolationGroup]) -> Vec<GroupOutcome> {
        let mut outcomes = Vec::with_capacity(groups.len());
        for group in groups {
            let outcome = self.load_group(group);
            let failed = outcome.is_err();
            outcomes.push(outcome);
            if failed {
                break;
            }
        }
        outcomes
    }

    #[cfg(feature = "parallel")]
    fn load_groups(&self, groups: &[IsolationGroup]) -> Vec<GroupOutcome> {
        groups.par_iter().map(|group| self.load_group(group)).collect()
    }
}

fn close_quietly(context: &dyn LoadingContext) {
    if let Err(e) = context.close() {
        warn!(
            "Failed to close loading context of group {}: {}",
            context.group_key(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::isolation::context::SymbolSource;
    use crate::module::isolation::symbols::{EntrySymbol, SymbolTable};
    use crate::module::registry::descriptor::ModuleDescriptor;
    use crate::module::traits::{InstantiationCause, Module, ModuleContext};
    use std::any::Any;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Foo;
    #[derive(Default)]
    struct FooExtension;

    impl Module for Foo {
        fn define(&self, _context: &mut ModuleContext) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Module for FooExtension {
        fn define(&self, _context: &mut ModuleContext) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry() -> SymbolRegistry {
        let mut registry = SymbolRegistry::new();
        registry
            .register_artifact(
                "/p/foo.jar",
                SymbolTable::new().with(EntrySymbol::module::<Foo>("org.foo.FooPlugin")),
            )
            .register_artifact(
                "/p/foo-ext.jar",
                SymbolTable::new()
                    .with(EntrySymbol::module::<FooExtension>("org.foo.FooExtension")),
            );
        registry
    }

    fn loader() -> ModuleLoader {
        ModuleLoader::new(Arc::new(RegistryEnvironmentFactory::new(registry())))
    }

    fn descriptors() -> DescriptorSet {
        DescriptorSet::from_descriptors(vec![
            ModuleDescriptor::new("foo", "/p/foo.jar", "org.foo.FooPlugin"),
            ModuleDescriptor::new("fooExtension", "/p/foo-ext.jar", "org.foo.FooExtension")
                .with_base_module("foo"),
        ])
        .unwrap()
    }

    #[test]
    fn test_load_shares_context_within_group() {
        let loaded = loader().load(&descriptors()).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.groups().len(), 1);
        assert!(loaded.get("foo").unwrap().as_any().is::<Foo>());
        assert!(loaded
            .get("fooExtension")
            .unwrap()
            .as_any()
            .is::<FooExtension>());
        assert_eq!(loaded.group_of("fooExtension").unwrap().base_key(), "foo");
        assert!(loaded.context("foo").is_some());
        assert!(loaded.context("fooExtension").is_none());
    }

    #[test]
    fn test_load_is_all_or_nothing() {
        let descriptors = DescriptorSet::from_descriptors(vec![
            ModuleDescriptor::new("foo", "/p/foo.jar", "org.foo.FooPlugin"),
            ModuleDescriptor::new("bar", "/p/bar.jar", "org.bar.BarPlugin"),
        ])
        .unwrap();

        let err = loader().load(&descriptors).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Fail to instantiate class [org.bar.BarPlugin] of plugin [bar]"
        );
    }

    #[test]
    fn test_plan_rejects_empty_artifact() {
        let descriptors = DescriptorSet::from_descriptors(vec![ModuleDescriptor::new(
            "foo",
            "",
            "org.foo.FooPlugin",
        )])
        .unwrap();
        let result = loader().plan(&descriptors);
        assert!(matches!(result, Err(ModuleError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_unresolvable_entry_class_reports_instantiation_failure() {
        let descriptors = DescriptorSet::from_descriptors(vec![
            ModuleDescriptor::new("org.sonar.foo", "/p/foo.jar", "org.foo.Foo-Plugin"),
        ])
        .unwrap();
        let err = loader().load(&descriptors).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Fail to instantiate class [org.foo.Foo-Plugin] of plugin [org.sonar.foo]"
        );

        let empty = DescriptorSet::from_descriptors(vec![ModuleDescriptor::new(
            "foo",
            "/p/foo.jar",
            "",
        )])
        .unwrap();
        assert!(matches!(
            loader().load(&empty),
            Err(ModuleError::Instantiation {
                cause: InstantiationCause::SymbolNotFound { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_self_referencing_base_is_missing_base() {
        let descriptors = DescriptorSet::from_descriptors(vec![
            ModuleDescriptor::new("foo", "/p/foo.jar", "org.foo.FooPlugin").with_base_module("foo"),
        ])
        .unwrap();
        assert!(matches!(
            loader().plan(&descriptors),
            Err(ModuleError::MissingBaseModule { ref key, ref base_key })
                if key == "foo" && base_key == "foo"
        ));
    }

    /// Records context closes and instance drops in one shared log
    type EventLog = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        key: &'static str,
        log: EventLog,
    }

    impl Module for Recorder {
        fn define(&self, _context: &mut ModuleContext) {}
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Drop for Recorder {
        fn drop(&mut self) {
            self.log.lock().unwrap().push(format!("drop:{}", self.key));
        }
    }

    struct RecordingContext {
        inner: Box<dyn LoadingContext>,
        log: EventLog,
    }

    impl LoadingContext for RecordingContext {
        fn group_key(&self) -> &str {
            self.inner.group_key()
        }

        fn precedence(&self) -> &[SymbolSource] {
            self.inner.precedence()
        }

        fn resolve(&self, name: &str) -> Option<EntrySymbol> {
            self.inner.resolve(name)
        }

        fn is_exported(&self, resource: &str) -> bool {
            self.inner.is_exported(resource)
        }

        fn close(&self) -> Result<(), ModuleError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("close:{}", self.inner.group_key()));
            self.inner.close()
        }
    }

    struct RecordingFactory {
        inner: RegistryEnvironmentFactory,
        created: Mutex<Vec<String>>,
        log: EventLog,
    }

    impl LoadingEnvironmentFactory for RecordingFactory {
        fn create(&self, group: &IsolationGroup) -> Result<Box<dyn LoadingContext>, ModuleError> {
            let inner = self.inner.create(group)?;
            self.created
                .lock()
                .unwrap()
                .push(group.base_key().to_string());
            Ok(Box::new(RecordingContext {
                inner,
                log: Arc::clone(&self.log),
            }))
        }
    }

    fn recording_symbol(key: &'static str, log: &EventLog) -> SymbolTable {
        let log = Arc::clone(log);
        SymbolTable::new().with(EntrySymbol::module_with(
            format!("org.{}.Plugin", key),
            move || {
                Ok(Recorder {
                    key,
                    log: Arc::clone(&log),
                })
            },
        ))
    }

    #[test]
    fn test_failed_load_reports_first_group_and_closes_contexts() {
        let log: EventLog = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SymbolRegistry::new();
        registry
            .register_artifact("/p/a.jar", recording_symbol("a", &log))
            .register_artifact("/p/d.jar", recording_symbol("d", &log));
        let factory = Arc::new(RecordingFactory {
            inner: RegistryEnvironmentFactory::new(registry),
            created: Mutex::new(Vec::new()),
            log: Arc::clone(&log),
        });
        let loader = ModuleLoader::new(factory.clone());

        // b and c provide no entry symbols
        let descriptors = DescriptorSet::from_descriptors(
            ["a", "b", "c", "d"]
                .iter()
                .map(|k| ModuleDescriptor::new(*k, format!("/p/{}.jar", k), format!("org.{}.Plugin", k))),
        )
        .unwrap();

        let err = loader.load(&descriptors).unwrap_err();
        assert!(matches!(err, ModuleError::Instantiation { ref key, .. } if key == "b"));

        let created = factory.created.lock().unwrap().clone();
        assert!(created.contains(&"a".to_string()));
        assert!(created.contains(&"b".to_string()));

        let events = log.lock().unwrap().clone();
        let position = |event: String| events.iter().position(|e| *e == event);
        for key in &created {
            let closed = position(format!("close:{}", key));
            assert!(closed.is_some(), "context {} left open: {:?}", key, events);
            if let Some(dropped) = position(format!("drop:{}", key)) {
                assert!(dropped < closed.unwrap(), "{} closed before drop: {:?}", key, events);
            }
        }
        assert!(position("drop:a".to_string()).is_some());
    }

    #[test]
    fn test_unload_closes_contexts() {
        let loader = loader();
        let mut loaded = loader.load(&descriptors()).unwrap();
        let instances = loaded.take_instances();
        assert_eq!(instances.len(), 2);
        assert!(loaded.is_empty());
        drop(instances);
        loader.unload(loaded);
    }

    #[test]
    fn test_from_config_applies_host_exports() {
        let mut config = LoaderConfig::default();
        config.host_exports = vec!["host.api.".to_string()];
        let registry = registry().with_host_symbols(
            SymbolTable::new().with(EntrySymbol::module::<Foo>("host.internal.Core")),
            Vec::new(),
        );
        let loader = ModuleLoader::from_config(&config, registry).unwrap();

        let descriptors = DescriptorSet::from_descriptors(vec![ModuleDescriptor::new(
            "core",
            "/p/core.jar",
            "host.internal.Core",
        )])
        .unwrap();
        assert!(loader.load(&descriptors).is_err());
    }
}
