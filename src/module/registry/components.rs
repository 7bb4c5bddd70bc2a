//! Host component registry
//!
//! Receives the instances produced by the loader. Lookups of unknown
//! components fail here, not in the loader.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::module::traits::{Module, ModuleContext, ModuleError, ModuleInstance};
use crate::module::version::HostVersion;

/// Module instances registered with the host, by module key
#[derive(Default)]
pub struct ComponentRegistry {
    components: BTreeMap<String, ModuleInstance>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every instance of a load result
    ///
    /// Fails on a key that is already registered; nothing is registered in
    /// that case.
    pub fn register_all(
        &mut self,
        instances: BTreeMap<String, ModuleInstance>,
    ) -> Result<(), ModuleError> {
        if let Some(key) = instances.keys().find(|k| self.components.contains_key(*k)) {
            return Err(ModuleError::DuplicateModuleKey(key.clone()));
        }
        let count = instances.len();
        self.components.extend(instances);
        info!("Registered {} module components", count);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&dyn Module> {
        self.components.get(key).map(|component| component.as_ref())
    }

    /// Component of a module, failing if it was never registered
    pub fn require(&self, key: &str) -> Result<&dyn Module, ModuleError> {
        self.get(key)
            .ok_or_else(|| ModuleError::ComponentNotFound(key.to_string()))
    }

    /// Concrete component of a module
    pub fn get_as<T: 'static>(&self, key: &str) -> Option<&T> {
        self.get(key)?.as_any().downcast_ref::<T>()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.components.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Run every component's `define` hook
    ///
    /// Returns the extensions each module declared, by module key.
    /// `settings` holds per-module configuration; missing entries mean an
    /// empty configuration.
    pub fn define_all(
        &self,
        host_version: &HostVersion,
        settings: &BTreeMap<String, HashMap<String, String>>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut declared = BTreeMap::new();
        for (key, component) in &self.components {
            let config = settings.get(key).cloned().unwrap_or_default();
            let mut context = ModuleContext::new(key.clone(), host_version.clone(), config);
            component.define(&mut context);
            debug!(
                "Module {} declared {} extensions",
                key,
                context.extensions().len()
            );
            declared.insert(key.clone(), context.extensions().to_vec());
        }
        declared
    }

    /// Drop every component
    pub fn clear(&mut self) {
        self.components.clear();
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.components.keys()).finish()
    }
}
