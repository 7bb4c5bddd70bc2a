//! Shared fixtures for module loading tests

#![allow(dead_code)]

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use module_isolation::module::{
    DescriptorSet, EntrySymbol, Module, ModuleContext, ModuleDescriptor, ModuleLoader,
    RegistryEnvironmentFactory, SymbolRegistry, SymbolTable,
};
use module_isolation::HostVersion;

/// Module with a default constructor
#[derive(Default)]
pub struct FakeModule;

impl Module for FakeModule {
    fn define(&self, context: &mut ModuleContext) {
        context.add_extension("FakeSensor");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Module that can only be built with an argument
pub struct IncorrectModule {
    pub name: String,
}

impl IncorrectModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Module for IncorrectModule {
    fn define(&self, _context: &mut ModuleContext) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Extension module contributing to its base's group
#[derive(Default)]
pub struct ExtensionModule;

impl Module for ExtensionModule {
    fn define(&self, context: &mut ModuleContext) {
        let name = context.get_config_or("extension.name", "ExtensionSensor");
        context.add_extension(name);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub const FAKE_ENTRY: &str = "org.fake.FakePlugin";
pub const INCORRECT_ENTRY: &str = "org.fake.IncorrectPlugin";
pub const EXTENSION_ENTRY: &str = "org.foo.ExtensionPlugin";

/// Artifact location of a module inside a plugins directory
pub fn artifact(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.jar", key))
}

/// Registry where `fake` provides [`FakeModule`] and `incorrect` provides
/// [`IncorrectModule`], both under `dir`
pub fn registry(dir: &Path) -> SymbolRegistry {
    let mut registry = SymbolRegistry::new();
    registry
        .register_artifact(
            artifact(dir, "fake"),
            SymbolTable::new().with(EntrySymbol::module::<FakeModule>(FAKE_ENTRY)),
        )
        .register_artifact(
            artifact(dir, "incorrect"),
            SymbolTable::new().with(EntrySymbol::without_default_constructor::<IncorrectModule>(
                INCORRECT_ENTRY,
            )),
        );
    for key in ["fooExtension1", "fooExtension2"] {
        registry.register_artifact(
            artifact(dir, key),
            SymbolTable::new().with(EntrySymbol::module::<ExtensionModule>(EXTENSION_ENTRY)),
        );
    }
    registry
}

pub fn loader(dir: &Path) -> ModuleLoader {
    ModuleLoader::new(Arc::new(RegistryEnvironmentFactory::new(registry(dir))))
}

pub fn descriptor(dir: &Path, key: &str, entry_class: &str) -> ModuleDescriptor {
    ModuleDescriptor::new(key, artifact(dir, key), entry_class)
}

pub fn version(text: &str) -> HostVersion {
    HostVersion::parse(text).unwrap()
}

pub fn descriptor_set(descriptors: Vec<ModuleDescriptor>) -> DescriptorSet {
    DescriptorSet::from_descriptors(descriptors).unwrap()
}
