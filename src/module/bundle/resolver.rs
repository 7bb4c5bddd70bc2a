//! Bundle resolution
//!
//! The loader asks a [`BundleResolver`] for every descriptor before groups
//! are built. Resolution must be deterministic: the same descriptor always
//! yields the same files in the same order.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::ModuleError;

/// Files making up one module once its artifact is unpacked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplodedBundle {
    /// Module key
    pub key: String,
    /// Primary artifact location
    pub main: PathBuf,
    /// Additional library files shipped inside the artifact
    pub libs: Vec<PathBuf>,
}

impl ExplodedBundle {
    /// Main artifact followed by its libraries
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.main.as_path()).chain(self.libs.iter().map(PathBuf::as_path))
    }
}

/// Resolves descriptors into exploded bundles
pub trait BundleResolver: Send + Sync {
    fn resolve(&self, descriptor: &ModuleDescriptor) -> Result<ExplodedBundle, ModuleError>;
}

/// Returns the declared artifact as-is, without libraries
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughBundleResolver;

impl BundleResolver for PassthroughBundleResolver {
    fn resolve(&self, descriptor: &ModuleDescriptor) -> Result<ExplodedBundle, ModuleError> {
        Ok(ExplodedBundle {
            key: descriptor.key.clone(),
            main: descriptor.artifact.clone(),
            libs: Vec::new(),
        })
    }
}

/// Resolver for artifacts that are already unpacked on disk
///
/// A directory artifact is an exploded bundle: its files under the library
/// directory (`lib` by default) are returned sorted by path. A file artifact
/// has no libraries. A missing artifact is an error.
#[derive(Debug, Clone)]
pub struct DirectoryBundleResolver {
    lib_dir: String,
}

impl DirectoryBundleResolver {
    pub fn new() -> Self {
        Self::with_lib_dir("lib")
    }

    pub fn with_lib_dir(lib_dir: impl Into<String>) -> Self {
        Self {
            lib_dir: lib_dir.into(),
        }
    }

    fn collect_libs(&self, key: &str, dir: &Path) -> Result<Vec<PathBuf>, ModuleError> {
        let lib_dir = dir.join(&self.lib_dir);
        if !lib_dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&lib_dir).map_err(|e| ModuleError::BundleResolution {
            key: key.to_string(),
            reason: format!("Failed to read {}: {}", lib_dir.display(), e),
        })?;

        let mut libs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModuleError::BundleResolution {
                key: key.to_string(),
                reason: format!("Failed to read directory entry: {}", e),
            })?;
            let path = entry.path();
            if path.is_file() {
                libs.push(path);
            }
        }
        libs.sort();
        Ok(libs)
    }
}

impl Default for DirectoryBundleResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleResolver for DirectoryBundleResolver {
    fn resolve(&self, descriptor: &ModuleDescriptor) -> Result<ExplodedBundle, ModuleError> {
        let artifact = descriptor.artifact();
        if !artifact.exists() {
            return Err(ModuleError::BundleResolution {
                key: descriptor.key.clone(),
                reason: format!("artifact {} does not exist", artifact.display()),
            });
        }

        let libs = if artifact.is_dir() {
            self.collect_libs(&descriptor.key, artifact)?
        } else {
            Vec::new()
        };

        debug!(
            "Resolved bundle of module {}: {} with {} libraries",
            descriptor.key,
            artifact.display(),
            libs.len()
        );

        Ok(ExplodedBundle {
            key: descriptor.key.clone(),
            main: artifact.to_path_buf(),
            libs,
        })
    }
}
