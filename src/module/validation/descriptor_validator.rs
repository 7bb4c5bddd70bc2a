//! Descriptor validation
//!
//! Validates module descriptors for structure before they are grouped.

use tracing::{debug, warn};

use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::ModuleError;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Descriptor is valid
    Valid,
    /// Descriptor is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    /// Convert into a `Result`, naming the module in the error
    pub fn into_result(self, key: &str) -> Result<(), ModuleError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(errors) => Err(ModuleError::InvalidDescriptor(format!(
                "module [{}]: {}",
                key,
                errors.join("; ")
            ))),
        }
    }
}

/// Descriptor validator
///
/// Only structural emptiness is checked. Keys are opaque unique strings,
/// entry classes are checked when they are resolved, and base keys when
/// groups are defined.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorValidator;

impl DescriptorValidator {
    /// Create a new descriptor validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a module descriptor
    pub fn validate(&self, descriptor: &ModuleDescriptor) -> ValidationResult {
        let mut errors = Vec::new();

        if descriptor.key.trim().is_empty() {
            errors.push("Module key cannot be empty".to_string());
        }

        if descriptor.artifact.as_os_str().is_empty() {
            errors.push("Artifact location cannot be empty".to_string());
        }

        if errors.is_empty() {
            debug!("Descriptor validation passed for module: {}", descriptor.key);
            ValidationResult::Valid
        } else {
            warn!(
                "Descriptor validation failed for module {}: {:?}",
                descriptor.key, errors
            );
            ValidationResult::Invalid(errors)
        }
    }
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new()
    }
}
