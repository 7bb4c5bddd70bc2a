//! Module validation
//!
//! Checks descriptors before any group is defined.

pub mod descriptor_validator;

pub use descriptor_validator::{DescriptorValidator, ValidationResult};
