//! Module bundles
//!
//! Resolves a descriptor into the physical files its loading context needs.

pub mod resolver;

pub use resolver::{BundleResolver, DirectoryBundleResolver, ExplodedBundle, PassthroughBundleResolver};
