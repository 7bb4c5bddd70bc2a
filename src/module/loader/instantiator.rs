//! Entry point instantiation
//!
//! Builds exactly one instance per member of a group inside the group's
//! loading context. Any failure aborts the whole group: no partially
//! populated map is ever returned.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

use crate::module::isolation::context::LoadingContext;
use crate::module::isolation::symbols::HOST_ABI_VERSION;
use crate::module::traits::{InstantiationCause, ModuleError, ModuleInstance};

/// Instantiates module entry points
#[derive(Debug, Clone)]
pub struct EntryPointInstantiator {
    host_abi_version: u32,
}

impl EntryPointInstantiator {
    pub fn new() -> Self {
        Self::with_host_abi_version(HOST_ABI_VERSION)
    }

    pub fn with_host_abi_version(host_abi_version: u32) -> Self {
        Self { host_abi_version }
    }

    /// Instantiate every member of a group
    ///
    /// `entry_classes` maps member keys to entry class names. Stops at the
    /// first failure, in key order.
    pub fn instantiate(
        &self,
        context: &dyn LoadingContext,
        entry_classes: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, ModuleInstance>, ModuleError> {
        let mut instances = BTreeMap::new();
        for (key, class) in entry_classes {
            let instance = self.instantiate_one(context, key, class).map_err(|e| {
                error!("{} (group {}): {:?}", e, context.group_key(), e);
                e
            })?;
            instances.insert(key.clone(), instance);
        }
        debug!(
            "Instantiated {} entry points in group {}",
            instances.len(),
            context.group_key()
        );
        Ok(instances)
    }

    /// Instantiate the entry point of a single module
    pub fn instantiate_one(
        &self,
        context: &dyn LoadingContext,
        key: &str,
        class: &str,
    ) -> Result<ModuleInstance, ModuleError> {
        let fail = |cause: InstantiationCause| ModuleError::Instantiation {
            class: class.to_string(),
            key: key.to_string(),
            cause,
        };

        let symbol = context.resolve(class).ok_or_else(|| {
            fail(InstantiationCause::SymbolNotFound {
                group: context.group_key().to_string(),
            })
        })?;

        if symbol.abi_version() != self.host_abi_version {
            return Err(ModuleError::UnsupportedAbi {
                key: key.to_string(),
                host_abi: self.host_abi_version,
                module_abi: symbol.abi_version(),
            });
        }

        let constructor = symbol
            .constructor()
            .ok_or_else(|| fail(InstantiationCause::NoDefaultConstructor))?;

        let erased = match panic::catch_unwind(AssertUnwindSafe(|| constructor())) {
            Ok(Ok(erased)) => erased,
            Ok(Err(reason)) => return Err(fail(InstantiationCause::ConstructorFailed(reason))),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                return Err(fail(InstantiationCause::ConstructorFailed(format!(
                    "panicked: {}",
                    reason
                ))));
            }
        };

        let instance = erased.downcast::<ModuleInstance>().map_err(|_| {
            fail(InstantiationCause::ContractMismatch {
                type_name: symbol.type_name().to_string(),
            })
        })?;

        debug!("Instantiated {} for module {}", class, key);
        Ok(*instance)
    }
}

impl Default for EntryPointInstantiator {
    fn default() -> Self {
        Self::new()
    }
}
