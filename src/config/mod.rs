//! Configuration for the module loader
//!
//! Handles configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::module::isolation::group::DEFAULT_SHARED_RESOURCE_ROOTS;
use crate::module::isolation::symbols::HOST_ABI_VERSION;
use crate::module::traits::ModuleError;
use crate::module::version::HostVersion;

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "module_isolation=debug").
    /// RUST_LOG takes precedence when set.
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Roots declaring a minimum host version below this run in
    /// compatibility mode
    #[serde(default = "default_compatibility_threshold")]
    pub compatibility_threshold: String,

    /// ABI revision entry symbols must be built for
    #[serde(default = "default_host_abi_version")]
    pub host_abi_version: u32,

    /// Resource roots whose `<root>/<key>/api/` prefixes are exported
    #[serde(default = "default_shared_resource_roots")]
    pub shared_resource_roots: Vec<String>,

    /// Prefixes of host symbols visible outside compatibility mode
    #[serde(default)]
    pub host_exports: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-module settings, by module key
    #[serde(default)]
    pub settings: BTreeMap<String, toml::Table>,
}

fn default_compatibility_threshold() -> String {
    "5.2".to_string()
}

fn default_host_abi_version() -> u32 {
    HOST_ABI_VERSION
}

fn default_shared_resource_roots() -> Vec<String> {
    DEFAULT_SHARED_RESOURCE_ROOTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            compatibility_threshold: default_compatibility_threshold(),
            host_abi_version: default_host_abi_version(),
            shared_resource_roots: default_shared_resource_roots(),
            host_exports: Vec::new(),
            logging: LoggingConfig::default(),
            settings: BTreeMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: LoaderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.threshold()?;

        if self.host_abi_version == 0 {
            return Err(anyhow::anyhow!("host_abi_version must be at least 1"));
        }

        for root in &self.shared_resource_roots {
            if root.is_empty() || root.contains('/') {
                return Err(anyhow::anyhow!(
                    "shared resource root '{}' must be a single non-empty path segment",
                    root
                ));
            }
        }

        if self.host_exports.iter().any(String::is_empty) {
            return Err(anyhow::anyhow!(
                "host_exports must not contain an empty prefix (it would export every host symbol)"
            ));
        }

        Ok(())
    }

    /// Parsed compatibility threshold
    pub fn threshold(&self) -> Result<HostVersion, ModuleError> {
        HostVersion::parse(&self.compatibility_threshold)
    }

    /// Settings of one module flattened to dotted keys
    pub fn module_settings(&self, key: &str) -> HashMap<String, String> {
        let mut result = HashMap::new();
        if let Some(table) = self.settings.get(key) {
            for (name, value) in table {
                flatten_toml_value(name.clone(), value, &mut result);
            }
        }
        result
    }

    /// Flattened settings of every configured module
    pub fn all_module_settings(&self) -> BTreeMap<String, HashMap<String, String>> {
        self.settings
            .keys()
            .map(|key| (key.clone(), self.module_settings(key)))
            .collect()
    }
}

/// Flatten a TOML value into dotted string keys
fn flatten_toml_value(prefix: String, value: &toml::Value, result: &mut HashMap<String, String>) {
    use toml::Value;

    match value {
        Value::String(s) => {
            result.insert(prefix, s.clone());
        }
        Value::Integer(i) => {
            result.insert(prefix, i.to_string());
        }
        Value::Float(f) => {
            result.insert(prefix, f.to_string());
        }
        Value::Boolean(b) => {
            result.insert(prefix, b.to_string());
        }
        Value::Array(arr) => {
            let values: Vec<String> = arr
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    _ => v.to_string(),
                })
                .collect();
            result.insert(prefix, values.join(","));
        }
        Value::Table(table) => {
            for (key, val) in table {
                flatten_toml_value(format!("{}.{}", prefix, key), val, result);
            }
        }
        Value::Datetime(dt) => {
            result.insert(prefix, dt.to_string());
        }
    }
}
