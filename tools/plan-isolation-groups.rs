//! Print the isolation group plan of a module catalog
//!
//! Reads a catalog of `[[module]]` descriptors, resolves bundles and defines
//! isolation groups without instantiating anything.
//!
//! Usage:
//!   plan-isolation-groups <catalog.toml> [--config loader.toml] [--json] [--passthrough]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use module_isolation::config::LoaderConfig;
use module_isolation::module::{
    DirectoryBundleResolver, IsolationGroup, ModuleCatalog, ModuleLoader,
    PassthroughBundleResolver, SymbolRegistry,
};
use module_isolation::utils::init_logging_from_config;

#[derive(Parser, Debug)]
#[command(about = "Print the isolation groups a module catalog resolves to")]
struct Args {
    /// Module catalog (TOML list of [[module]] descriptors)
    catalog: PathBuf,

    /// Loader configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,

    /// Use declared artifacts as-is instead of reading bundles from disk
    #[arg(long)]
    passthrough: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if args.debug {
        config.logging.filter = Some("debug".to_string());
    }
    init_logging_from_config(Some(&config.logging));

    let descriptors = ModuleCatalog::from_file(&args.catalog)?.into_descriptor_set()?;
    info!(
        "Read {} descriptors from {}",
        descriptors.len(),
        args.catalog.display()
    );

    let loader = ModuleLoader::from_config(&config, SymbolRegistry::new())?;
    let loader = if args.passthrough {
        loader.with_bundle_resolver(Arc::new(PassthroughBundleResolver))
    } else {
        loader.with_bundle_resolver(Arc::new(DirectoryBundleResolver::new()))
    };

    let groups = loader.plan(&descriptors)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        for group in &groups {
            print_group(group);
        }
    }
    Ok(())
}

fn print_group(group: &IsolationGroup) {
    println!("group {}", group.base_key());
    println!(
        "  strategy: {}",
        if group.is_self_first() {
            "self-first"
        } else {
            "parent-first"
        }
    );
    println!("  compatibility mode: {}", group.is_compatibility_mode());
    println!("  members:");
    for (key, class) in group.entry_classes() {
        println!("    {} -> {}", key, class);
    }
    println!("  files:");
    for file in group.files() {
        println!("    {}", file.display());
    }
    println!("  exports:");
    for prefix in group.export_mask() {
        println!("    {}", prefix);
    }
}
