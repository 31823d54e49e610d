//! Migration Composer - Main entry point
//!
//! Loads a deployment context file, validates it, and either prints the
//! effective configuration, the unit plan, or a dry-run composition.

use anyhow::{Context, Result};
use std::fs;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use migration_composer::cli::{Cli, Commands, ContextArgs};
use migration_composer::engine::DryRunProvisioner;
use migration_composer::{RawConfig, pipeline};

/// Initialize tracing on stderr; `RUST_LOG` overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(context: &ContextArgs) -> Result<RawConfig> {
    RawConfig::load_from_file(&context.file, context.context_id.as_deref())
        .with_context(|| format!("Failed to load context file {}", context.file.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Validate { context } => {
            info!(file = %context.file.display(), "validating context");
            let raw = load(&context)?;
            let config = pipeline::effective_config(&raw).context("Context validation failed")?;
            if cli.json {
                print_json(&config)?;
            } else {
                println!("✓ Context is valid ({} options set)", raw.len());
                println!("  stage: {}", config.stage);
                println!("  deploy id: {}", config.default_deploy_id);
                println!("  engine: {}", config.engine_version);
                println!("  domain: {}", config.domain_name);
            }
        }
        Commands::Plan { context } => {
            let raw = load(&context)?;
            let plan = pipeline::plan(&raw).context("Planning failed")?;
            if cli.json {
                print_json(&plan)?;
            } else {
                println!("Units to build ({}):", plan.enabled.len());
                for (i, unit) in plan.enabled.iter().enumerate() {
                    println!("  {}. {unit}", i + 1);
                }
                for (unit, prerequisite) in plan.enabled.cascaded() {
                    println!("  - {unit} skipped: requires {prerequisite}");
                }
            }
        }
        Commands::Compose { context, output } => {
            let raw = load(&context)?;
            let plan = pipeline::plan(&raw).context("Planning failed")?;
            let mut provisioner = DryRunProvisioner::new();
            let composition = plan
                .compose(&mut provisioner)
                .context("Composition failed")?;

            if let Some(path) = output {
                let text = serde_json::to_string_pretty(&composition)?;
                fs::write(&path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!(path = %path.display(), "composition written");
            }

            if cli.json {
                print_json(&composition)?;
            } else {
                for unit in &composition.units {
                    println!("✓ {} ({})", unit.unit, unit.stack_name);
                }
                for (path, value) in composition.parameter_paths(&plan.config) {
                    println!("  {path} = {value}");
                }
            }
        }
    }

    Ok(())
}
