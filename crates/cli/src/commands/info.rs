//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use contracts::DispatchBlueprint;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    source: String,
    dispatcher: DispatcherInfo,
    backends: Vec<BackendInfo>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    max_retries: u32,
    attempt_budget: u64,
    rate_limit: usize,
    rate_window_ms: u64,
    base_delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_delay_ms: Option<u64>,
}

#[derive(Serialize)]
struct BackendInfo {
    name: String,
    backend_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = ?args.config, "Loading configuration info");

    let blueprint = load_blueprint(args.config.as_deref())?;
    let source = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(built-in)".to_string());

    if args.json {
        let info = build_config_info(&blueprint, source);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, &source);
    }

    Ok(())
}

fn build_config_info(blueprint: &DispatchBlueprint, source: String) -> ConfigInfo {
    let settings = &blueprint.dispatcher;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        source,
        dispatcher: DispatcherInfo {
            max_retries: settings.max_retries,
            attempt_budget: u64::from(settings.max_retries) * blueprint.backends.len() as u64,
            rate_limit: settings.rate_limit,
            rate_window_ms: settings.rate_window_ms,
            base_delay_ms: settings.base_delay_ms,
            max_delay_ms: settings.max_delay_ms,
        },
        backends: blueprint
            .backends
            .iter()
            .map(|b| BackendInfo {
                name: b.name.clone(),
                backend_type: format!("{:?}", b.backend_type),
                params: b.params.clone().into_iter().collect(),
            })
            .collect(),
    }
}

fn print_config_info(blueprint: &DispatchBlueprint, source: &str) {
    let settings = &blueprint.dispatcher;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Mail Dispatch Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📄 Source: {}", source);

    println!("\n⚙️  Dispatcher");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Max retries per backend: {}", settings.max_retries);
    println!(
        "   ├─ Rate limit: {} per {} ms",
        settings.rate_limit, settings.rate_window_ms
    );
    match settings.max_delay_ms {
        Some(max) => println!(
            "   └─ Backoff: {} ms base, doubling, capped at {} ms",
            settings.base_delay_ms, max
        ),
        None => println!("   └─ Backoff: {} ms base, doubling", settings.base_delay_ms),
    }

    println!("\n📤 Backends ({}, rotation order)", blueprint.backends.len());
    for (i, backend) in blueprint.backends.iter().enumerate() {
        let is_last = i == blueprint.backends.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({:?})", prefix, backend.name, backend.backend_type);

        let params: BTreeMap<_, _> = backend.params.iter().collect();
        for (key, value) in params {
            println!("   {}  · {} = {}", child_prefix, key, value);
        }
    }

    println!();
}
