//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BackendType, DispatchBlueprint};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    backend_count: usize,
    max_retries: u32,
    attempt_budget: u64,
    rate_limit: usize,
    rate_window_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let settings = &blueprint.dispatcher;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    backend_count: blueprint.backends.len(),
                    max_retries: settings.max_retries,
                    attempt_budget: u64::from(settings.max_retries)
                        * blueprint.backends.len() as u64,
                    rate_limit: settings.rate_limit,
                    rate_window_ms: settings.rate_window_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DispatchBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let settings = &blueprint.dispatcher;

    if blueprint.backends.len() == 1 {
        warnings.push("Only one backend configured - failures cannot fail over".to_string());
    }

    // Attempts within one send can outrun the window and be denied
    let budget = (settings.max_retries as usize).saturating_mul(blueprint.backends.len());
    if budget > settings.rate_limit {
        warnings.push(format!(
            "Attempt budget ({}) exceeds rate_limit ({}) - a single send may be rate limited",
            budget, settings.rate_limit
        ));
    }

    for backend in &blueprint.backends {
        match backend.backend_type {
            BackendType::Simulated => {
                if backend.param_or("success_rate", 1.0_f64).unwrap_or(1.0) == 0.0 {
                    warnings.push(format!(
                        "Backend '{}' has success_rate 0 and will never deliver",
                        backend.name
                    ));
                }
            }
            BackendType::Scripted => {
                if backend.params.get("mode").map(|m| m.trim()) == Some("fail") {
                    warnings.push(format!(
                        "Backend '{}' is scripted to always fail",
                        backend.name
                    ));
                }
            }
            BackendType::Log => {}
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Backends: {}", summary.backend_count);
            println!("  Max retries per backend: {}", summary.max_retries);
            println!("  Attempt budget per send: {}", summary.attempt_budget);
            println!(
                "  Rate limit: {} per {} ms",
                summary.rate_limit, summary.rate_window_ms
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
