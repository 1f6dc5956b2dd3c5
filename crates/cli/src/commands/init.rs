//! `init` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use config_loader::ConfigLoader;
use contracts::DispatchBlueprint;

use crate::cli::InitArgs;

/// Execute the `init` command
pub fn run_init(args: &InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        );
    }

    ConfigLoader::save_to_path(&DispatchBlueprint::default(), &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(path = %args.output.display(), "Configuration written");
    println!("✓ Wrote starter configuration: {}", args.output.display());
    Ok(())
}
