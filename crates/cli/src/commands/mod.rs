//! Command implementations.

mod batch;
mod info;
mod init;
mod send;
mod validate;

pub use batch::run_batch;
pub use info::run_info;
pub use init::run_init;
pub use send::run_send;
pub use validate::run_validate;

use std::path::Path;

use contracts::DispatchBlueprint;
use tracing::{info, warn};

use crate::cli::DispatchArgs;
use crate::error::{CliError, Result};

/// Load a blueprint from `path`, or the built-in demo providers when absent
pub(crate) fn load_blueprint(path: Option<&Path>) -> Result<DispatchBlueprint> {
    let Some(path) = path else {
        info!("No configuration file given, using built-in providers");
        return Ok(DispatchBlueprint::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    config_loader::ConfigLoader::load_from_path(path)
        .map_err(|e| CliError::config_load(path.display().to_string(), e))
}

/// Load the blueprint named by `args` and apply command-line overrides
pub(crate) fn prepare_blueprint(args: &DispatchArgs) -> Result<DispatchBlueprint> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;

    if let Some(max_retries) = args.max_retries {
        info!(max_retries, "Overriding max_retries from CLI");
        blueprint.dispatcher.max_retries = max_retries;
    }
    if let Some(rate_limit) = args.rate_limit {
        info!(rate_limit, "Overriding rate_limit from CLI");
        blueprint.dispatcher.rate_limit = rate_limit;
    }

    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        backends = blueprint.backends.len(),
        max_retries = blueprint.dispatcher.max_retries,
        rate_limit = blueprint.dispatcher.rate_limit,
        rate_window_ms = blueprint.dispatcher.rate_window_ms,
        "Configuration loaded"
    );

    Ok(blueprint)
}

/// Start the Prometheus exporter when a port is given
pub(crate) fn start_metrics(port: u16) -> Result<()> {
    if port == 0 {
        return Ok(());
    }
    observability::init_metrics(port).map_err(|e| CliError::metrics(format!("{:#}", e)))
}

/// Resolve on Ctrl+C or SIGTERM
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
