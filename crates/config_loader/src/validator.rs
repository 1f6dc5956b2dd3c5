//! Configuration validation
//!
//! Rules:
//! - at least one backend
//! - backend names non-empty and unique
//! - max_retries, rate_limit, rate_window_ms >= 1
//! - max_delay_ms (if set) >= base_delay_ms
//! - backend params parse for their backend type

use std::collections::HashSet;

use contracts::{BackendConfig, BackendType, ContractError, DispatchBlueprint};

const SCRIPTED_MODES: &[&str] = &["succeed", "fail", "fail_then_succeed"];

/// Validate a DispatchBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    validate_dispatcher(blueprint)?;
    validate_backend_names(blueprint)?;
    validate_backend_params(blueprint)?;
    Ok(())
}

fn validate_dispatcher(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let settings = &blueprint.dispatcher;

    if settings.max_retries == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.max_retries",
            "max_retries must be >= 1",
        ));
    }
    if settings.rate_limit == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.rate_limit",
            "rate_limit must be >= 1",
        ));
    }
    if settings.rate_window_ms == 0 {
        return Err(ContractError::config_validation(
            "dispatcher.rate_window_ms",
            "rate_window_ms must be >= 1",
        ));
    }
    if let Some(max_delay_ms) = settings.max_delay_ms {
        if max_delay_ms < settings.base_delay_ms {
            return Err(ContractError::config_validation(
                "dispatcher.max_delay_ms",
                format!(
                    "max_delay_ms ({}) must be >= base_delay_ms ({})",
                    max_delay_ms, settings.base_delay_ms
                ),
            ));
        }
    }
    Ok(())
}

/// Backend names must be present, non-empty and unique
fn validate_backend_names(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    if blueprint.backends.is_empty() {
        return Err(ContractError::config_validation(
            "backends",
            "at least one backend is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, backend) in blueprint.backends.iter().enumerate() {
        if backend.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("backends[{}].name", idx),
                "backend name cannot be empty",
            ));
        }
        if !seen.insert(&backend.name) {
            return Err(ContractError::config_validation(
                format!("backends[name={}]", backend.name),
                "duplicate backend name",
            ));
        }
    }
    Ok(())
}

fn validate_backend_params(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    for backend in &blueprint.backends {
        match backend.backend_type {
            BackendType::Simulated => validate_simulated(backend)?,
            BackendType::Scripted => validate_scripted(backend)?,
            BackendType::Log => {}
        }
    }
    Ok(())
}

fn validate_simulated(backend: &BackendConfig) -> Result<(), ContractError> {
    if let Some(rate) = backend.param::<f64>("success_rate")? {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ContractError::config_validation(
                format!("backends[{}].params.success_rate", backend.name),
                format!("success_rate must be within [0, 1], got {}", rate),
            ));
        }
    }
    backend.param::<u64>("latency_ms")?;
    Ok(())
}

fn validate_scripted(backend: &BackendConfig) -> Result<(), ContractError> {
    if let Some(mode) = backend.params.get("mode") {
        check_scripted_mode(&backend.name, mode)?;
    }
    backend.param::<u32>("failures")?;
    backend.param::<u64>("latency_ms")?;
    Ok(())
}

/// Accepts a bare mode or `fail_then_succeed:<n>` with an inline failure count
fn check_scripted_mode(name: &str, mode: &str) -> Result<(), ContractError> {
    let field = || format!("backends[{}].params.mode", name);
    let (base, count) = match mode.split_once(':') {
        Some((base, count)) => (base, Some(count)),
        None => (mode, None),
    };

    if !SCRIPTED_MODES.contains(&base) {
        return Err(ContractError::config_validation(
            field(),
            format!("unknown mode '{}', expected one of {:?}", mode, SCRIPTED_MODES),
        ));
    }
    match count {
        None => Ok(()),
        Some(n) if base == "fail_then_succeed" => n.parse::<u32>().map(drop).map_err(|e| {
            ContractError::config_validation(
                field(),
                format!("invalid failure count '{}': {}", n, e),
            )
        }),
        Some(_) => Err(ContractError::config_validation(
            field(),
            format!("mode '{}' takes no failure count", base),
        )),
    }
}
