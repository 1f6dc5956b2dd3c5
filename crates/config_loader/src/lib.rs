//! # Config Loader
//!
//! Loads a [`DispatchBlueprint`] from TOML or JSON and checks it before any
//! dispatcher is built from it.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("dispatch.toml")).unwrap();
//! println!("Backends: {}", blueprint.backends.len());
//! ```

mod parser;
mod validator;

pub use contracts::DispatchBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a config file; format comes from the extension
    pub fn load_from_path(path: &Path) -> Result<DispatchBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate config content
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Validate an already-built blueprint (e.g. after CLI overrides)
    pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Validate and write `blueprint` to `path` in the format of its extension
    pub fn save_to_path(blueprint: &DispatchBlueprint, path: &Path) -> Result<(), ContractError> {
        validator::validate(blueprint)?;
        let rendered = ConfigFormat::from_path(path)?.render(blueprint)?;
        std::fs::write(path, rendered)?;
        Ok(())
    }

    pub fn to_toml(blueprint: &DispatchBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.render(blueprint)
    }

    pub fn to_json(blueprint: &DispatchBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.render(blueprint)
    }
}
