//! Configuration formats
//!
//! TOML is the primary format; JSON is accepted for generated configs.

use std::path::Path;

use contracts::{ContractError, DispatchBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Infer format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine config format of {} (expected .toml or .json)",
                path.display()
            ))
        })?;

        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Deserialize a blueprint (no validation)
    pub fn parse(self, content: &str) -> Result<DispatchBlueprint, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| parse_error(self, e)),
            Self::Json => serde_json::from_str(content).map_err(|e| parse_error(self, e)),
        }
    }

    /// Serialize a blueprint in this format
    pub fn render(self, blueprint: &DispatchBlueprint) -> Result<String, ContractError> {
        let rendered = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| ContractError::config_parse(format!("{self:?} serialize error: {e}")))
    }
}

fn parse_error(
    format: ConfigFormat,
    err: impl std::error::Error + Send + Sync + 'static,
) -> ContractError {
    ContractError::ConfigParse {
        message: format!("{format:?} parse error: {err}"),
        source: Some(Box::new(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BackendType;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[backends]]
name = "Provider1"
backend_type = "simulated"
[backends.params]
success_rate = "0.7"
"#;
        let bp = ConfigFormat::Toml.parse(content).unwrap();
        assert_eq!(bp.backends.len(), 1);
        assert_eq!(bp.backends[0].backend_type, BackendType::Simulated);
        // [dispatcher] omitted entirely -> defaults
        assert_eq!(bp.dispatcher.max_retries, 3);
        assert_eq!(bp.dispatcher.rate_limit, 5);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "dispatcher": { "max_retries": 2, "base_delay_ms": 10 },
            "backends": [
                { "name": "primary", "backend_type": "log" },
                { "name": "fallback", "backend_type": "scripted", "params": { "mode": "succeed" } }
            ]
        }"#;
        let bp = ConfigFormat::Json.parse(content).unwrap();
        assert_eq!(bp.dispatcher.max_retries, 2);
        assert_eq!(bp.dispatcher.base_delay_ms, 10);
        assert_eq!(
            bp.backends[1].params.get("mode").map(String::as_str),
            Some("succeed")
        );
    }

    #[test]
    fn test_syntax_error_keeps_source() {
        let err = ConfigFormat::Toml.parse("invalid toml [[[").unwrap_err();
        match err {
            ContractError::ConfigParse { message, source } => {
                assert!(message.starts_with("Toml parse error"));
                assert!(source.is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_backend_type() {
        let content = r#"
[[backends]]
name = "smtp"
backend_type = "carrier_pigeon"
"#;
        assert!(ConfigFormat::Toml.parse(content).is_err());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);

        assert_eq!(
            ConfigFormat::from_path(Path::new("conf/dispatch.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("dispatch")).is_err());
    }

    #[test]
    fn test_render_default_blueprint() {
        let toml = ConfigFormat::Toml.render(&DispatchBlueprint::default()).unwrap();
        assert!(toml.contains("Provider1"));
        assert!(toml.contains("[dispatcher]"));
    }
}
