//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `BridgeBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("bridge.toml")).unwrap();
//! println!("Max events: {}", blueprint.rate_limit.max_events);
//! ```

mod parser;
mod validator;

pub use contracts::BridgeBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BridgeBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already built blueprint (e.g. after CLI overrides)
    pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize BridgeBlueprint to TOML string
    pub fn to_toml(blueprint: &BridgeBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize BridgeBlueprint to JSON string
    pub fn to_json(blueprint: &BridgeBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BridgeBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BRIDGE_TOML: &str = r#"
[telegram]
target = "-1001234567890"

[discord]
target = "112233445566"

[rate_limit]
max_events = 5
window_sec = 8

[dedupe]
ttl_sec = 21600

[digest]
enabled = true
interval_sec = 3600
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(BRIDGE_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.telegram.target.as_deref(), Some("-1001234567890"));
        assert!(bp.digest.enabled);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(BRIDGE_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(BRIDGE_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp, bp2);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = "[rate_limit]\nmax_events = 0\n";
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("rate_limit.max_events"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        toml_file.write_all(BRIDGE_TOML.as_bytes()).unwrap();
        let bp = ConfigLoader::load_from_path(toml_file.path()).unwrap();
        assert_eq!(bp.discord.target.as_deref(), Some("112233445566"));

        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json_file
            .write_all(ConfigLoader::to_json(&bp).unwrap().as_bytes())
            .unwrap();
        assert_eq!(ConfigLoader::load_from_path(json_file.path()).unwrap(), bp);
    }

    #[test]
    fn test_load_from_path_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
