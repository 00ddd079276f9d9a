//! vine.toml parsing and serialization

use camino::Utf8Path;
use vine_core::error::VineError;

use crate::follow::FollowConfig;
use crate::ConfigResult;

/// Parse a vine.toml document.
///
/// Missing keys fall back to `FollowConfig::default()`. Validation happens
/// after all layers are merged.
pub fn parse_vine_toml(content: &str) -> ConfigResult<FollowConfig> {
    ::toml::from_str(content).map_err(|e| VineError::TomlParse {
        message: e.to_string(),
    })
}

/// Serialize a configuration back to TOML
pub fn serialize_vine_toml(config: &FollowConfig) -> ConfigResult<String> {
    ::toml::to_string_pretty(config).map_err(|e| VineError::TomlParse {
        message: format!("TOML serialization error: {}", e),
    })
}

/// Load and parse vine.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<FollowConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| VineError::io(format!("Failed to read {}", path), e))?;

    parse_vine_toml(&content).map_err(|e| match e {
        VineError::TomlParse { message } => VineError::TomlParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}
