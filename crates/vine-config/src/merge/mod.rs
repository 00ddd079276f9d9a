//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;

use camino::Utf8PathBuf;
use vine_core::error::VineError;

use crate::follow::FollowConfig;
use crate::ConfigResult;

/// File name looked up in the working directory and its parents
pub const CONFIG_FILE_NAME: &str = "vine.toml";

/// Prefix of environment variables that override configuration fields
pub const ENV_PREFIX: &str = "VINE_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering {
    /// Environment overrides
    env_overrides: HashMap<String, String>,
    /// CLI flag overrides
    cli_overrides: HashMap<String, String>,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Explicit path passed by the caller
    Explicit(Utf8PathBuf),
    /// Project vine.toml file
    Project(Utf8PathBuf),
    /// Global config file
    Global(Utf8PathBuf),
    /// Built-in defaults
    Defaults,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load the base configuration layer.
    ///
    /// An explicit path must exist. Otherwise the project `vine.toml` wins over
    /// `~/.vine/config.toml`, and built-in defaults apply when neither exists.
    pub async fn load(&self, explicit: Option<Utf8PathBuf>) -> ConfigResult<(FollowConfig, ConfigSource)> {
        if let Some(path) = explicit {
            let config = crate::toml::load_from_file(&path).await?;
            return Ok((config, ConfigSource::Explicit(path)));
        }

        if let Some(path) = self.find_config_file(CONFIG_FILE_NAME) {
            let config = crate::toml::load_from_file(&path).await?;
            return Ok((config, ConfigSource::Project(path)));
        }

        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                let config = crate::toml::load_from_file(&path).await?;
                return Ok((config, ConfigSource::Global(path)));
            }
        }

        Ok((FollowConfig::default(), ConfigSource::Defaults))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn find_config_file(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.exists() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }

    /// Location of the per-user configuration file
    pub fn global_config_path() -> Option<Utf8PathBuf> {
        let home_dir = dirs::home_dir()?;
        let home_dir = Utf8PathBuf::try_from(home_dir).ok()?;
        Some(home_dir.join(".vine").join("config.toml"))
    }
}

impl ConfigLayering {
    /// Create a new configuration layering system
    pub fn new() -> Self {
        Self {
            env_overrides: HashMap::new(),
            cli_overrides: HashMap::new(),
        }
    }

    /// Use the `VINE_*` variables of the current process
    pub fn with_process_env(mut self) -> Self {
        self.env_overrides = Self::collect_env_overrides();
        self
    }

    pub fn with_env_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.env_overrides = overrides;
        self
    }

    /// Set a CLI override; keys are config field names
    pub fn with_cli_override(mut self, key: &str, value: impl ToString) -> Self {
        self.cli_overrides.insert(key.to_string(), value.to_string());
        self
    }

    /// Apply overrides on top of the base layer and validate the result
    pub fn merge(&self, base: FollowConfig) -> ConfigResult<FollowConfig> {
        Self::merge_configs(base, &self.env_overrides, &self.cli_overrides)
    }

    /// Merge configuration layers, CLI overrides taking priority over env
    pub fn merge_configs(
        base: FollowConfig,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<FollowConfig> {
        let mut merged = base;

        for (key, value) in env_overrides {
            if let Some(field) = key.strip_prefix(ENV_PREFIX) {
                Self::apply_override(&mut merged, &field.to_lowercase(), value, key)?;
            }
        }

        for (key, value) in cli_overrides {
            Self::apply_override(&mut merged, key, value, key)?;
        }

        merged.validate()
    }

    fn apply_override(
        config: &mut FollowConfig,
        field: &str,
        value: &str,
        origin: &str,
    ) -> ConfigResult<()> {
        match field {
            "user_agent" => config.user_agent = value.to_string(),
            "feed_url" => config.feed_url = value.to_string(),
            "registry_url" => config.registry_url = value.to_string(),
            "checkpoint_path" => config.checkpoint_path = Utf8PathBuf::from(value),
            "concurrency" => config.concurrency = parse_field(origin, value)?,
            "inactivity_timeout_ms" => config.inactivity_timeout_ms = parse_field(origin, value)?,
            "inactivity_backoff_ms" => config.inactivity_backoff_ms = parse_field(origin, value)?,
            "metadata_retries" => config.metadata_retries = parse_field(origin, value)?,
            "metadata_retry_backoff_ms" => {
                config.metadata_retry_backoff_ms = parse_field(origin, value)?
            },
            "heartbeat_ms" => config.heartbeat_ms = parse_field(origin, value)?,
            "since" => config.since = Some(parse_field(origin, value)?),
            "failure_policy" => config.failure_policy = value.parse()?,
            _ => {
                // Unknown override, ignore
            },
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

impl Default for ConfigLayering {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_field<T>(origin: &str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| VineError::ConfigValidation {
        field: origin.to_string(),
        reason: format!("'{}' is not valid: {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::follow::FailurePolicy;
    use tempfile::TempDir;
    use vine_core::types::Position;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, temp_path)
    }

    #[tokio::test]
    async fn test_find_config_walks_up() {
        let (_guard, root) = temp_root();
        let nested = root.join("a").join("b");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(root.join(CONFIG_FILE_NAME), "concurrency = 4").await.unwrap();

        let loader = ConfigLoader::new(nested);
        let found = loader.find_config_file(CONFIG_FILE_NAME).unwrap();
        assert_eq!(found, root.join(CONFIG_FILE_NAME));

        let (config, source) = loader.load(None).await.unwrap();
        assert_eq!(config.concurrency, 4);
        assert!(matches!(source, ConfigSource::Project(_)));
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let (_guard, root) = temp_root();
        let path = root.join("custom.toml");
        tokio::fs::write(&path, "since = 12657\nheartbeat_ms = 1000").await.unwrap();

        let loader = ConfigLoader::new(root);
        let (config, source) = loader.load(Some(path.clone())).await.unwrap();

        assert_eq!(config.since, Some(Position::new(12657)));
        assert_eq!(config.heartbeat_ms, 1000);
        assert_eq!(source, ConfigSource::Explicit(path));
    }

    #[tokio::test]
    async fn test_load_explicit_missing_fails() {
        let (_guard, root) = temp_root();
        let loader = ConfigLoader::new(root.clone());
        assert!(loader.load(Some(root.join("missing.toml"))).await.is_err());
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let base = FollowConfig {
            concurrency: 5,
            metadata_retries: 1,
            ..FollowConfig::default()
        };
        let env = HashMap::from([
            ("VINE_CONCURRENCY".to_string(), "8".to_string()),
            ("VINE_METADATA_RETRIES".to_string(), "2".to_string()),
            ("VINE_FAILURE_POLICY".to_string(), "skip".to_string()),
        ]);
        let cli = HashMap::from([("concurrency".to_string(), "12".to_string())]);

        let merged = ConfigLayering::merge_configs(base, &env, &cli).unwrap();
        assert_eq!(merged.concurrency, 12);
        assert_eq!(merged.metadata_retries, 2);
        assert_eq!(merged.failure_policy, FailurePolicy::Skip);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let layering = ConfigLayering::new().with_cli_override("concurrency", "0");
        assert!(layering.merge(FollowConfig::default()).is_err());

        let layering = ConfigLayering::new().with_cli_override("since", "yesterday");
        match layering.merge(FollowConfig::default()).unwrap_err() {
            VineError::ConfigValidation { field, .. } => assert_eq!(field, "since"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("VINE_TEST_COLLECT_MARKER", "1");
        std::env::set_var("NOT_VINE_TEST_COLLECT_MARKER", "ignored");

        let overrides = ConfigLayering::collect_env_overrides();

        assert!(overrides.contains_key("VINE_TEST_COLLECT_MARKER"));
        assert!(!overrides.contains_key("NOT_VINE_TEST_COLLECT_MARKER"));

        std::env::remove_var("VINE_TEST_COLLECT_MARKER");
        std::env::remove_var("NOT_VINE_TEST_COLLECT_MARKER");
    }
}
