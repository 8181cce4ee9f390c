//! CLI configuration.
//!
//! Configuration is loaded from `~/.config/gymdesk/config.toml`; a missing
//! file means defaults. The base URL can also be overridden per invocation
//! with `--base-url` or the `GYMDESK_BASE_URL` environment variable.
//!
//! ## Example Configuration
//!
//! ```toml
//! base_url = "http://gym.internal:3000"
//! timeout_seconds = 10
//!
//! [form]
//! minimum_birth_year = 1900
//! require_observation = false
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

/// CLI configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Uniform per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Client form policy knobs.
    #[serde(default)]
    pub form: FormSettings,
}

/// Form policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSettings {
    /// Oldest accepted birth year.
    #[serde(default = "default_minimum_birth_year")]
    pub minimum_birth_year: i32,

    /// Whether a client record needs at least one observation before it can
    /// be saved.
    #[serde(default)]
    pub require_observation: bool,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            minimum_birth_year: default_minimum_birth_year(),
            require_observation: false,
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            form: FormSettings::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_timeout_seconds() -> u64 {
    10
}

const fn default_minimum_birth_year() -> i32 {
    1900
}

impl CliConfig {
    /// Load configuration from the default location.
    ///
    /// A missing file yields the defaults; `GYMDESK_BASE_URL` overrides the
    /// base URL either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            _ => Self::default(),
        };

        if let Ok(base_url) = std::env::var("GYMDESK_BASE_URL")
            && !base_url.is_empty()
        {
            config.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("gymdesk");
        Ok(config_dir.join("config.toml"))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the timeout is
    /// zero.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL '{}'", self.base_url))?;
        if self.timeout_seconds == 0 {
            bail!("timeout_seconds must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: CliConfig = toml::from_str(
            r#"
base_url = "http://gym.internal:3000"
timeout_seconds = 30

[form]
minimum_birth_year = 1920
require_observation = true
        "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://gym.internal:3000");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.form.minimum_birth_year, 1920);
        assert!(config.form.require_observation);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.form.minimum_birth_year, 1900);
        assert!(!config.form.require_observation);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CliConfig {
            base_url: "not a url".to_string(),
            ..CliConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CliConfig {
            timeout_seconds: 0,
            ..CliConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
