//! Configuration loading and management
//!
//! Configuration is read once at startup. Anything that would leave the
//! security policy undefined (an unknown environment name, an empty
//! production origin list, an unparsable origin) is reported as a
//! [`ConfigError`] so the process refuses to start.

use crate::core::error::{ConfigError, OutpostError, OutpostResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variable selecting the execution mode
pub const ENVIRONMENT_VAR: &str = "OUTPOST_ENV";

/// Origin allowed in development mode unless configured otherwise
pub const DEFAULT_DEVELOPMENT_ORIGIN: &str = "http://localhost:3000";

/// Execution mode of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = OutpostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                message: "expected 'development' or 'production'".to_string(),
            }
            .into()),
        }
    }
}

fn default_development_origin() -> String {
    DEFAULT_DEVELOPMENT_ORIGIN.to_string()
}

/// Cross-origin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed in every environment; the only ones in production
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Local origin added in development mode
    #[serde(default = "default_development_origin")]
    pub development_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            development_origin: default_development_origin(),
        }
    }
}

impl CorsConfig {
    /// Configuration allowing exactly `origins`
    pub fn with_origins<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: origins.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Check that the configuration defines a policy for `environment`
    pub fn validate(&self, environment: Environment) -> OutpostResult<()> {
        crate::cors::origin::environment_origins(environment, self).map(|_| ())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Execution mode; overridden by [`ENVIRONMENT_VAR`] when set
    #[serde(default)]
    pub environment: Option<String>,

    /// Cross-origin configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> OutpostResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::IoError {
                    message: e.to_string(),
                }
            }
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                file: Some(path.display().to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> OutpostResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Resolve the environment, giving `override_value` precedence over the file
    ///
    /// Neither set means production, which requires explicit origins.
    pub fn resolve_environment_with(
        &self,
        override_value: Option<&str>,
    ) -> OutpostResult<Environment> {
        match override_value.or(self.environment.as_deref()) {
            Some(value) => value.parse(),
            None => Ok(Environment::Production),
        }
    }

    /// Resolve the environment from [`ENVIRONMENT_VAR`] and the file
    pub fn resolve_environment(&self) -> OutpostResult<Environment> {
        let from_env = std::env::var(ENVIRONMENT_VAR).ok();
        self.resolve_environment_with(from_env.as_deref())
    }
}
