//! Configuration file loader.

use super::error::{ConfigError, ConfigResult};
use super::types::ControllerConfig;
use super::validation::{BasicValidator, PoolLayoutValidator, TimingValidator, Validator};
use std::path::Path;
use tracing::warn;

/// Configuration loader with validation support.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Validators to run on loaded configuration.
    validators: Vec<Box<dyn Validator>>,
}

impl ConfigLoader {
    /// Create a new configuration loader with no validators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader running every built-in validator.
    #[must_use]
    pub fn with_default_validators() -> Self {
        Self::new()
            .with_validator(BasicValidator::new())
            .with_validator(PoolLayoutValidator::new())
            .with_validator(TimingValidator::new())
    }

    /// Add a validator to the loader.
    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Load configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ConfigResult<ControllerConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.load_str(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML is malformed
    /// - Validation fails
    pub fn load_str(&self, content: &str) -> ConfigResult<ControllerConfig> {
        let config: ControllerConfig = toml::from_str(content)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration against all registered validators.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` listing every error-severity issue.
    pub fn validate(&self, config: &ControllerConfig) -> ConfigResult<()> {
        let mut failures = Vec::new();
        for validator in &self.validators {
            let result = validator.validate(config);
            for warning in result.warnings() {
                warn!(field = %warning.field, "{}", warning.message);
            }
            if !result.is_valid() {
                failures.push(result.summary());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(failures.join("; ")))
        }
    }

    /// Load configuration, or validate and return the default if `path` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_or_default<P: AsRef<Path>>(
        &self,
        path: Option<P>,
    ) -> ConfigResult<ControllerConfig> {
        match path {
            Some(path) => self.load(path),
            None => {
                let config = ControllerConfig::default();
                self.validate(&config)?;
                Ok(config)
            },
        }
    }
}
