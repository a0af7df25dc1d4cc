//! Configuration validation system.

use super::types::ControllerConfig;

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// Error message.
    pub message: String,
    /// Severity level.
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// Create a new error.
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    /// Create a new warning.
    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Severity of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid.
    Error,
    /// Warning - configuration may have issues.
    Warning,
}

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty (valid) result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if the validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity == ValidationSeverity::Error)
    }

    /// Get all validation issues.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get only warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Warning)
            .collect()
    }

    /// Joins the error-severity messages into one line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .filter(|e| e.severity == ValidationSeverity::Error)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Trait for configuration validators.
pub trait Validator: std::fmt::Debug + Send + Sync {
    /// Validate a configuration and return any errors.
    fn validate(&self, config: &ControllerConfig) -> ValidationResult;
}

/// Checks controller identity fields.
#[derive(Debug, Default)]
pub struct BasicValidator;

impl BasicValidator {
    /// Create a new basic validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for BasicValidator {
    fn validate(&self, config: &ControllerConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.controller.name.trim().is_empty() {
            result.add_error(ValidationError::error(
                "controller.name",
                "controller name cannot be empty",
            ));
        }

        result
    }
}

/// Rejects host layouts the balancer cannot run with: empty or overlapping
/// pools, a proxy address inside a pool, or unparsable address prefixes.
#[derive(Debug, Default)]
pub struct PoolLayoutValidator;

impl PoolLayoutValidator {
    /// Create a new pool layout validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for PoolLayoutValidator {
    fn validate(&self, config: &ControllerConfig) -> ValidationResult {
        config.balancer.check_layout()
    }
}

/// Checks flow timeouts and the statistics poll interval.
#[derive(Debug, Default)]
pub struct TimingValidator;

impl TimingValidator {
    /// Create a new timing validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Validator for TimingValidator {
    fn validate(&self, config: &ControllerConfig) -> ValidationResult {
        config.balancer.check_timing()
    }
}
