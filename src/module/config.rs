//! Module configuration types.

use std::collections::HashMap;

/// Configuration handed to a module on `init`.
///
/// Holds string key-value pairs; structured module configuration travels
/// as a raw TOML document under a well-known key.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    values: HashMap<String, String>,
}

impl ModuleConfig {
    /// Key under which modules look for their TOML document.
    pub const RAW_CONFIG_KEY: &'static str = "config";

    /// Creates a new empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration carrying a raw TOML document.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let mut config = Self::new();
        config.set_string(Self::RAW_CONFIG_KEY, raw);
        config
    }

    /// Sets a string value.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Gets a string value.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Gets the raw TOML document, if any.
    #[must_use]
    pub fn raw_config(&self) -> Option<&str> {
        self.get_string(Self::RAW_CONFIG_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        let config = ModuleConfig::from_raw("scheduling = \"random\"");
        assert_eq!(config.raw_config(), Some("scheduling = \"random\""));
        assert!(ModuleConfig::new().raw_config().is_none());
    }
}
