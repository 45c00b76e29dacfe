//! Orchestrator options.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COMMAND_LINE_PREFIX: &str = "-D";
pub const DEFAULT_CONFIG_FILE_PREFIX: &str = "--config=";

/// Options for a [`ConfigContext`](super::ConfigContext)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Prefix marking a property assignment (default: "-D")
    pub command_line_prefix: String,

    /// Prefix marking the config file argument (default: "--config=")
    pub config_file_prefix: String,

    /// Label printed for prototype entries in dumps (default: "Key")
    pub prototype_label: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            command_line_prefix: DEFAULT_COMMAND_LINE_PREFIX.to_string(),
            config_file_prefix: DEFAULT_CONFIG_FILE_PREFIX.to_string(),
            prototype_label: cfgm_json::DEFAULT_PROTOTYPE_LABEL.to_string(),
        }
    }
}

impl ContextOptions {
    /// Load options from JSON; missing or empty fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let options: Self = serde_json::from_str(text)?;
        Ok(options.normalized())
    }

    /// Replace empty fields with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.command_line_prefix.is_empty() {
            self.command_line_prefix = defaults.command_line_prefix;
        }
        if self.config_file_prefix.is_empty() {
            self.config_file_prefix = defaults.config_file_prefix;
        }
        if self.prototype_label.is_empty() {
            self.prototype_label = defaults.prototype_label;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ContextOptions::default();
        assert_eq!(options.command_line_prefix, "-D");
        assert_eq!(options.config_file_prefix, "--config=");
        assert_eq!(options.prototype_label, "Key");
    }

    #[test]
    fn test_partial_json() {
        let options = ContextOptions::from_json_str(r#"{"command_line_prefix": "-P"}"#).unwrap();
        assert_eq!(options.command_line_prefix, "-P");
        assert_eq!(options.config_file_prefix, "--config=");
    }

    #[test]
    fn test_empty_fields_normalized() {
        let options =
            ContextOptions::from_json_str(r#"{"config_file_prefix": "", "prototype_label": ""}"#)
                .unwrap();
        assert_eq!(options, ContextOptions::default());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(ContextOptions::from_json_str("{not json").is_err());
    }
}
