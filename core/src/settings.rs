//! Parser settings.
//!
//! Controls the structurally reserved tokens (stop token, argument-file
//! prefix, debug toggle), short-option aggregation and the other parse
//! policies. Settings are YAML-serializable so a program can ship them next
//! to its binary.
//!
//! # Example YAML
//!
//! ```yaml
//! program_name: greet
//! about_line: Greets people.
//! stop_token: "--"
//! args_file_prefix: "@"
//! aggregate_short_options_prefix: "-"
//! stop_options_after_parameter: false
//! default_command: hello
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading settings, catalogs or model schemas.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse policies shared by every engine in a command tree.
///
/// # Examples
///
/// ```
/// use optbind_core::ParserSettings;
///
/// let settings = ParserSettings::default();
/// assert_eq!(settings.stop_token, "--");
/// assert_eq!(settings.args_file_prefix.as_deref(), Some("@"));
/// assert!(settings.aggregate_short_options_prefix.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Program name shown in usage.
    pub program_name: Option<String>,
    /// Additional line shown at the top of usage.
    pub about_line: Option<String>,
    /// Token that disables option parsing for the rest of the line.
    pub stop_token: String,
    /// Prefix marking a token as an argument file; `None` disables expansion.
    pub args_file_prefix: Option<String>,
    /// Prefix under which single-letter options may be aggregated
    /// (`-lfs`); `None` disables aggregation.
    pub aggregate_short_options_prefix: Option<String>,
    /// Stop accepting options once the first parameter token was consumed.
    pub stop_options_after_parameter: bool,
    /// Token that switches on debug tracing; `None` disables it.
    pub debug_token: Option<String>,
    /// Whether the debug token is recognized at all.
    pub debug_allowed: bool,
    /// Command assumed when a token matches nothing and no parameter exists.
    pub default_command: Option<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            program_name: None,
            about_line: None,
            stop_token: "--".to_string(),
            args_file_prefix: Some("@".to_string()),
            aggregate_short_options_prefix: None,
            stop_options_after_parameter: false,
            debug_token: Some("--OPTBIND_DEBUG".to_string()),
            debug_allowed: true,
            default_command: None,
        }
    }
}

impl ParserSettings {
    /// Loads settings from a YAML file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, or
    /// [`SettingsError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let settings: Self = serde_yaml::from_reader(reader)?;
        Ok(settings.normalized())
    }

    /// Saves the settings as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Trims the configurable prefixes and turns empty ones into `None`.
    pub fn normalized(mut self) -> Self {
        self.args_file_prefix = normalize_prefix(self.args_file_prefix.as_deref());
        self.aggregate_short_options_prefix =
            normalize_prefix(self.aggregate_short_options_prefix.as_deref());
        self.default_command = self.default_command.filter(|name| !name.is_empty());
        self
    }
}

/// Trims a prefix; empty or whitespace-only means disabled.
pub(crate) fn normalize_prefix(prefix: Option<&str>) -> Option<String> {
    prefix
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings: ParserSettings =
            serde_yaml::from_str("aggregate_short_options_prefix: \"-\"\n").unwrap();
        assert_eq!(settings.aggregate_short_options_prefix.as_deref(), Some("-"));
        assert_eq!(settings.stop_token, "--");
        assert!(settings.debug_allowed);
    }

    #[test]
    fn test_normalized_disables_blank_prefixes() {
        let settings = ParserSettings {
            args_file_prefix: Some("  ".to_string()),
            aggregate_short_options_prefix: Some(" - ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(settings.args_file_prefix, None);
        assert_eq!(settings.aggregate_short_options_prefix.as_deref(), Some("-"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        let settings = ParserSettings {
            program_name: Some("greet".to_string()),
            stop_options_after_parameter: true,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(ParserSettings::load(&path).unwrap(), settings);
    }
}
