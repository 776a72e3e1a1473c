//! Configuration schema types for `yuibuild.toml`
//!
//! Defines the structure and validation rules for project configuration.
//! Every section and key is optional; command-line options fill in or
//! override whatever the file leaves out.

use serde::Deserialize;
use std::path::PathBuf;

/// Name of the project configuration file.
pub const CONFIG_FILENAME: &str = "yuibuild.toml";

/// Build settings section
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Destination root for all generated output
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    /// Root directory to discover modules under
    #[serde(default)]
    pub start_path: Option<PathBuf>,
    /// Walk the whole tree instead of immediate children only
    #[serde(default)]
    pub recursive: bool,
    /// Worker pool size (defaults to available parallelism)
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Version string substituted into wrappers
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    crate::template::DEFAULT_VERSION.to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            build_dir: None,
            start_path: None,
            recursive: false,
            jobs: None,
            version: default_version(),
        }
    }
}

/// Wrapper template overrides
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TemplatesConfig {
    /// Replacement for the built-in script wrapper
    #[serde(default)]
    pub module: Option<PathBuf>,
    /// Replacement for the built-in language wrapper
    #[serde(default)]
    pub language: Option<PathBuf>,
}

/// Watch mode configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: false }
    }
}

/// Complete yuibuild.toml configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct YuiConfig {
    /// Build settings
    #[serde(default)]
    pub build: BuildSection,
    /// Template overrides
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "build.jobs")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: '{}' {}", CONFIG_FILENAME, self.field, self.message)
    }
}

impl YuiConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.build.jobs == Some(0) {
            errors.push(ConfigValidationError {
                field: "build.jobs".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.build.version.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "build.version".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
