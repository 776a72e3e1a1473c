//! Wrapper templates and `@TOKEN@` substitution.
//!
//! Two templates wrap every build output: the module wrapper around the
//! concatenated scripts, and the language wrapper around each locale's
//! strings. Both ship inside the binary and can be replaced by files on disk
//! through the `[templates]` section of `yuibuild.toml`.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use yui_build::template::substitute;
//!
//! let mut values = HashMap::new();
//! values.insert("NAME", "widget".to_string());
//! assert_eq!(substitute("YUI.add('@NAME@')", &values), "YUI.add('widget')");
//! ```

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Built-in script wrapper.
pub const MODULE_TEMPLATE: &str = include_str!("../templates/module.tpl");

/// Built-in language wrapper.
pub const LANGUAGE_TEMPLATE: &str = include_str!("../templates/language.tpl");

/// Version string substituted as `@VERSION@` unless the config overrides it.
pub const DEFAULT_VERSION: &str = "0.1";

/// Error loading a template override.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The override file could not be read
    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"@(\w*)@").expect("token pattern is valid"))
}

/// Replace every `@KEY@` token in `template` with its value.
///
/// Keys that are missing from `values`, or map to an empty string, render as
/// the empty string. A lone `@` that does not close a token is left alone.
pub fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    token_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Values for the script wrapper.
#[derive(Debug, Clone)]
pub struct ModuleWrapper<'a> {
    pub module_name: &'a str,
    pub version: &'a str,
    pub content: &'a str,
    /// Module names this bundle requires, in declared order
    pub requires: &'a [String],
}

impl ModuleWrapper<'_> {
    fn values(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("MODULE_NAME", self.module_name.to_string()),
            ("VERSION", self.version.to_string()),
            ("CONTENT", self.content.to_string()),
            ("REQUIRES", format_requires(self.requires)),
        ])
    }
}

/// Values for the language wrapper.
#[derive(Debug, Clone)]
pub struct LanguageWrapper<'a> {
    /// Loader path of the language module, e.g. `lang/widget_fr`
    pub lang_module: &'a str,
    pub module_name: &'a str,
    pub version: &'a str,
    /// Locale code, empty for the default locale
    pub lang: &'a str,
    pub strings: &'a str,
}

impl LanguageWrapper<'_> {
    fn values(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("LANG_MODULE", self.lang_module.to_string()),
            ("MODULE_NAME", self.module_name.to_string()),
            ("VERSION", self.version.to_string()),
            ("LANG", self.lang.to_string()),
            ("STRINGS", self.strings.to_string()),
        ])
    }
}

/// Render a `requires` list as comma-joined double-quoted names.
///
/// `["foo", "bar"]` becomes `"foo","bar"`; an empty list becomes `""`.
pub fn format_requires(requires: &[String]) -> String {
    requires.iter().map(|r| format!("\"{}\"", r)).collect::<Vec<_>>().join(",")
}

/// The pair of wrapper templates used for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    module: String,
    language: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Templates {
    /// The templates compiled into the binary.
    pub fn builtin() -> Self {
        Self { module: MODULE_TEMPLATE.to_string(), language: LANGUAGE_TEMPLATE.to_string() }
    }

    /// Create templates from explicit strings.
    pub fn new(module: impl Into<String>, language: impl Into<String>) -> Self {
        Self { module: module.into(), language: language.into() }
    }

    /// Load templates, replacing each built-in with its override file if given.
    pub fn load(module: Option<&Path>, language: Option<&Path>) -> Result<Self, TemplateError> {
        let mut templates = Self::builtin();
        if let Some(path) = module {
            templates.module = read_template(path)?;
        }
        if let Some(path) = language {
            templates.language = read_template(path)?;
        }
        Ok(templates)
    }

    /// Render the script wrapper.
    pub fn render_module(&self, wrapper: &ModuleWrapper<'_>) -> String {
        substitute(&self.module, &wrapper.values())
    }

    /// Render the language wrapper.
    pub fn render_language(&self, wrapper: &LanguageWrapper<'_>) -> String {
        substitute(&self.language, &wrapper.values())
    }
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    fs::read_to_string(path).map_err(|source| TemplateError::Read { path: path.to_path_buf(), source })
}
