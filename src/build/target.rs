//! Build target definitions.
//!
//! A module is a directory holding a `build.json` manifest. Each manifest
//! entry under `builds` becomes one [`BuildTarget`], the unit the target
//! builder turns into a bundle.

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// File name that marks a directory as a module.
pub const MANIFEST_FILENAME: &str = "build.json";

/// Extension of generated script and language bundles.
pub const SCRIPT_EXTENSION: &str = "js";

/// A discovered module directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleDescriptor {
    /// Directory containing the manifest
    pub path: PathBuf,
}

impl ModuleDescriptor {
    /// Create a descriptor for a module directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of this module's manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.path.join(MANIFEST_FILENAME)
    }
}

/// Optional per-target configuration from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    /// Modules this bundle depends on, in declared order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub requires: Vec<String>,
    /// Locale codes to generate language bundles for
    #[serde(default)]
    pub lang: Option<Vec<String>>,
}

/// Read `null` as an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One named build target parsed from a module manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Target name, unique within its manifest
    pub name: String,
    /// Directory of the owning module
    pub module_path: PathBuf,
    /// Script files relative to `<module>/js/`, in concatenation order
    pub script_files: Vec<String>,
    /// Optional `config` block
    pub config: TargetConfig,
}

impl BuildTarget {
    /// Create a target with no `config` block.
    pub fn new(name: impl Into<String>, module_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            module_path: module_path.into(),
            script_files: vec![],
            config: TargetConfig::default(),
        }
    }

    /// Set the script file list.
    pub fn with_script_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.script_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Set the required module list.
    pub fn with_requires<S: Into<String>>(mut self, requires: impl IntoIterator<Item = S>) -> Self {
        self.config.requires = requires.into_iter().map(Into::into).collect();
        self
    }

    /// Set the locale list.
    pub fn with_lang<S: Into<String>>(mut self, lang: impl IntoIterator<Item = S>) -> Self {
        self.config.lang = Some(lang.into_iter().map(Into::into).collect());
        self
    }

    /// Unique identifier used in reports, e.g. `widgets/button:button`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.module_path.display(), self.name)
    }

    pub fn js_dir(&self) -> PathBuf {
        self.module_path.join("js")
    }

    pub fn lang_dir(&self) -> PathBuf {
        self.module_path.join("lang")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.module_path.join("assets")
    }

    pub fn skins_dir(&self) -> PathBuf {
        self.assets_dir().join("skins")
    }

    /// Output directory for this target: `<build_dir>/<name>`.
    pub fn out_dir(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.name)
    }

    /// Primary script bundle: `<build_dir>/<name>/<name>.js`.
    pub fn script_output(&self, build_dir: &Path) -> PathBuf {
        self.out_dir(build_dir).join(format!("{}.{}", self.name, SCRIPT_EXTENSION))
    }

    /// Locales to bundle: the declared ones followed by the default (empty)
    /// locale. `None` when no `lang` list is configured.
    pub fn locales(&self) -> Option<Vec<String>> {
        self.config.lang.as_ref().map(|langs| {
            let mut all = langs.clone();
            all.push(String::new());
            all
        })
    }

    /// Localization file stem for a locale: `<name>_<locale>`, or `<name>`
    /// for the default locale.
    pub fn locale_stem(&self, locale: &str) -> String {
        if locale.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.name, locale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_manifest_path() {
        let module = ModuleDescriptor::new("/src/widget");
        assert_eq!(module.manifest_path(), PathBuf::from("/src/widget/build.json"));
    }

    #[test]
    fn test_target_paths() {
        let target = BuildTarget::new("widget", "/src/widget");
        let build = Path::new("/out");

        assert_eq!(target.js_dir(), PathBuf::from("/src/widget/js"));
        assert_eq!(target.skins_dir(), PathBuf::from("/src/widget/assets/skins"));
        assert_eq!(target.script_output(build), PathBuf::from("/out/widget/widget.js"));
    }

    #[test]
    fn test_target_id() {
        let target = BuildTarget::new("widget", "mods/widget");
        assert_eq!(target.id(), "mods/widget:widget");
    }

    #[test]
    fn test_locales_none_without_lang() {
        let target = BuildTarget::new("widget", "/src/widget");
        assert_eq!(target.locales(), None);
    }

    #[test]
    fn test_locales_append_default() {
        let target = BuildTarget::new("widget", "/src/widget").with_lang(["fr", "de"]);
        assert_eq!(
            target.locales(),
            Some(vec!["fr".to_string(), "de".to_string(), String::new()])
        );
    }

    #[test]
    fn test_locale_stem() {
        let target = BuildTarget::new("widget", "/src/widget");
        assert_eq!(target.locale_stem("fr"), "widget_fr");
        assert_eq!(target.locale_stem(""), "widget");
    }
}
