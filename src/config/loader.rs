//! Configuration loading and discovery for `yuibuild.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{YuiConfig, CONFIG_FILENAME};
use crate::template::TemplateError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
///
/// Raised while loading `yuibuild.toml` or while assembling the immutable
/// configuration for a run. Any of these aborts the run before work starts.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse yuibuild.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// No build output directory was supplied
    #[error("no build directory specified (use --build-dir or [build].build_dir)")]
    MissingBuildDir,
    /// Neither a usable start path nor explicit modules were supplied
    #[error("start path {} is not a readable directory and no modules were listed", .0.display())]
    NoModuleSource(PathBuf),
    /// An explicit module list was supplied but is empty
    #[error("the module list is empty")]
    EmptyModuleList,
    /// A template override could not be loaded
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override build output directory
    pub build_dir: Option<PathBuf>,
    /// Override discovery start path
    pub start_path: Option<PathBuf>,
    /// Enable recursive discovery
    pub recursive: Option<bool>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
}

/// Find yuibuild.toml by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a config file is found
/// - `None` if no config file is found
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find yuibuild.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a yuibuild.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration. Relative paths inside the file are resolved against the
/// directory that contains it.
///
/// # Example
/// ```ignore
/// let config = load_config(Some(Path::new("site/yuibuild.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<YuiConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(YuiConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<YuiConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config: YuiConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    if let Some(root) = project_root(path) {
        resolve_relative_paths(&mut config, root);
    }

    tracing::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// Rewrite every relative path in `config` to be relative to `root`.
fn resolve_relative_paths(config: &mut YuiConfig, root: &Path) {
    let fields = [
        &mut config.build.build_dir,
        &mut config.build.start_path,
        &mut config.templates.module,
        &mut config.templates.language,
    ];

    for field in fields {
        if let Some(path) = field.as_mut() {
            *path = resolve_path(root, path);
        }
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut YuiConfig, overrides: &CliOverrides) {
    if let Some(ref build_dir) = overrides.build_dir {
        config.build.build_dir = Some(build_dir.clone());
    }

    if let Some(ref start_path) = overrides.start_path {
        config.build.start_path = Some(start_path.clone());
    }

    if let Some(recursive) = overrides.recursive {
        config.build.recursive = recursive;
    }

    if let Some(jobs) = overrides.jobs {
        config.build.jobs = Some(jobs);
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the yuibuild.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent().filter(|p| !p.as_os_str().is_empty())
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILENAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(contents.as_bytes())
            .expect("should write config content");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[build]\nrecursive = true");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "");

        let subdir = temp.path().join("modules").join("widget");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_resolves_relative_paths() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            r#"
[build]
build_dir = "dist"
start_path = "/abs/modules"
jobs = 2

[templates]
module = "tpl/module.tpl"
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.build.build_dir, Some(temp.path().join("dist")));
        assert_eq!(config.build.start_path, Some(PathBuf::from("/abs/modules")));
        assert_eq!(config.build.jobs, Some(2));
        assert_eq!(config.templates.module, Some(temp.path().join("tpl/module.tpl")));
        assert_eq!(config.templates.language, None);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let result = load_config(Some(&temp.path().join("nonexistent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[build]\njobs = 0\n");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_merge_cli_overrides_build_dir() {
        let mut config = YuiConfig::default();
        config.build.build_dir = Some(PathBuf::from("from-file"));
        let overrides = CliOverrides { build_dir: Some(PathBuf::from("dist")), ..Default::default() };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.build.build_dir, Some(PathBuf::from("dist")));
    }

    #[test]
    fn test_merge_cli_overrides_keeps_file_values() {
        let mut config = YuiConfig::default();
        config.build.recursive = true;
        config.build.jobs = Some(3);

        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert!(config.build.recursive);
        assert_eq!(config.build.jobs, Some(3));
    }

    #[test]
    fn test_merge_cli_overrides_multiple() {
        let mut config = YuiConfig::default();
        let overrides = CliOverrides {
            build_dir: Some(PathBuf::from("out")),
            start_path: Some(PathBuf::from("src")),
            recursive: Some(true),
            jobs: Some(8),
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.build.build_dir, Some(PathBuf::from("out")));
        assert_eq!(config.build.start_path, Some(PathBuf::from("src")));
        assert!(config.build.recursive);
        assert_eq!(config.build.jobs, Some(8));
    }

    #[test]
    fn test_resolve_path_absolute() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(root, Path::new("/other/path")), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(root, Path::new("modules")), PathBuf::from("/project/modules"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/yuibuild.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
        assert_eq!(project_root(Path::new("yuibuild.toml")), None);
    }
}
