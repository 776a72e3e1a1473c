//! Build context containing the immutable configuration for one run.

use crate::config::{resolve_path, ConfigError, YuiConfig};
use crate::template::{Templates, DEFAULT_VERSION};
use std::path::{Path, PathBuf};

/// Default number of parallel jobs (uses available parallelism).
pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Build context containing configuration and paths for a build operation.
///
/// Created once per run and passed by reference to every pipeline stage;
/// nothing below the orchestrator reads configuration from anywhere else.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Destination root for generated output
    build_dir: PathBuf,
    /// Root directory for module discovery
    start_path: PathBuf,
    /// Walk the whole tree during discovery
    recursive: bool,
    /// Explicit module directories (bypasses discovery)
    modules: Option<Vec<PathBuf>>,
    /// Verbose diagnostic output
    debug: bool,
    /// Worker pool size
    jobs: usize,
    /// Version string substituted into wrappers
    version: String,
    /// Wrapper templates
    templates: Templates,
}

impl BuildContext {
    /// Create a new build context writing to `build_dir` and discovering
    /// modules below `start_path`.
    pub fn new(build_dir: impl Into<PathBuf>, start_path: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            start_path: start_path.into(),
            recursive: false,
            modules: None,
            debug: false,
            jobs: default_jobs(),
            version: DEFAULT_VERSION.to_string(),
            templates: Templates::builtin(),
        }
    }

    /// Assemble a context from loaded configuration.
    ///
    /// Relative paths (start path, explicit modules) are resolved against
    /// `base_dir`, normally the current working directory. The start path
    /// defaults to `base_dir` itself.
    pub fn from_config(
        config: &YuiConfig,
        base_dir: &Path,
        modules: Option<Vec<PathBuf>>,
    ) -> Result<Self, ConfigError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
        }

        let build_dir = config.build.build_dir.as_deref().ok_or(ConfigError::MissingBuildDir)?;
        let start_path = config
            .build
            .start_path
            .as_deref()
            .map(|p| resolve_path(base_dir, p))
            .unwrap_or_else(|| base_dir.to_path_buf());
        let templates =
            Templates::load(config.templates.module.as_deref(), config.templates.language.as_deref())?;

        let mut context = Self::new(resolve_path(base_dir, build_dir), start_path)
            .with_recursive(config.build.recursive)
            .with_version(config.build.version.clone())
            .with_templates(templates);

        if let Some(jobs) = config.build.jobs {
            context = context.with_jobs(jobs);
        }
        if let Some(modules) = modules {
            context = context
                .with_modules(modules.iter().map(|m| resolve_path(base_dir, m)).collect());
        }

        context.validate()?;
        Ok(context)
    }

    /// Check that the context describes something buildable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.modules {
            Some(modules) if modules.is_empty() => Err(ConfigError::EmptyModuleList),
            Some(_) => Ok(()),
            None if self.start_path.is_dir() => Ok(()),
            None => Err(ConfigError::NoModuleSource(self.start_path.clone())),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn start_path(&self) -> &Path {
        &self.start_path
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Explicit module list, if one was supplied.
    pub fn modules(&self) -> Option<&[PathBuf]> {
        self.modules.as_deref()
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Set the discovery root.
    pub fn with_start_path(mut self, start_path: impl Into<PathBuf>) -> Self {
        self.start_path = start_path.into();
        self
    }

    /// Set recursive discovery.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Build exactly these modules instead of discovering them.
    pub fn with_modules(mut self, modules: Vec<PathBuf>) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Set debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the number of parallel jobs (at least one).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the wrapper templates.
    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    /// A copy of this context scoped to a single module.
    pub fn for_module(&self, module: PathBuf) -> Self {
        self.clone().with_modules(vec![module])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_context_new() {
        let ctx = BuildContext::new("/out", "/src");

        assert_eq!(ctx.build_dir(), Path::new("/out"));
        assert_eq!(ctx.start_path(), Path::new("/src"));
        assert!(!ctx.is_recursive());
        assert!(!ctx.is_debug());
        assert!(ctx.modules().is_none());
        assert!(ctx.jobs() >= 1);
        assert_eq!(ctx.version(), "0.1");
    }

    #[test]
    fn test_with_jobs_minimum_one() {
        let ctx = BuildContext::new("/out", "/src").with_jobs(0);
        assert_eq!(ctx.jobs(), 1);
    }

    #[test]
    fn test_from_config_requires_build_dir() {
        let temp = TempDir::new().unwrap();
        let result = BuildContext::from_config(&YuiConfig::default(), temp.path(), None);
        assert!(matches!(result, Err(ConfigError::MissingBuildDir)));
    }

    #[test]
    fn test_from_config_rejects_zero_jobs() {
        let temp = TempDir::new().unwrap();
        let mut config = YuiConfig::default();
        config.build.build_dir = Some(PathBuf::from("dist"));
        config.build.jobs = Some(0);

        let result = BuildContext::from_config(&config, temp.path(), None);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_config_resolves_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("modules")).unwrap();

        let mut config = YuiConfig::default();
        config.build.build_dir = Some(PathBuf::from("dist"));
        config.build.start_path = Some(PathBuf::from("modules"));
        config.build.recursive = true;
        config.build.jobs = Some(3);

        let ctx = BuildContext::from_config(&config, temp.path(), None).unwrap();
        assert_eq!(ctx.build_dir(), temp.path().join("dist"));
        assert_eq!(ctx.start_path(), temp.path().join("modules"));
        assert!(ctx.is_recursive());
        assert_eq!(ctx.jobs(), 3);
    }

    #[test]
    fn test_from_config_start_path_defaults_to_base() {
        let temp = TempDir::new().unwrap();
        let mut config = YuiConfig::default();
        config.build.build_dir = Some(PathBuf::from("dist"));

        let ctx = BuildContext::from_config(&config, temp.path(), None).unwrap();
        assert_eq!(ctx.start_path(), temp.path());
    }

    #[test]
    fn test_from_config_explicit_modules() {
        let temp = TempDir::new().unwrap();
        let mut config = YuiConfig::default();
        config.build.build_dir = Some(PathBuf::from("/out"));
        config.build.start_path = Some(PathBuf::from("/nonexistent/start"));

        let ctx = BuildContext::from_config(
            &config,
            temp.path(),
            Some(vec![PathBuf::from("a"), PathBuf::from("/abs/b")]),
        )
        .unwrap();

        assert_eq!(
            ctx.modules(),
            Some(&[temp.path().join("a"), PathBuf::from("/abs/b")][..])
        );
    }

    #[test]
    fn test_validate_empty_module_list() {
        let ctx = BuildContext::new("/out", "/src").with_modules(vec![]);
        assert!(matches!(ctx.validate(), Err(ConfigError::EmptyModuleList)));
    }

    #[test]
    fn test_validate_missing_start_path() {
        let ctx = BuildContext::new("/out", "/nonexistent/start");
        assert!(matches!(ctx.validate(), Err(ConfigError::NoModuleSource(_))));
    }

    #[test]
    fn test_for_module() {
        let ctx = BuildContext::new("/out", "/src").with_recursive(true);
        let scoped = ctx.for_module(PathBuf::from("/src/widget"));

        assert_eq!(scoped.modules(), Some(&[PathBuf::from("/src/widget")][..]));
        assert!(scoped.is_recursive());
        assert!(ctx.modules().is_none());
    }
}
