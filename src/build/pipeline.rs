//! Build pipeline orchestration.
//!
//! The pipeline resolves the module list, reads each module's manifest and
//! hands every target to the [`TargetBuilder`]. Modules, targets and steps
//! all run on one worker pool sized by the context's job count.
//!
//! Only configuration and discovery errors abort a run. Everything else is
//! recorded in the [`BuildReport`] and the run carries on.

use crate::build::progress::{NullProgress, ProgressEvent, ProgressReporter, TargetStatus};
use crate::build::{
    discover_modules, read_manifest, BuildContext, BuildOutcome, BuildReport, DiscoveryError,
    ModuleDescriptor, ModuleResult, TargetBuilder,
};
use crate::config::ConfigError;
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;

/// Error that aborts a build run before any module is built.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The run configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Module discovery could not read the start tree
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
    /// The worker pool could not be created
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    context: BuildContext,
    reporter: Box<dyn ProgressReporter>,
}

impl BuildPipeline {
    /// Create a pipeline that reports nothing.
    pub fn new(context: BuildContext) -> Self {
        Self { context, reporter: Box::new(NullProgress::new()) }
    }

    /// Send progress events to `reporter`.
    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Resolve the modules this run will build.
    ///
    /// An explicit module list is used as given (first occurrence wins for
    /// duplicates). Otherwise modules are discovered below the start path.
    pub fn modules(&self) -> Result<Vec<ModuleDescriptor>, BuildError> {
        self.context.validate()?;

        match self.context.modules() {
            Some(paths) => {
                let mut seen = HashSet::new();
                Ok(paths
                    .iter()
                    .filter(|p| seen.insert(p.as_path()))
                    .map(ModuleDescriptor::new)
                    .collect())
            }
            None => Ok(discover_modules(self.context.start_path(), self.context.is_recursive())?),
        }
    }

    /// Run the build.
    ///
    /// Returns a report covering every module, in module-list order, with
    /// each module's targets in manifest order.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let start = Instant::now();

        let modules = self.modules()?;
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.context.jobs()).build()?;

        tracing::info!(
            "building {} modules into {} ({} jobs)",
            modules.len(),
            self.context.build_dir().display(),
            self.context.jobs()
        );
        self.reporter.report(ProgressEvent::BuildStarted { total_modules: modules.len() });

        let results: Vec<ModuleResult> =
            pool.install(|| modules.par_iter().map(|m| self.build_module(m)).collect());

        let mut report = BuildReport::new();
        for result in results {
            report.add_module(result);
        }
        let report = report.with_duration(start.elapsed());

        self.reporter.report(ProgressEvent::BuildCompleted {
            success: report.is_success(),
            duration_ms: report.total_duration.as_millis() as u64,
            succeeded: report.targets_succeeded(),
            failed: report.targets_failed(),
            modules_failed: report.modules.iter().filter(|m| m.manifest_error.is_some()).count(),
        });

        Ok(report)
    }

    /// Read one module's manifest and build all of its targets.
    fn build_module(&self, module: &ModuleDescriptor) -> ModuleResult {
        let module_name = module.path.display().to_string();

        let targets = match read_manifest(&module.path) {
            Ok(targets) => targets,
            Err(err) => {
                tracing::warn!("{}", err);
                self.reporter.report(ProgressEvent::ModuleFailed {
                    module: module_name,
                    message: err.to_string(),
                });
                return ModuleResult::manifest_failed(module.path.clone(), err);
            }
        };

        self.reporter.report(ProgressEvent::ModuleStarted {
            module: module_name,
            targets: targets.len(),
        });

        let builder = TargetBuilder::new(&self.context);
        let outcomes: Vec<BuildOutcome> = targets
            .par_iter()
            .map(|target| {
                let outcome = builder.build(target);
                self.reporter.report(ProgressEvent::TargetCompleted {
                    target_id: target.id(),
                    status: target_status(&outcome),
                    duration_ms: outcome.duration.as_millis() as u64,
                });
                outcome
            })
            .collect();

        ModuleResult::built(module.path.clone(), outcomes)
    }
}

fn target_status(outcome: &BuildOutcome) -> TargetStatus {
    if outcome.succeeded() {
        return TargetStatus::Success;
    }

    let causes: Vec<String> = outcome
        .steps
        .iter()
        .flat_map(|s| s.errors.iter().map(move |e| format!("{}: {}", s.step, e)))
        .collect();
    TargetStatus::Failed(causes.join("; "))
}

/// Build with `context` and no progress output.
pub fn run(context: BuildContext) -> Result<BuildReport, BuildError> {
    BuildPipeline::new(context).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ManifestError, StepName};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn module(root: &Path, name: &str, script: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        write(
            &dir.join("build.json"),
            &format!(r#"{{"builds": {{"{name}": {{"jsfiles": ["{name}.js"]}}}}}}"#),
        );
        if let Some(body) = script {
            write(&dir.join("js").join(format!("{name}.js")), body);
        }
        dir
    }

    #[test]
    fn test_build_discovered_modules() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        module(&src, "alpha", Some("var a;"));
        module(&src, "beta", Some("var b;"));

        let ctx = BuildContext::new(temp.path().join("build"), &src).with_jobs(2);
        let report = run(ctx).unwrap();

        assert!(report.is_success());
        assert_eq!(report.modules_attempted(), 2);
        assert_eq!(report.targets_succeeded(), 2);
        assert!(temp.path().join("build/alpha/alpha.js").is_file());
        assert!(temp.path().join("build/beta/beta.js").is_file());
    }

    #[test]
    fn test_report_order_follows_module_list() {
        let temp = TempDir::new().unwrap();
        let b = module(temp.path(), "b", Some(""));
        let a = module(temp.path(), "a", Some(""));

        let ctx = BuildContext::new(temp.path().join("build"), temp.path())
            .with_modules(vec![b.clone(), a.clone(), b.clone()]);
        let report = run(ctx).unwrap();

        let order: Vec<_> = report.modules.iter().map(|m| m.module_path.clone()).collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn test_failures_are_contained() {
        let temp = TempDir::new().unwrap();
        module(temp.path(), "broken", None);
        module(temp.path(), "good", Some("var g;"));

        let ctx = BuildContext::new(temp.path().join("build"), temp.path());
        let report = run(ctx).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.targets_failed(), 1);
        assert_eq!(report.targets_succeeded(), 1);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].target_name.as_deref(), Some("broken"));
        assert_eq!(failures[0].step, StepName::Script.to_string());
        assert!(temp.path().join("build/good/good.js").is_file());
    }

    #[test]
    fn test_missing_manifest_in_explicit_list() {
        let temp = TempDir::new().unwrap();
        let empty = temp.path().join("empty");
        fs::create_dir_all(&empty).unwrap();

        let ctx = BuildContext::new(temp.path().join("build"), temp.path())
            .with_modules(vec![empty]);
        let report = run(ctx).unwrap();

        assert!(!report.is_success());
        assert!(matches!(report.modules[0].manifest_error, Some(ManifestError::Missing { .. })));
        assert_eq!(report.failures()[0].step, "manifest");
    }

    #[test]
    fn test_config_error_aborts() {
        let ctx = BuildContext::new("/out", "/nonexistent/start/path");
        assert!(matches!(run(ctx), Err(BuildError::Config(ConfigError::NoModuleSource(_)))));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_aborts_run() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        module(&src, "alpha", Some("var a;"));
        let locked = src.join("group");
        module(&locked, "nested", Some("var n;"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to a privileged user.
        let readable = fs::read_dir(&locked).is_ok();
        let ctx = BuildContext::new(temp.path().join("build"), &src).with_recursive(true);
        let result = run(ctx);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        match result {
            Err(BuildError::Discovery(err)) => assert_eq!(err.path, locked),
            other => panic!("expected discovery error, got {:?}", other.map(|r| r.summary())),
        }
        assert!(!temp.path().join("build/alpha").exists());
    }

    #[test]
    fn test_empty_tree_succeeds() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(temp.path().join("build"), temp.path());
        let report = run(ctx).unwrap();

        assert!(report.is_success());
        assert_eq!(report.modules_attempted(), 0);
    }

    #[test]
    fn test_target_status_lists_causes() {
        let temp = TempDir::new().unwrap();
        let dir = module(temp.path(), "broken", None);
        let ctx = BuildContext::new(temp.path().join("build"), temp.path());
        let targets = read_manifest(&dir).unwrap();

        let outcome = TargetBuilder::new(&ctx).build(&targets[0]);
        match target_status(&outcome) {
            TargetStatus::Failed(msg) => assert!(msg.starts_with("script: script file not found")),
            TargetStatus::Success => panic!("expected failure"),
        }
    }
}
