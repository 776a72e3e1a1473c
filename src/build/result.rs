//! Build result types.
//!
//! Contains types for representing the outcome of build operations, from a
//! single generation step up to the report for a whole run.

use crate::build::ManifestError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The four generation steps run for every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepName {
    /// Concatenate and wrap script files
    Script,
    /// Wrap per-locale string files
    Localization,
    /// Copy the `assets` folder
    Assets,
    /// Merge skin and core stylesheets
    Skins,
}

impl StepName {
    /// All steps, in reporting order.
    pub const ALL: [StepName; 4] =
        [StepName::Script, StepName::Localization, StepName::Assets, StepName::Skins];
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepName::Script => write!(f, "script"),
            StepName::Localization => write!(f, "localization"),
            StepName::Assets => write!(f, "assets"),
            StepName::Skins => write!(f, "skins"),
        }
    }
}

/// Error raised by a generation step.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StepError {
    /// A script file listed in `jsfiles` does not exist
    #[error("script file not found: {}", path.display())]
    SourceFileMissing { path: PathBuf },
    /// A localization file for a configured locale does not exist
    #[error("localization file for locale '{locale}' not found: {}", path.display())]
    LocaleFileMissing { locale: String, path: PathBuf },
    /// Copying the assets folder failed
    #[error("failed to copy assets {}: {source}", path.display())]
    AssetCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The skins folder could not be listed
    #[error("failed to list skins in {}: {source}", path.display())]
    SkinList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Any other read, write or directory creation failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StepError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StepError::Io { path: path.to_path_buf(), source }
    }
}

/// Outcome of one generation step for one target.
#[derive(Debug)]
pub struct StepOutcome {
    /// Which step ran
    pub step: StepName,
    /// Files written by the step
    pub outputs: Vec<PathBuf>,
    /// Errors collected by the step (empty on success)
    pub errors: Vec<StepError>,
}

impl StepOutcome {
    /// Create a successful outcome.
    pub fn success(step: StepName, outputs: Vec<PathBuf>) -> Self {
        Self { step, outputs, errors: vec![] }
    }

    /// Create an outcome for a step that failed with a single error.
    pub fn failed(step: StepName, error: StepError) -> Self {
        Self { step, outputs: vec![], errors: vec![error] }
    }

    /// Check if the step succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Aggregate outcome of building one target.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Target name
    pub target_name: String,
    /// Directory of the owning module
    pub module_path: PathBuf,
    /// One entry per step, in [`StepName::ALL`] order
    pub steps: Vec<StepOutcome>,
    /// Build duration
    pub duration: Duration,
}

impl BuildOutcome {
    /// Check if every step succeeded.
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(StepOutcome::is_success)
    }

    /// Get the outcome of a specific step.
    pub fn step(&self, step: StepName) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Get all files written for this target.
    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.steps.iter().flat_map(|s| s.outputs.iter()).collect()
    }
}

/// Result of building every target of one module.
#[derive(Debug)]
pub struct ModuleResult {
    /// Module directory
    pub module_path: PathBuf,
    /// Set when the manifest could not be read; no targets were built
    pub manifest_error: Option<ManifestError>,
    /// Outcomes for each target, in manifest order
    pub targets: Vec<BuildOutcome>,
}

impl ModuleResult {
    /// Create a result for a module whose manifest could not be read.
    pub fn manifest_failed(module_path: PathBuf, error: ManifestError) -> Self {
        Self { module_path, manifest_error: Some(error), targets: vec![] }
    }

    /// Create a result from target outcomes.
    pub fn built(module_path: PathBuf, targets: Vec<BuildOutcome>) -> Self {
        Self { module_path, manifest_error: None, targets }
    }

    /// Check if the manifest was read and every target succeeded.
    pub fn is_success(&self) -> bool {
        self.manifest_error.is_none() && self.targets.iter().all(BuildOutcome::succeeded)
    }
}

/// A single failure, attributed to the module, target and step it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Module directory
    pub module_path: PathBuf,
    /// Target name, `None` when the manifest itself failed
    pub target_name: Option<String>,
    /// Step name (`manifest` for manifest failures)
    pub step: String,
    /// Human-readable cause
    pub cause: String,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.module_path.display())?;
        if let Some(target) = &self.target_name {
            write!(f, " [{}]", target)?;
        }
        write!(f, " {}: {}", self.step, self.cause)
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Results for each module, in input order
    pub modules: Vec<ModuleResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module result.
    pub fn add_module(&mut self, result: ModuleResult) {
        self.modules.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    pub fn modules_attempted(&self) -> usize {
        self.modules.len()
    }

    pub fn modules_succeeded(&self) -> usize {
        self.modules.iter().filter(|m| m.is_success()).count()
    }

    pub fn modules_failed(&self) -> usize {
        self.modules_attempted() - self.modules_succeeded()
    }

    pub fn targets_attempted(&self) -> usize {
        self.modules.iter().map(|m| m.targets.len()).sum()
    }

    pub fn targets_succeeded(&self) -> usize {
        self.targets().filter(|t| t.succeeded()).count()
    }

    pub fn targets_failed(&self) -> usize {
        self.targets_attempted() - self.targets_succeeded()
    }

    /// Iterate over every target outcome.
    pub fn targets(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.modules.iter().flat_map(|m| m.targets.iter())
    }

    /// Check if the overall run succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.modules.iter().all(ModuleResult::is_success)
    }

    /// Flatten every error into an attributed failure list.
    pub fn failures(&self) -> Vec<Failure> {
        let mut failures = Vec::new();

        for module in &self.modules {
            if let Some(err) = &module.manifest_error {
                failures.push(Failure {
                    module_path: module.module_path.clone(),
                    target_name: None,
                    step: "manifest".to_string(),
                    cause: err.to_string(),
                });
            }

            for target in &module.targets {
                for step in &target.steps {
                    for err in &step.errors {
                        failures.push(Failure {
                            module_path: module.module_path.clone(),
                            target_name: Some(target.target_name.clone()),
                            step: step.step.to_string(),
                            cause: err.to_string(),
                        });
                    }
                }
            }
        }

        failures
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let counts = format!(
            "modules: {} succeeded, {} failed ({} total); targets: {} succeeded, {} failed ({} total)",
            self.modules_succeeded(),
            self.modules_failed(),
            self.modules_attempted(),
            self.targets_succeeded(),
            self.targets_failed(),
            self.targets_attempted(),
        );

        if self.is_success() {
            lines.push(format!("Build succeeded in {:?} - {}", self.total_duration, counts));
        } else {
            lines.push(format!("Build failed - {}", counts));
            for failure in self.failures() {
                lines.push(format!("  - {}", failure));
            }
        }

        lines.join("\n")
    }
}
