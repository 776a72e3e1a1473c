//! Watch mode for automatic rebuilds on file changes
//!
//! Provides file system watching with debouncing for `yui-build watch` and
//! `yui-build build --watch`. Each debounced batch of changes is mapped to the
//! modules that own the changed files, and only those modules are rebuilt.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::build::progress::format_duration;
use crate::build::{
    is_module_dir, BuildContext, BuildError, BuildPipeline, BuildReport, MANIFEST_FILENAME,
};
use crate::config::schema::WatchConfig;

/// Module subfolders whose contents feed a build.
const SOURCE_DIRS: [&str; 4] = ["js", "lang", "assets", "css"];

/// Error during watch mode
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// The event channel closed
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Start path not found
    #[error("Start path not found: {}", .0.display())]
    StartPathNotFound(PathBuf),
    /// A rebuild could not start at all
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Tracks modules that failed their last build, for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    failing: HashSet<PathBuf>,
}

impl ErrorTracker {
    /// Create a new error tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the modules built in `report`; returns those that failed
    /// previously and succeeded now. Modules absent from the report keep
    /// their previous state.
    pub fn update(&mut self, report: &BuildReport) -> Vec<PathBuf> {
        let mut fixed = Vec::new();

        for module in &report.modules {
            if module.is_success() {
                if self.failing.remove(&module.module_path) {
                    fixed.push(module.module_path.clone());
                }
            } else {
                self.failing.insert(module.module_path.clone());
            }
        }

        fixed
    }

    /// Check if there are any tracked errors
    pub fn has_errors(&self) -> bool {
        !self.failing.is_empty()
    }

    /// Get the number of failing modules
    pub fn error_count(&self) -> usize {
        self.failing.len()
    }
}

/// Options for watch mode
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Context for every rebuild; its start path is the watched tree
    pub context: BuildContext,
    /// Watch configuration (debounce, clear screen)
    pub config: WatchConfig,
}

impl WatchOptions {
    pub fn new(context: BuildContext, config: WatchConfig) -> Self {
        Self { context, config }
    }
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Check if a changed path can affect a build.
///
/// Relevant paths are manifests and anything inside a `js`, `lang`,
/// `assets` or `css` folder below `start_path`. Dot-files and anything
/// inside `build_dir` are ignored.
pub fn is_relevant_path(start_path: &Path, build_dir: &Path, path: &Path) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    if name.to_string_lossy().starts_with('.') || path.starts_with(build_dir) {
        return false;
    }
    let Ok(rel) = path.strip_prefix(start_path) else {
        return false;
    };

    if name == MANIFEST_FILENAME {
        return true;
    }

    let parents: Vec<_> = rel.components().collect();
    parents
        .iter()
        .take(parents.len().saturating_sub(1))
        .any(|c| SOURCE_DIRS.iter().any(|dir| c.as_os_str() == *dir))
}

/// Find the module that owns `path`.
///
/// Walks up from `path` to `start_path` (inclusive) and returns the first
/// directory holding a manifest. Nothing above `start_path` is considered.
pub fn find_owning_module(start_path: &Path, path: &Path) -> Option<PathBuf> {
    if !path.starts_with(start_path) {
        return None;
    }

    for dir in path.ancestors() {
        if is_module_dir(dir) {
            return Some(dir.to_path_buf());
        }
        if dir == start_path {
            break;
        }
    }

    None
}

/// Map a batch of changed paths to the distinct modules they belong to,
/// sorted by path.
pub fn affected_modules<'a>(
    start_path: &Path,
    build_dir: &Path,
    paths: impl IntoIterator<Item = &'a Path>,
) -> Vec<PathBuf> {
    let modules: BTreeSet<PathBuf> = paths
        .into_iter()
        .filter(|p| is_relevant_path(start_path, build_dir, p))
        .filter_map(|p| find_owning_module(start_path, p))
        .collect();

    modules.into_iter().collect()
}

/// Rebuild `modules` (or everything when `None`) and print the outcome.
pub fn rebuild(
    context: &BuildContext,
    modules: Option<Vec<PathBuf>>,
    tracker: &mut ErrorTracker,
) -> Result<BuildReport, BuildError> {
    let context = match modules {
        Some(modules) => context.clone().with_modules(modules),
        None => context.clone(),
    };

    println!("[{}] Building...", timestamp());
    let report = BuildPipeline::new(context).build()?;

    let fixed = tracker.update(&report);
    print_report(&report, &fixed);
    Ok(report)
}

fn print_report(report: &BuildReport, fixed: &[PathBuf]) {
    for module in fixed {
        println!("[{}] Fixed: {}", timestamp(), module.display());
    }

    let duration = format_duration(report.total_duration.as_millis() as u64);
    if report.is_success() {
        println!(
            "[{}] Build complete ({}) - Modules: {} | Targets: {}",
            timestamp(),
            duration,
            report.modules_attempted(),
            report.targets_attempted()
        );
    } else {
        let failures = report.failures();
        println!(
            "[{}] Build failed ({}) - {} error{}",
            timestamp(),
            duration,
            failures.len(),
            if failures.len() == 1 { "" } else { "s" }
        );
        for failure in failures {
            eprintln!("[{}] Error: {}", timestamp(), failure);
        }
    }
}

/// Watch for file changes and rebuild automatically.
///
/// Runs one full build, then blocks rebuilding affected modules after each
/// debounced batch of changes until the event channel closes.
///
/// # Example
/// ```ignore
/// let options = WatchOptions::new(context, WatchConfig::default());
/// watch_and_rebuild(options)?;
/// ```
pub fn watch_and_rebuild(options: WatchOptions) -> Result<(), WatchError> {
    let start_path = options
        .context
        .start_path()
        .canonicalize()
        .map_err(|_| WatchError::StartPathNotFound(options.context.start_path().to_path_buf()))?;

    let build_dir = options.context.build_dir();
    if let Err(e) = std::fs::create_dir_all(build_dir) {
        tracing::warn!("cannot create {}: {}", build_dir.display(), e);
    }
    let build_dir = build_dir.canonicalize().unwrap_or_else(|_| build_dir.to_path_buf());

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer
        .watcher()
        .watch(&start_path, RecursiveMode::Recursive)
        .map_err(WatchError::WatchPath)?;

    let context = options.context.clone().with_start_path(&start_path);
    let mut tracker = ErrorTracker::new();

    if options.config.clear_screen {
        clear_screen();
    }
    rebuild(&context, None, &mut tracker)?;
    println!("[{}] Watching {} for changes...", timestamp(), start_path.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed = events
                    .iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path.as_path());
                let modules = affected_modules(&start_path, &build_dir, changed);
                if modules.is_empty() {
                    continue;
                }

                if options.config.clear_screen {
                    clear_screen();
                }
                for module in &modules {
                    println!("[{}] Changed: {}", timestamp(), module.display());
                }

                // Keep watching after a failed rebuild.
                if let Err(e) = rebuild(&context, Some(modules), &mut tracker) {
                    eprintln!("[{}] Error: {}", timestamp(), e);
                }
                println!("[{}] Watching {} for changes...", timestamp(), start_path.display());
            }
            Ok(Err(error)) => {
                tracing::warn!("watch error: {:?}", error);
            }
            Err(e) => {
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}
