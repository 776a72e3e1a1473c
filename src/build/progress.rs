//! Build progress reporting.
//!
//! User-facing progress output for a build run. Diagnostics go through
//! `tracing`; this module only renders the high-level lifecycle of a run.
//!
//! # Example
//!
//! ```ignore
//! use yui_build::build::progress::{ConsoleProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(ProgressEvent::BuildStarted { total_modules: 2 });
//! reporter.report(ProgressEvent::TargetCompleted {
//!     target_id: "src/widget:widget".to_string(),
//!     status: TargetStatus::Success,
//!     duration_ms: 15,
//! });
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Status of a target in progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// Every step succeeded
    Success,
    /// At least one step failed
    Failed(String),
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetStatus::Success => write!(f, "success"),
            TargetStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Events that can be reported during a build.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build run started
    BuildStarted {
        /// Number of modules to build
        total_modules: usize,
    },
    /// A module's manifest was read and its targets are building
    ModuleStarted {
        /// Module directory
        module: String,
        /// Number of targets in the manifest
        targets: usize,
    },
    /// A target finished all four steps
    TargetCompleted {
        /// Target identifier
        target_id: String,
        /// Build status
        status: TargetStatus,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// A module's manifest could not be read
    ModuleFailed {
        /// Module directory
        module: String,
        /// Error message
        message: String,
    },
    /// Build run completed
    BuildCompleted {
        /// Whether the overall build succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of successful targets
        succeeded: usize,
        /// Number of failed targets
        failed: usize,
        /// Number of modules whose manifest failed
        modules_failed: usize,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    verbose: bool,
    /// Targets completed so far
    completed: AtomicUsize,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .field("completed", &self.completed)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a reporter writing to stderr, colored when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            verbose: false,
            completed: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            verbose: false,
            completed: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn bold(&self, text: &str) -> String {
        self.color(text, "\x1b[1m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { total_modules } => {
                self.completed.store(0, Ordering::SeqCst);
                self.writeln(&format!(
                    "{} Building {}...",
                    self.cyan("[build]"),
                    plural(total_modules, "module")
                ));
            }
            ProgressEvent::ModuleStarted { module, targets } => {
                if self.verbose {
                    self.writeln(&format!(
                        "{} {} ({})",
                        self.cyan("[build]"),
                        module,
                        plural(targets, "target")
                    ));
                }
            }
            ProgressEvent::TargetCompleted { target_id, status, duration_ms } => {
                let current = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

                let status_str = match &status {
                    TargetStatus::Success => self.green("ok"),
                    TargetStatus::Failed(_) => self.red("FAILED"),
                };

                self.writeln(&format!(
                    "{} [{}] {} {} ({})",
                    self.cyan("[build]"),
                    current,
                    status_str,
                    target_id,
                    format_duration(duration_ms)
                ));

                if let TargetStatus::Failed(err) = status {
                    self.writeln(&format!("        {}", self.red(&err)));
                }
            }
            ProgressEvent::ModuleFailed { module, message } => {
                self.writeln(&format!("{} {}: {}", self.red("[error]"), module, message));
            }
            ProgressEvent::BuildCompleted {
                success,
                duration_ms,
                succeeded,
                failed,
                modules_failed,
            } => {
                let duration_str = format_duration(duration_ms);

                if success {
                    self.writeln(&format!(
                        "\n{} {} built in {}",
                        self.green("[done]"),
                        self.bold(&plural(succeeded, "target")),
                        duration_str
                    ));
                } else {
                    self.writeln(&format!(
                        "\n{} Build failed: {} succeeded, {}, {} in {}",
                        self.red("[error]"),
                        succeeded,
                        plural(failed, "failed target"),
                        plural(modules_failed, "unreadable manifest"),
                        duration_str
                    ));
                }
            }
        }
    }
}

/// Format a duration in milliseconds to a human-readable string.
pub(crate) fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}
