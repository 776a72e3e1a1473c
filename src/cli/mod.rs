//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to the command
//! implementations in [`build`].

mod build;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_CONFIG_ERROR: u8 = 2;

/// yui-build - Build YUI modules into deployable bundles
#[derive(Parser)]
#[command(name = "yui-build")]
#[command(about = "Build YUI modules (directories with a build.json) into deployable bundles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build modules into the build directory
    Build(BuildArgs),

    /// Build once, then rebuild changed modules until interrupted
    Watch(BuildArgs),

    /// List the modules discovery would build
    Scan(ScanArgs),
}

/// Options shared by `build` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Build this single module directory
    #[arg(long)]
    pub module_path: Option<PathBuf>,

    /// Build these module directories instead of discovering them
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub module_list: Vec<PathBuf>,

    /// Destination root for generated output
    #[arg(short, long)]
    pub build_dir: Option<PathBuf>,

    /// Directory to discover modules under (default: current directory)
    #[arg(short, long)]
    pub start_path: Option<PathBuf>,

    /// Discover modules in the whole tree, not just immediate children
    #[arg(short, long)]
    pub recursive: bool,

    /// Verbose diagnostic output
    #[arg(short, long)]
    pub debug: bool,

    /// Number of parallel jobs (default: available parallelism)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Path to yuibuild.toml (default: search upward from the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep running and rebuild on changes
    #[arg(short, long)]
    pub watch: bool,
}

impl BuildArgs {
    /// Explicit modules from `--module-path` and `--module-list`, if any.
    pub fn explicit_modules(&self) -> Option<Vec<PathBuf>> {
        let modules: Vec<PathBuf> =
            self.module_path.iter().chain(self.module_list.iter()).cloned().collect();
        if modules.is_empty() {
            None
        } else {
            Some(modules)
        }
    }
}

/// Options for `scan`.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Directory to discover modules under (default: current directory)
    #[arg(short, long)]
    pub start_path: Option<PathBuf>,

    /// Discover modules in the whole tree, not just immediate children
    #[arg(short, long)]
    pub recursive: bool,

    /// Verbose diagnostic output
    #[arg(short, long)]
    pub debug: bool,

    /// Path to yuibuild.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default level.
fn setup_logging(debug: bool) {
    let filter = if debug { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .try_init();
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => {
            setup_logging(args.debug);
            build::run_build(&args)
        }
        Commands::Watch(args) => {
            setup_logging(args.debug);
            build::run_build(&BuildArgs { watch: true, ..args })
        }
        Commands::Scan(args) => {
            setup_logging(args.debug);
            build::run_scan(&args)
        }
    }
}
