//! Build command implementations (build, watch, scan)

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use super::{BuildArgs, ScanArgs, EXIT_CONFIG_ERROR, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::progress::ConsoleProgress;
use crate::build::{discover_modules, BuildContext, BuildError, BuildPipeline};
use crate::config::{
    load_config, merge_cli_overrides, resolve_path, CliOverrides, ConfigError, YuiConfig,
};
use crate::watch::{watch_and_rebuild, WatchError, WatchOptions};

/// Load yuibuild.toml and apply command-line overrides.
fn load_merged_config(
    config_path: Option<&std::path::Path>,
    overrides: &CliOverrides,
) -> Result<(YuiConfig, PathBuf), ConfigError> {
    let cwd = env::current_dir()?;
    let mut config = load_config(config_path)?;
    merge_cli_overrides(&mut config, overrides);
    Ok((config, cwd))
}

/// Assemble the run context from the config file and `args`.
fn load_context(args: &BuildArgs) -> Result<(BuildContext, YuiConfig), ConfigError> {
    let overrides = CliOverrides {
        build_dir: args.build_dir.clone(),
        start_path: args.start_path.clone(),
        recursive: args.recursive.then_some(true),
        jobs: args.jobs,
    };
    let (config, cwd) = load_merged_config(args.config.as_deref(), &overrides)?;

    let context = BuildContext::from_config(&config, &cwd, args.explicit_modules())?
        .with_debug(args.debug);
    Ok((context, config))
}

/// Run the build command
pub fn run_build(args: &BuildArgs) -> ExitCode {
    let (context, config) = match load_context(args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    if args.watch {
        println!("Starting watch mode...");
        println!("Press Ctrl+C to stop");
        println!();

        return match watch_and_rebuild(WatchOptions::new(context, config.watch)) {
            Ok(()) => ExitCode::from(EXIT_SUCCESS),
            Err(WatchError::Build(BuildError::Config(e))) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_CONFIG_ERROR)
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    let debug = context.is_debug();
    let pipeline =
        BuildPipeline::new(context).with_reporter(ConsoleProgress::new().with_verbose(debug));

    match pipeline.build() {
        Ok(report) if report.is_success() => {
            println!("{}", report.summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(report) => {
            eprintln!("{}", report.summary());
            ExitCode::from(EXIT_ERROR)
        }
        Err(BuildError::Config(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the scan command
pub fn run_scan(args: &ScanArgs) -> ExitCode {
    let overrides = CliOverrides {
        start_path: args.start_path.clone(),
        recursive: args.recursive.then_some(true),
        ..Default::default()
    };
    let (config, cwd) = match load_merged_config(args.config.as_deref(), &overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let start_path = config
        .build
        .start_path
        .as_deref()
        .map(|p| resolve_path(&cwd, p))
        .unwrap_or(cwd);

    match discover_modules(&start_path, config.build.recursive) {
        Ok(modules) => {
            for module in modules {
                println!("{}", module.path.display());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
