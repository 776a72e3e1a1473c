//! yui-build - Command-line tool for building YUI modules

use std::process::ExitCode;

use yui_build::cli;

fn main() -> ExitCode {
    cli::run()
}
