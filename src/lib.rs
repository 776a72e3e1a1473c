//! yui-build - Library for packaging YUI modules into deployable bundles
//!
//! This library provides functionality to:
//! - Discover module directories holding a `build.json` manifest
//! - Bundle scripts and localization files into wrapped YUI modules
//! - Copy module assets and merge skin stylesheets
//! - Rebuild affected modules when their sources change

pub mod build;
pub mod cli;
pub mod config;
pub mod template;
pub mod watch;
