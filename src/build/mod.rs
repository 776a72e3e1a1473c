//! Build pipeline for YUI modules
//!
//! Turns module directories (each holding a `build.json` manifest) into
//! deployable bundles under a build directory.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find module directories below a start path
//! - **Manifest**: Read each module's `build.json` into build targets
//! - **Steps**: For each target, bundle scripts, bundle locales, copy assets
//!   and merge skins, all concurrently
//! - **Report**: Collect every outcome into a [`BuildReport`]
//!
//! # Example
//!
//! ```ignore
//! use yui_build::build::{BuildContext, BuildPipeline};
//!
//! let context = BuildContext::new("build", "src").with_recursive(true);
//! let report = BuildPipeline::new(context).build()?;
//! println!("{}", report.summary());
//! ```

pub mod builder;
pub mod context;
pub mod discovery;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod steps;
pub mod target;

pub use builder::*;
pub use context::*;
pub use discovery::*;
pub use manifest::*;
pub use pipeline::*;
pub use result::*;
pub use target::*;
