//! Configuration module for the yui-build pipeline
//!
//! Provides types and parsing for `yuibuild.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
