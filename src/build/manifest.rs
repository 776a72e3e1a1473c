//! Module manifest reader.
//!
//! Every module carries a `build.json` describing one or more build targets:
//!
//! ```json
//! {
//!   "builds": {
//!     "widget": {
//!       "jsfiles": ["widget.js", "plugins.js"],
//!       "config": {
//!         "requires": ["node", "event"],
//!         "lang": ["fr", "de"]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Targets are returned in document order. A manifest that names the same
//! target twice is rejected instead of letting the later entry win.

use crate::build::{BuildTarget, TargetConfig, MANIFEST_FILENAME};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Error while reading a module manifest.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// No manifest file in the module directory
    #[error("manifest not found: {}", path.display())]
    Missing { path: PathBuf },
    /// The manifest is not a valid build document
    #[error("malformed manifest {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The manifest exists but could not be read
    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    builds: Builds,
}

/// A single entry of the `builds` map.
#[derive(Debug, Deserialize)]
struct BuildDefinition {
    jsfiles: Vec<String>,
    #[serde(default)]
    config: Option<TargetConfig>,
}

/// The `builds` map, kept as an ordered list of unique names.
#[derive(Debug, Default)]
struct Builds(Vec<(String, BuildDefinition)>);

impl<'de> Deserialize<'de> for Builds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BuildsVisitor;

        impl<'de> Visitor<'de> for BuildsVisitor {
            type Value = Builds;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of build target names to build definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Builds, A::Error> {
                let mut entries: Vec<(String, BuildDefinition)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));

                while let Some((name, definition)) = map.next_entry::<String, BuildDefinition>()? {
                    if name.is_empty() {
                        return Err(de::Error::custom("build target name must not be empty"));
                    }
                    if entries.iter().any(|(existing, _)| *existing == name) {
                        return Err(de::Error::custom(format!(
                            "duplicate build target '{}'",
                            name
                        )));
                    }
                    entries.push((name, definition));
                }

                Ok(Builds(entries))
            }
        }

        deserializer.deserialize_map(BuildsVisitor)
    }
}

/// Read and parse the manifest of the module at `module_path`.
pub fn read_manifest(module_path: &Path) -> Result<Vec<BuildTarget>, ManifestError> {
    let path = module_path.join(MANIFEST_FILENAME);
    let contents = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ManifestError::Missing { path: path.clone() }
        } else {
            ManifestError::Io { path: path.clone(), source }
        }
    })?;

    parse_manifest(&contents, module_path)
        .map_err(|source| ManifestError::Malformed { path, source })
}

/// Parse manifest text into build targets owned by `module_path`.
pub fn parse_manifest(
    contents: &str,
    module_path: &Path,
) -> Result<Vec<BuildTarget>, serde_json::Error> {
    let document: ManifestDocument = serde_json::from_str(contents)?;

    Ok(document
        .builds
        .0
        .into_iter()
        .map(|(name, definition)| BuildTarget {
            name,
            module_path: module_path.to_path_buf(),
            script_files: definition.jsfiles,
            config: definition.config.unwrap_or_default(),
        })
        .collect())
}
