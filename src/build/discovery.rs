//! Module discovery for the build system.
//!
//! Finds module directories (directories holding a `build.json`) below a
//! start path, either among its immediate children or by walking the whole
//! tree. Modules are never nested: once a directory is found to be a module,
//! nothing beneath it is visited.

use crate::build::{ModuleDescriptor, MANIFEST_FILENAME};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Error during module discovery.
///
/// Discovery stops at the first directory it cannot read; a partial module
/// list is never returned.
#[derive(Debug, thiserror::Error)]
#[error("failed to read directory {}: {source}", path.display())]
pub struct DiscoveryError {
    /// Directory (or entry) that could not be read
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl From<walkdir::Error> for DiscoveryError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();
        Self { path, source: io::Error::from(err) }
    }
}

/// Fail unless `start_path` is a readable directory.
fn check_start_path(start_path: &Path) -> Result<(), DiscoveryError> {
    let error = |source: io::Error| DiscoveryError { path: start_path.to_path_buf(), source };

    let meta = fs::metadata(start_path).map_err(error)?;
    if !meta.is_dir() {
        return Err(error(io::Error::new(ErrorKind::Other, "not a directory")));
    }
    Ok(())
}

/// Check if a directory is a module.
pub fn is_module_dir(path: &Path) -> bool {
    path.join(MANIFEST_FILENAME).is_file()
}

/// Discover modules below `start_path`.
///
/// In flat mode only the immediate children of `start_path` are checked. In
/// recursive mode the tree is walked depth-first, recording each directory
/// that holds a manifest and skipping its contents. The start path itself is
/// never reported. Entries within a directory are visited in file name order.
/// Symbolic links are followed; a link cycle is reported as an error.
pub fn discover_modules(
    start_path: &Path,
    recursive: bool,
) -> Result<Vec<ModuleDescriptor>, DiscoveryError> {
    check_start_path(start_path)?;

    let mut walker =
        WalkDir::new(start_path).min_depth(1).follow_links(true).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut modules = Vec::new();
    let mut entries = walker.into_iter();

    while let Some(entry) = entries.next() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        if is_module_dir(entry.path()) {
            tracing::debug!("found module {}", entry.path().display());
            modules.push(ModuleDescriptor::new(entry.path()));
            entries.skip_current_dir();
        }
    }

    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_module(root: &Path, rel: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILENAME), r#"{"builds": {}}"#).unwrap();
        dir
    }

    fn paths(modules: &[ModuleDescriptor]) -> Vec<PathBuf> {
        let mut paths: Vec<_> = modules.iter().map(|m| m.path.clone()).collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_flat_discovery_immediate_children() {
        let temp = TempDir::new().unwrap();
        let a = make_module(temp.path(), "a");
        let b = make_module(temp.path(), "b");
        make_module(temp.path(), "group/nested");
        fs::write(temp.path().join("readme.txt"), "not a module").unwrap();

        let modules = discover_modules(temp.path(), false).unwrap();
        assert_eq!(paths(&modules), vec![a, b]);
    }

    #[test]
    fn test_recursive_discovery_finds_nested() {
        let temp = TempDir::new().unwrap();
        let a = make_module(temp.path(), "a");
        let nested = make_module(temp.path(), "group/nested");
        let deep = make_module(temp.path(), "group/deeper/still/deep");

        let modules = discover_modules(temp.path(), true).unwrap();
        assert_eq!(paths(&modules), vec![a, deep, nested]);
    }

    #[test]
    fn test_recursive_discovery_stops_at_module() {
        let temp = TempDir::new().unwrap();
        let outer = make_module(temp.path(), "outer");
        make_module(temp.path(), "outer/inner");

        let modules = discover_modules(temp.path(), true).unwrap();
        assert_eq!(paths(&modules), vec![outer]);
    }

    #[test]
    fn test_start_path_not_reported() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MANIFEST_FILENAME), "{}").unwrap();

        let modules = discover_modules(temp.path(), true).unwrap();
        assert!(modules.is_empty());
    }

    #[test]
    fn test_manifest_directory_is_not_a_module() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("odd").join(MANIFEST_FILENAME)).unwrap();

        let modules = discover_modules(temp.path(), false).unwrap();
        assert!(modules.is_empty());
    }

    #[test]
    fn test_missing_start_path_errors() {
        let result = discover_modules(Path::new("/nonexistent/start/path"), false);
        let err = result.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/nonexistent/start/path"));
    }

    #[test]
    fn test_file_start_path_errors() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("notes.txt");
        fs::write(&file, "not a directory").unwrap();

        for recursive in [false, true] {
            let err = discover_modules(&file, recursive).unwrap_err();
            assert_eq!(err.path, file);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_module_is_discovered() {
        let temp = TempDir::new().unwrap();
        let real = make_module(temp.path(), "real/widget");
        let start = temp.path().join("start");
        fs::create_dir_all(start.join("group")).unwrap();
        std::os::unix::fs::symlink(&real, start.join("widget")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), start.join("group/linked")).unwrap();

        let flat = discover_modules(&start, false).unwrap();
        assert_eq!(paths(&flat), vec![start.join("widget")]);

        let recursive = discover_modules(&start, true).unwrap();
        assert_eq!(
            paths(&recursive),
            vec![start.join("group/linked/widget"), start.join("widget")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_aborts_recursive_discovery() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        make_module(temp.path(), "a");
        let locked = temp.path().join("locked");
        make_module(temp.path(), "locked/inner");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to a privileged user.
        let readable = fs::read_dir(&locked).is_ok();
        let result = discover_modules(temp.path(), true);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        let err = result.unwrap_err();
        assert_eq!(err.path, locked);
        assert_eq!(err.source.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_is_module_dir() {
        let temp = TempDir::new().unwrap();
        let module = make_module(temp.path(), "m");
        assert!(is_module_dir(&module));
        assert!(!is_module_dir(temp.path()));
    }
}
