//! The four generation steps run for every build target.
//!
//! Each step writes below `<build_dir>/<target>/` and touches a path set
//! disjoint from the other steps, so steps never need to coordinate:
//!
//! | step         | output                                         |
//! |--------------|------------------------------------------------|
//! | script       | `<target>.js`                                  |
//! | localization | `lang/<target>[_<locale>].js`                  |
//! | assets       | `assets/**` (verbatim copy, see below)         |
//! | skins        | `assets/skins/<skin>/<target>.css`             |
//!
//! The asset copy leaves out `skins/<skin>/<target>.css` only for skins the
//! merger writes, so a prebuilt sheet in a skin without inputs is still copied.
//!
//! Every output file is fully rendered in memory, written to a sibling
//! temporary file and renamed into place, so an interrupted run never leaves
//! a half-written bundle behind.

use crate::build::{BuildContext, BuildTarget, StepError, StepName, StepOutcome, SCRIPT_EXTENSION};
use crate::template::{LanguageWrapper, ModuleWrapper};
use rayon::prelude::*;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Run a single-error step body and wrap the result.
fn finish(step: StepName, result: Result<Vec<PathBuf>, StepError>) -> StepOutcome {
    match result {
        Ok(outputs) => StepOutcome::success(step, outputs),
        Err(err) => StepOutcome::failed(step, err),
    }
}

/// Split per-item results into an outcome carrying every error.
fn collect(step: StepName, results: Vec<Result<Option<PathBuf>, StepError>>) -> StepOutcome {
    let mut outcome = StepOutcome::success(step, vec![]);
    for result in results {
        match result {
            Ok(Some(path)) => outcome.outputs.push(path),
            Ok(None) => {}
            Err(err) => outcome.errors.push(err),
        }
    }
    outcome
}

/// Write `contents` to `path`, creating parent directories as needed.
///
/// The data lands in a temporary sibling first and is renamed over the
/// destination, replacing any previous output.
pub fn write_output(path: &Path, contents: &str) -> Result<(), StepError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StepError::io(parent, e))?;
    }

    let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents).map_err(|e| StepError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StepError::io(path, e))
}

/// Read a file that may legitimately be absent; absent reads as empty.
fn read_optional(path: &Path) -> Result<String, StepError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(StepError::io(path, e)),
    }
}

/// Check whether an optional input directory is present.
///
/// `Ok(false)` means the directory is absent by design; any other failure to
/// inspect it is returned so it is not mistaken for absence.
fn optional_dir(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(io::Error::new(ErrorKind::Other, "exists but is not a directory")),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// ============================================================================
// Script bundler
// ============================================================================

/// Concatenate the target's script files and wrap them in the module template.
///
/// Files are read from `<module>/js/` in manifest order and joined with a
/// trailing newline after each. Nothing is written unless every file reads.
pub fn bundle_scripts(target: &BuildTarget, ctx: &BuildContext) -> StepOutcome {
    finish(StepName::Script, bundle_scripts_inner(target, ctx))
}

fn bundle_scripts_inner(target: &BuildTarget, ctx: &BuildContext) -> Result<Vec<PathBuf>, StepError> {
    let content = concatenate_scripts(target)?;

    let rendered = ctx.templates().render_module(&ModuleWrapper {
        module_name: &target.name,
        version: ctx.version(),
        content: &content,
        requires: &target.config.requires,
    });

    let output = target.script_output(ctx.build_dir());
    write_output(&output, &rendered)?;
    tracing::debug!("wrote {}", output.display());

    Ok(vec![output])
}

/// Read and join the target's script files in declared order.
pub fn concatenate_scripts(target: &BuildTarget) -> Result<String, StepError> {
    let js_dir = target.js_dir();
    let mut content = String::new();

    for file in &target.script_files {
        let path = js_dir.join(file);
        tracing::debug!("reading {}", path.display());

        let text = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StepError::SourceFileMissing { path: path.clone() }
            } else {
                StepError::io(&path, e)
            }
        })?;

        content.push_str(&text);
        content.push('\n');
    }

    Ok(content)
}

// ============================================================================
// Localization bundler
// ============================================================================

/// Wrap each configured locale's strings in the language template.
///
/// Does nothing when the target declares no `lang` list. Otherwise every
/// declared locale plus the default locale is processed independently, and
/// every missing locale file is reported rather than only the first.
pub fn bundle_locales(target: &BuildTarget, ctx: &BuildContext) -> StepOutcome {
    let Some(locales) = target.locales() else {
        tracing::debug!("{}: no languages configured", target.name);
        return StepOutcome::success(StepName::Localization, vec![]);
    };

    let results = locales.par_iter().map(|locale| bundle_locale(target, ctx, locale)).collect();
    collect(StepName::Localization, results)
}

fn bundle_locale(
    target: &BuildTarget,
    ctx: &BuildContext,
    locale: &str,
) -> Result<Option<PathBuf>, StepError> {
    let stem = target.locale_stem(locale);
    let file_name = format!("{}.{}", stem, SCRIPT_EXTENSION);
    let source = target.lang_dir().join(&file_name);

    let strings = fs::read_to_string(&source).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            StepError::LocaleFileMissing { locale: locale.to_string(), path: source.clone() }
        } else {
            StepError::io(&source, e)
        }
    })?;

    let lang_module = format!("lang/{}", stem);
    let rendered = ctx.templates().render_language(&LanguageWrapper {
        lang_module: &lang_module,
        module_name: &target.name,
        version: ctx.version(),
        lang: locale,
        strings: &strings,
    });

    let output = target.out_dir(ctx.build_dir()).join("lang").join(&file_name);
    write_output(&output, &rendered)?;
    tracing::debug!("wrote {}", output.display());

    Ok(Some(output))
}

// ============================================================================
// Asset copier
// ============================================================================

/// Copy `<module>/assets` to `<build_dir>/<target>/assets`.
///
/// A module without an assets folder succeeds with no output. A skin's
/// `skins/<skin>/<target>.css` is left to the skin merger when that skin has
/// merge input, so the two steps never write the same file.
pub fn copy_assets(target: &BuildTarget, ctx: &BuildContext) -> StepOutcome {
    finish(StepName::Assets, copy_assets_inner(target, ctx))
}

fn copy_assets_inner(target: &BuildTarget, ctx: &BuildContext) -> Result<Vec<PathBuf>, StepError> {
    let source = target.assets_dir();
    let asset_error = |path: &Path, source: io::Error| StepError::AssetCopy {
        path: path.to_path_buf(),
        source,
    };

    if !optional_dir(&source).map_err(|e| asset_error(&source, e))? {
        tracing::debug!("{}: no assets folder", target.name);
        return Ok(vec![]);
    }

    let destination = target.out_dir(ctx.build_dir()).join("assets");
    let merged_skin = format!("{}.css", target.name);
    let core_present = has_content(&core_stylesheet(target));

    let skip = |rel: &Path| {
        merged_skin_name(rel, &merged_skin).is_some_and(|skin| {
            core_present || has_content(&skin_stylesheet(target, &skin.to_string_lossy()))
        })
    };

    copy_tree(&source, &destination, skip).map_err(|(path, e)| asset_error(&path, e))
}

/// Skin name of `rel` when it is `skins/<skin>/<file_name>` relative to the
/// assets folder.
fn merged_skin_name<'p>(rel: &'p Path, file_name: &str) -> Option<&'p OsStr> {
    let parts: Vec<_> = rel.components().collect();
    match parts.as_slice() {
        [Component::Normal(skins), Component::Normal(skin), Component::Normal(file)]
            if *skins == "skins" && *file == file_name =>
        {
            Some(*skin)
        }
        _ => None,
    }
}

/// True when `path` is a non-empty file, i.e. the merger reads rules from it.
fn has_content(path: &Path) -> bool {
    fs::metadata(path).map(|meta| meta.is_file() && meta.len() > 0).unwrap_or(false)
}

/// Recursively copy `source` into `destination`, creating directories as
/// needed and overwriting existing files. Files for which `skip` returns
/// true (given their path relative to `source`) are not copied.
///
/// Returns the files written, or the failing path with its error.
pub fn copy_tree<F>(
    source: &Path,
    destination: &Path,
    skip: F,
) -> Result<Vec<PathBuf>, (PathBuf, io::Error)>
where
    F: Fn(&Path) -> bool,
{
    fs::create_dir_all(destination).map_err(|e| (destination.to_path_buf(), e))?;

    let mut copied = Vec::new();
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| source.to_path_buf());
            (path, io::Error::from(e))
        })?;

        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = destination.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| (target.clone(), e))?;
        } else if !skip(rel) {
            fs::copy(entry.path(), &target).map_err(|e| (entry.path().to_path_buf(), e))?;
            copied.push(target);
        }
    }

    Ok(copied)
}

// ============================================================================
// Skin merger
// ============================================================================

/// Merge each skin's stylesheet with the module's core stylesheet.
///
/// For every directory under `<module>/assets/skins/`, writes the skin rules
/// followed by the core rules to `assets/skins/<skin>/<target>.css`. Skins
/// where both inputs are absent or empty produce nothing.
pub fn merge_skins(target: &BuildTarget, ctx: &BuildContext) -> StepOutcome {
    let skins_dir = target.skins_dir();

    let skins = match list_skins(&skins_dir) {
        Ok(skins) => skins,
        Err(source) => {
            return StepOutcome::failed(
                StepName::Skins,
                StepError::SkinList { path: skins_dir, source },
            )
        }
    };

    if skins.is_empty() {
        return StepOutcome::success(StepName::Skins, vec![]);
    }

    let core = match read_optional(&core_stylesheet(target)) {
        Ok(core) => core,
        Err(err) => return StepOutcome::failed(StepName::Skins, err),
    };

    let results = skins.par_iter().map(|skin| merge_skin(target, ctx, skin, &core)).collect();
    collect(StepName::Skins, results)
}

fn core_stylesheet(target: &BuildTarget) -> PathBuf {
    target.assets_dir().join(format!("{}-core.css", target.name))
}

fn skin_stylesheet(target: &BuildTarget, skin: &str) -> PathBuf {
    target.skins_dir().join(skin).join(format!("{}-skin.css", target.name))
}

/// List skin names: directory entries of `skins_dir`, sorted. A missing
/// skins folder yields an empty list.
fn list_skins(skins_dir: &Path) -> io::Result<Vec<String>> {
    if !optional_dir(skins_dir)? {
        return Ok(vec![]);
    }

    let mut skins = Vec::new();
    for entry in fs::read_dir(skins_dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            skins.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    skins.sort();
    Ok(skins)
}

fn merge_skin(
    target: &BuildTarget,
    ctx: &BuildContext,
    skin: &str,
    core: &str,
) -> Result<Option<PathBuf>, StepError> {
    tracing::debug!("{}: building skin {}", target.name, skin);

    let skin_rules = read_optional(&skin_stylesheet(target, skin))?;

    if skin_rules.is_empty() && core.is_empty() {
        return Ok(None);
    }

    let output = target
        .out_dir(ctx.build_dir())
        .join("assets")
        .join("skins")
        .join(skin)
        .join(format!("{}.css", target.name));

    let mut merged = skin_rules;
    merged.push_str(core);
    write_output(&output, &merged)?;

    Ok(Some(output))
}
