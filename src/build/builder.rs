//! Target builder.
//!
//! Runs the four generation steps for one target concurrently and folds
//! their outcomes into a [`BuildOutcome`]. A failing step never stops its
//! siblings.

use crate::build::steps::{bundle_locales, bundle_scripts, copy_assets, merge_skins};
use crate::build::{BuildContext, BuildOutcome, BuildTarget};
use std::time::Instant;

/// Builds individual targets against one run's context.
#[derive(Debug, Clone, Copy)]
pub struct TargetBuilder<'a> {
    context: &'a BuildContext,
}

impl<'a> TargetBuilder<'a> {
    pub fn new(context: &'a BuildContext) -> Self {
        Self { context }
    }

    /// Build one target.
    ///
    /// The returned outcome lists the steps in reporting order (script,
    /// localization, assets, skins) whatever order they finished in.
    pub fn build(&self, target: &BuildTarget) -> BuildOutcome {
        let start = Instant::now();
        let ctx = self.context;

        tracing::debug!("building {}", target.id());

        let ((script, localization), (assets, skins)) = rayon::join(
            || rayon::join(|| bundle_scripts(target, ctx), || bundle_locales(target, ctx)),
            || rayon::join(|| copy_assets(target, ctx), || merge_skins(target, ctx)),
        );

        let outcome = BuildOutcome {
            target_name: target.name.clone(),
            module_path: target.module_path.clone(),
            steps: vec![script, localization, assets, skins],
            duration: start.elapsed(),
        };

        if outcome.succeeded() {
            tracing::info!(
                "built {} ({} files) in {:?}",
                target.id(),
                outcome.outputs().len(),
                outcome.duration
            );
        } else {
            for step in outcome.steps.iter().filter(|s| !s.is_success()) {
                for err in &step.errors {
                    tracing::warn!("{} {}: {}", target.id(), step.step, err);
                }
            }
        }

        outcome
    }
}
