// src/engine/mod.rs

//! Reconciliation engine
//!
//! Reconciles an installation tree with a release archive while preserving
//! protected user content. The orchestrator runs the stages strictly in
//! sequence; each stage observes the exact filesystem state left by the
//! previous one.
//!
//! # Lifecycle
//!
//! ```text
//! Pending -> Removing -> Extracting -> Merging(0..n) -> Classifying -> Done
//!                                                                   \-> Failed
//! ```
//!
//! Transitions are strictly forward with no retries; `Failed` is terminal
//! and freezes the result at whatever partial progress was recorded. The
//! tree may then be in a partially reconciled state, and the caller is
//! expected to re-run reconciliation, which is safe because every stage is
//! idempotent with respect to content that already exists.

mod classify;
mod extract;
mod overlay;
mod protect;
mod remove;

pub use classify::Denylist;
pub use overlay::{ClassifierRoute, MergeMode, Overlay, OverlayClassifier};
pub use protect::ProtectedPaths;

use crate::archive::ArchivePackage;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Phases of one reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileState {
    /// Run created, no changes made
    Pending,
    /// Deleting stale managed content
    Removing,
    /// Unpacking the release archive
    Extracting,
    /// Merging the i-th overlay
    Merging(usize),
    /// Pruning disallowed content
    Classifying,
    /// Run complete
    Done,
    /// Run aborted; partial progress is frozen in the result
    Failed,
}

impl ReconcileState {
    /// True once the run can no longer make progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Outcome record for one reconciliation run
///
/// Path lists are tree-relative. The accumulator is threaded through every
/// stage; there is no shared mutable global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Paths deleted by the remover, stale-settings purges, and discards
    pub removed: Vec<PathBuf>,
    /// Archive entries materialized into the tree
    pub extracted: Vec<PathBuf>,
    /// Archive and overlay entries skipped because the destination existed
    pub skipped: Vec<PathBuf>,
    /// Overlay entries transferred into the tree
    pub merged: Vec<PathBuf>,
    /// Entries removed by the denylist classifier
    pub denied: Vec<PathBuf>,
}

impl ReconcileResult {
    /// Fold another partial result into this one
    pub fn merge(&mut self, other: ReconcileResult) {
        self.removed.extend(other.removed);
        self.extracted.extend(other.extracted);
        self.skipped.extend(other.skipped);
        self.merged.extend(other.merged);
        self.denied.extend(other.denied);
    }

    /// Total number of recorded operations across all categories
    pub fn total_operations(&self) -> usize {
        self.removed.len()
            + self.extracted.len()
            + self.skipped.len()
            + self.merged.len()
            + self.denied.len()
    }
}

/// Everything one run needs to know, supplied as data per variant
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// Top-level tree paths this run is authorized to fully replace
    pub managed: Vec<String>,
    /// Path suffixes that must survive removal
    pub protected: ProtectedPaths,
    /// Overlays merged after extraction, in order
    pub overlays: Vec<Overlay>,
    /// Name-prefix denylist applied to the content directory
    pub denylist: Denylist,
    /// The managed content directory the denylist applies to
    pub content_dir: PathBuf,
    /// Tree-relative paths removed unconditionally during classification
    pub discard: Vec<String>,
}

/// Options for controlling a reconciliation run
#[derive(Default)]
pub struct ReconcileOptions {
    /// Progress tracker receiving one tick per stage
    pub progress: Option<Arc<dyn ProgressTracker>>,
}

/// Sequences the reconciliation stages against one installation tree
///
/// The tree is treated as exclusively owned for the duration of the run;
/// concurrent invocation against the same tree is the caller's problem to
/// prevent (e.g. with a single-instance lock).
pub struct Reconciler {
    root: PathBuf,
    plan: ReconcilePlan,
    state: ReconcileState,
    result: ReconcileResult,
}

impl Reconciler {
    /// Create a run for the tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>, plan: ReconcilePlan) -> Self {
        Self {
            root: root.into(),
            plan,
            state: ReconcileState::Pending,
            result: ReconcileResult::default(),
        }
    }

    /// Current phase of the run
    pub fn state(&self) -> ReconcileState {
        self.state
    }

    /// Partial or final result recorded so far
    pub fn result(&self) -> &ReconcileResult {
        &self.result
    }

    /// Consume the run, yielding whatever result was recorded
    pub fn into_result(self) -> ReconcileResult {
        self.result
    }

    /// Run all stages: remove stale content, extract the archive, merge
    /// each overlay in order, then classify. The archive is consumed; its
    /// backing file is deleted once extraction finishes cleanly.
    ///
    /// On failure the state freezes at `Failed` with the partial result
    /// still readable through [`Reconciler::result`]. No rollback is
    /// attempted.
    pub fn run(
        &mut self,
        archive: ArchivePackage,
        options: &ReconcileOptions,
    ) -> Result<ReconcileResult> {
        if self.state != ReconcileState::Pending {
            return Err(Error::InitError(
                "reconciliation already ran against this tree".to_string(),
            ));
        }

        match self.run_stages(archive, options) {
            Ok(()) => {
                self.state = ReconcileState::Done;
                if let Some(progress) = &options.progress {
                    progress.finish_with_message("reconciliation complete");
                }
                info!(
                    "reconciliation of {} complete: {} operations",
                    self.root.display(),
                    self.result.total_operations()
                );
                Ok(self.result.clone())
            }
            Err(e) => {
                self.state = ReconcileState::Failed;
                if let Some(progress) = &options.progress {
                    progress.finish_with_error(&e.to_string());
                }
                Err(e)
            }
        }
    }

    fn run_stages(&mut self, archive: ArchivePackage, options: &ReconcileOptions) -> Result<()> {
        let progress = options.progress.as_deref();
        let step = |message: &str| {
            if let Some(p) = progress {
                p.set_message(message);
            }
        };
        let tick = || {
            if let Some(p) = progress {
                p.increment(1);
            }
        };

        // remove + extract + classify, plus one step per overlay
        if let Some(p) = progress {
            p.set_length(3 + self.plan.overlays.len() as u64);
        }

        self.state = ReconcileState::Removing;
        step("Removing stale content");
        remove::remove_managed(
            &self.root,
            &self.plan.managed,
            &self.plan.protected,
            &mut self.result,
        )?;
        tick();

        self.state = ReconcileState::Extracting;
        step("Extracting release archive");
        extract::extract_into(&archive, &self.root, &mut self.result)?;
        archive.cleanup()?;
        tick();

        for (i, overlay) in self.plan.overlays.iter().enumerate() {
            self.state = ReconcileState::Merging(i);
            let name = overlay
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| overlay.source.display().to_string());
            step(&format!("Merging overlay {}", name));
            overlay::merge_overlay(overlay, &self.root, &mut self.result)?;
            tick();
        }

        self.state = ReconcileState::Classifying;
        step("Pruning disallowed content");
        classify::prune_disallowed(
            &self.root,
            &self.plan.content_dir,
            &self.plan.denylist,
            &mut self.result,
        )?;
        classify::discard_paths(&self.root, &self.plan.discard, &mut self.result)?;
        tick();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_terminality() {
        assert!(ReconcileState::Done.is_terminal());
        assert!(ReconcileState::Failed.is_terminal());
        assert!(!ReconcileState::Pending.is_terminal());
        assert!(!ReconcileState::Merging(2).is_terminal());
    }

    #[test]
    fn test_result_merge_and_totals() {
        let mut a = ReconcileResult {
            removed: vec!["config/Bar.cfg".into()],
            extracted: vec!["mods/a.jar".into()],
            ..Default::default()
        };
        let b = ReconcileResult {
            skipped: vec!["mods/a.jar".into()],
            merged: vec!["mods/b.jar".into()],
            denied: vec!["mods/OptiFine.jar".into()],
            ..Default::default()
        };

        a.merge(b);
        assert_eq!(a.total_operations(), 5);
        assert_eq!(a.merged, vec![std::path::PathBuf::from("mods/b.jar")]);
    }
}
