// src/lib.rs

//! packsync
//!
//! Reconciles a deployed modpack installation with a release archive while
//! preserving user customizations. Stale managed content is removed
//! (protected configuration survives at any depth), the archive is
//! unpacked without overwriting anything already on disk, overlay
//! directories are merged on top, and content disallowed for the variant
//! is pruned.
//!
//! # Architecture
//!
//! - Engine-first: every reconciliation decision lives in [`engine`]; the
//!   surrounding modules are I/O plumbing (acquisition, persistence,
//!   progress, CLI)
//! - Non-destructive: a filesystem object that already exists is never
//!   overwritten, which makes re-running an interrupted update safe
//! - Policy as data: variant profiles supply managed paths, protection,
//!   denylist, and overlays; the engine hardcodes none of it

pub mod archive;
pub mod engine;
mod error;
pub mod fetch;
pub mod fsutil;
pub mod paths;
pub mod profile;
pub mod progress;
pub mod state;

pub use archive::ArchivePackage;
pub use engine::{
    ClassifierRoute, Denylist, MergeMode, Overlay, OverlayClassifier, ProtectedPaths,
    ReconcileOptions, ReconcilePlan, ReconcileResult, ReconcileState, Reconciler,
};
pub use error::{Error, Result};
pub use fetch::UpdateClient;
pub use profile::Profile;
pub use progress::{CliProgress, LogProgress, ProgressTracker, SilentProgress};
pub use state::StateFile;
