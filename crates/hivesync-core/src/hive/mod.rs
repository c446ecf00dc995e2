//! Hive location handling for rewrites.
//!
//! Files written under a table's hive location are only registered in table
//! metadata after the metadata commit succeeds. This module provides:
//!
//! - Classification of file paths against the hive location
//! - Tracking of hive-located files across staging calls
//! - The rewrite coordinator that sequences staging, commit and publication

mod classifier;
mod pending;
mod rewrite;

pub use classifier::{
    is_hive_located, AncestorClassifier, ClassifierMode, HiveLocation, LocationClassifier,
    SubstringClassifier,
};
pub use pending::PendingFileSet;
pub use rewrite::{
    CommitOutcome, HiveRewriteCoordinator, RewriteFiles, RewriteState, RewriteStats,
};
