//! Hive-location-aware rewrite coordination.
//!
//! Wraps a table-format [`RewriteTransaction`] and decides, per data file,
//! whether it is staged into the transaction right away or withheld because it
//! lives in the hive location. Withheld files only become visible once the
//! underlying commit has succeeded, via [`HiveRewriteCoordinator::on_committed`].
//!
//! Lifecycle:
//!
//! ```text
//! Open ──commit()──> CommitRequested ──ok──> Committed
//!   │                       └────────err──> Failed
//!   └──on_committed()──────────────────────> Committed
//! ```
//!
//! A coordinator is single-use. Once committed or failed, every further call
//! returns [`RewriteError::InvalidState`].

use crate::hive::classifier::{ClassifierMode, HiveLocation, LocationClassifier};
use crate::hive::pending::PendingFileSet;
use crate::iceberg::{DataFileRef, DeleteFileRef, RewriteTable, RewriteTransaction};
use crate::{Result, RewriteError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Staging operations of a file rewrite.
///
/// Every method returns the rewrite itself so calls chain with `?`.
pub trait RewriteFiles {
    /// Replace `to_delete` with `to_add`.
    fn rewrite_files(
        &mut self,
        to_delete: &[DataFileRef],
        to_add: &[DataFileRef],
    ) -> Result<&mut Self>;

    /// Replace `to_delete` with `to_add`, overriding the data sequence number.
    fn rewrite_files_at_sequence(
        &mut self,
        to_delete: &[DataFileRef],
        to_add: &[DataFileRef],
        sequence_number: i64,
    ) -> Result<&mut Self>;

    /// Replace data and delete files in one step.
    fn rewrite_files_with_deletes(
        &mut self,
        data_files_to_replace: &[DataFileRef],
        delete_files_to_replace: &[DeleteFileRef],
        data_files_to_add: &[DataFileRef],
        delete_files_to_add: &[DeleteFileRef],
    ) -> Result<&mut Self>;

    /// Validate the rewrite against changes made since `snapshot_id`.
    fn validate_from_snapshot(&mut self, snapshot_id: i64) -> Result<&mut Self>;
}

/// Lifecycle state of a rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteState {
    /// Accepting staging calls
    Open,
    /// Underlying commit in progress
    CommitRequested,
    /// Committed and published
    Committed,
    /// Underlying commit failed
    Failed,
}

impl fmt::Display for RewriteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteState::Open => write!(f, "open"),
            RewriteState::CommitRequested => write!(f, "commit-requested"),
            RewriteState::Committed => write!(f, "committed"),
            RewriteState::Failed => write!(f, "failed"),
        }
    }
}

/// Counters for a single rewrite.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteStats {
    /// Staging calls accepted
    pub rewrite_calls: u64,
    /// Data files forwarded as adds before commit
    pub data_files_added: u64,
    /// Delete files forwarded as adds
    pub delete_files_added: u64,
    /// Data files forwarded as deletes
    pub data_files_deleted: u64,
    /// Delete files forwarded as deletes
    pub delete_files_deleted: u64,
    /// Hive-located data file adds withheld until commit
    pub hive_files_deferred: u64,
    /// Hive-located data file deletes recorded
    pub hive_files_pending_delete: u64,
    /// Files re-added after commit
    pub republished: u64,
}

/// Outcome of [`HiveRewriteCoordinator::commit`].
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// The new snapshot ID
    pub snapshot_id: i64,
    /// Sequence number of the new snapshot
    pub sequence_number: i64,
    /// When the commit was made
    pub committed_at: DateTime<Utc>,
    /// Number of files re-added after commit
    pub republished: usize,
    /// Hive-located files that became visible
    pub hive_files_added: Vec<String>,
    /// Hive-located files that were removed
    pub hive_files_removed: Vec<String>,
}

/// Rewrite that defers hive-located data files until commit.
pub struct HiveRewriteCoordinator<T: RewriteTransaction> {
    /// Underlying table-format transaction
    delegate: T,
    /// Hive-located files seen so far
    pending: PendingFileSet,
    /// Lifecycle state
    state: RewriteState,
    /// Counters
    stats: RewriteStats,
    /// Table name for logging
    table_name: String,
}

impl<T: RewriteTransaction> HiveRewriteCoordinator<T> {
    /// Create a coordinator over `delegate`.
    pub fn new(delegate: T, classifier: Arc<dyn LocationClassifier>) -> Self {
        Self {
            delegate,
            pending: PendingFileSet::new(classifier),
            state: RewriteState::Open,
            stats: RewriteStats::default(),
            table_name: String::new(),
        }
    }

    /// Start a rewrite on `table`, classifying against its hive location.
    pub fn for_table<R>(table: &R, mode: ClassifierMode) -> Result<Self>
    where
        R: RewriteTable<Rewrite = T>,
    {
        let location = HiveLocation::new(table.hive_location())?;
        debug!(
            table = %table.name(),
            hive_location = %location,
            mode = ?mode,
            "Starting hive rewrite"
        );
        Ok(Self::new(table.new_rewrite(), mode.classifier(location)).with_table_name(table.name()))
    }

    /// Set the table name used in log records.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RewriteState {
        self.state
    }

    /// Hive-located files withheld so far.
    pub fn pending(&self) -> &PendingFileSet {
        &self.pending
    }

    /// Counters.
    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }

    /// The underlying transaction.
    pub fn delegate(&self) -> &T {
        &self.delegate
    }

    /// Consume the coordinator, returning the underlying transaction.
    pub fn into_delegate(self) -> T {
        self.delegate
    }

    fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.state != RewriteState::Open {
            return Err(RewriteError::InvalidState {
                operation,
                state: self.state,
            }
            .into());
        }
        Ok(())
    }

    fn is_hive_located(&self, file: &DataFileRef) -> bool {
        self.pending.classifier().is_hive_located(&file.file_path)
    }

    /// Forward deletes and non-hive adds, then record the hive-located files.
    fn stage_data_files(&mut self, to_delete: &[DataFileRef], to_add: &[DataFileRef]) {
        for file in to_delete {
            self.delegate.delete_data_file(Arc::clone(file));
            self.stats.data_files_deleted += 1;
        }

        for file in to_add {
            if self.is_hive_located(file) {
                debug!(path = %file.file_path, "Deferring hive file until commit");
                continue;
            }
            self.delegate.add_data_file(Arc::clone(file));
            self.stats.data_files_added += 1;
        }

        let adds_before = self.pending.to_add().len();
        let deletes_before = self.pending.to_delete().len();
        self.pending.stage(to_add, to_delete);
        self.stats.hive_files_deferred += (self.pending.to_add().len() - adds_before) as u64;
        self.stats.hive_files_pending_delete +=
            (self.pending.to_delete().len() - deletes_before) as u64;
        self.stats.rewrite_calls += 1;
    }

    /// Publish the committed data files through the underlying transaction.
    ///
    /// Every file in `committed` is added to the transaction a second time,
    /// which feeds its post-commit publication channel. The list is trusted as
    /// given; the pending set is not consulted.
    pub fn on_committed(&mut self, committed: &[DataFileRef]) -> Result<()> {
        if !matches!(
            self.state,
            RewriteState::Open | RewriteState::CommitRequested
        ) {
            return Err(RewriteError::InvalidState {
                operation: "publish committed files",
                state: self.state,
            }
            .into());
        }

        for file in committed {
            self.delegate.add_data_file(Arc::clone(file));
        }
        self.stats.republished += committed.len() as u64;
        self.state = RewriteState::Committed;

        info!(
            table = %self.table_name,
            files = committed.len(),
            "Published committed files"
        );
        Ok(())
    }

    /// Record that the underlying commit failed. Pending files are discarded.
    pub fn mark_failed(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            RewriteState::Open | RewriteState::CommitRequested
        ) {
            return Err(RewriteError::InvalidState {
                operation: "mark failed",
                state: self.state,
            }
            .into());
        }
        self.pending.clear();
        self.state = RewriteState::Failed;
        Ok(())
    }

    /// Commit the underlying transaction and publish the committed files.
    ///
    /// The published list is the pending hive-located adds followed by the
    /// data files the underlying commit reports. On failure the error is
    /// returned unchanged and nothing is published.
    pub async fn commit(&mut self) -> Result<CommitOutcome> {
        self.ensure_open("commit")?;
        self.state = RewriteState::CommitRequested;

        let commit = match self.delegate.commit().await {
            Ok(commit) => commit,
            Err(e) => {
                warn!(
                    table = %self.table_name,
                    error = %e,
                    pending_hive_files = self.pending.to_add().len(),
                    "Rewrite commit failed, discarding pending hive files"
                );
                self.pending.clear();
                self.state = RewriteState::Failed;
                return Err(e);
            }
        };

        let (hive_adds, hive_deletes) = self.pending.take();
        let hive_files_added: Vec<String> =
            hive_adds.iter().map(|f| f.file_path.clone()).collect();
        let hive_files_removed: Vec<String> =
            hive_deletes.iter().map(|f| f.file_path.clone()).collect();

        let mut committed = hive_adds;
        committed.extend(commit.data_files);
        self.on_committed(&committed)?;

        info!(
            table = %self.table_name,
            snapshot_id = commit.snapshot_id,
            sequence_number = commit.sequence_number,
            hive_files_added = hive_files_added.len(),
            hive_files_removed = hive_files_removed.len(),
            "Hive rewrite committed"
        );

        Ok(CommitOutcome {
            snapshot_id: commit.snapshot_id,
            sequence_number: commit.sequence_number,
            committed_at: commit.committed_at,
            republished: committed.len(),
            hive_files_added,
            hive_files_removed,
        })
    }
}

impl<T: RewriteTransaction> RewriteFiles for HiveRewriteCoordinator<T> {
    fn rewrite_files(
        &mut self,
        to_delete: &[DataFileRef],
        to_add: &[DataFileRef],
    ) -> Result<&mut Self> {
        self.ensure_open("rewrite files")?;
        self.stage_data_files(to_delete, to_add);
        Ok(self)
    }

    fn rewrite_files_at_sequence(
        &mut self,
        to_delete: &[DataFileRef],
        to_add: &[DataFileRef],
        sequence_number: i64,
    ) -> Result<&mut Self> {
        self.ensure_open("rewrite files")?;
        self.delegate.data_sequence_number(sequence_number);
        self.stage_data_files(to_delete, to_add);
        Ok(self)
    }

    fn rewrite_files_with_deletes(
        &mut self,
        data_files_to_replace: &[DataFileRef],
        delete_files_to_replace: &[DeleteFileRef],
        data_files_to_add: &[DataFileRef],
        delete_files_to_add: &[DeleteFileRef],
    ) -> Result<&mut Self> {
        self.ensure_open("rewrite files")?;

        for file in delete_files_to_replace {
            self.delegate.delete_delete_file(Arc::clone(file));
            self.stats.delete_files_deleted += 1;
        }
        // Delete files are never classified against the hive location.
        for file in delete_files_to_add {
            self.delegate.add_delete_file(Arc::clone(file));
            self.stats.delete_files_added += 1;
        }
        self.stage_data_files(data_files_to_replace, data_files_to_add);
        Ok(self)
    }

    fn validate_from_snapshot(&mut self, snapshot_id: i64) -> Result<&mut Self> {
        self.ensure_open("validate from snapshot")?;
        self.delegate.validate_from_snapshot(snapshot_id);
        Ok(self)
    }
}
