//! Contract of the underlying table-format rewrite transaction.
//!
//! The rewrite coordinator never applies file changes itself. It forwards
//! them to a [`RewriteTransaction`] obtained from a [`RewriteTable`], which
//! owns snapshot validation and the metadata commit.

use crate::iceberg::files::{DataFileRef, DeleteFileRef};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A mutable rewrite handle on a table-format table.
///
/// Staging calls are infallible; every failure (validation conflict,
/// concurrent modification) surfaces from [`commit`](Self::commit).
///
/// After a successful commit, further [`add_data_file`](Self::add_data_file)
/// calls feed the post-commit publication channel (the hive-visible file
/// listing) rather than the committed snapshot.
#[async_trait]
pub trait RewriteTransaction: Send {
    /// Stage a data file to add.
    fn add_data_file(&mut self, file: DataFileRef);

    /// Stage a delete file to add.
    fn add_delete_file(&mut self, file: DeleteFileRef);

    /// Stage a data file to remove.
    fn delete_data_file(&mut self, file: DataFileRef);

    /// Stage a delete file to remove.
    fn delete_delete_file(&mut self, file: DeleteFileRef);

    /// Override the data sequence number for the whole rewrite.
    fn data_sequence_number(&mut self, sequence_number: i64);

    /// Validate the rewrite against changes made since the given snapshot.
    fn validate_from_snapshot(&mut self, snapshot_id: i64);

    /// Commit the staged changes.
    ///
    /// On success, returns the authoritative list of data files the commit added.
    async fn commit(&mut self) -> Result<RewriteCommit>;
}

/// A table that can hand out rewrite transactions.
pub trait RewriteTable {
    /// Transaction type produced by [`new_rewrite`](Self::new_rewrite).
    type Rewrite: RewriteTransaction;

    /// Start a new rewrite transaction.
    fn new_rewrite(&self) -> Self::Rewrite;

    /// Root of the table's hive (legacy directory) location.
    fn hive_location(&self) -> &str;

    /// Fully qualified table name.
    fn name(&self) -> String;
}

/// Result of a successful rewrite commit.
#[derive(Debug, Clone)]
pub struct RewriteCommit {
    /// The new snapshot ID
    pub snapshot_id: i64,
    /// Sequence number assigned to the snapshot
    pub sequence_number: i64,
    /// When the commit was made
    pub committed_at: DateTime<Utc>,
    /// Data files added by the commit
    pub data_files: Vec<DataFileRef>,
}
