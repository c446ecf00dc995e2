//! In-memory table used for dry runs and tests.
//!
//! Keeps the live data and delete files of a single table, its snapshot
//! history, and the hive-visible listing that rewrites publish to after they
//! commit. Validation is limited to what a rewrite needs: the base snapshot
//! must exist and every file being replaced must still be live.

use crate::iceberg::files::{DataFileRef, DeleteFileRef};
use crate::iceberg::transaction::{RewriteCommit, RewriteTable, RewriteTransaction};
use crate::{IcebergError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Snapshot operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOperation {
    Append,
    Replace,
}

/// A committed snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Snapshot ID
    pub snapshot_id: i64,
    /// Parent snapshot ID
    pub parent_id: Option<i64>,
    /// Sequence number of the snapshot
    pub sequence_number: i64,
    /// Operation that produced the snapshot
    pub operation: SnapshotOperation,
    /// When the snapshot was committed
    pub committed_at: DateTime<Utc>,
    /// Data files added
    pub added_data_files: usize,
    /// Data files removed
    pub removed_data_files: usize,
}

#[derive(Debug, Default)]
struct TableState {
    snapshots: Vec<Snapshot>,
    data_files: BTreeMap<String, DataFileRef>,
    delete_files: BTreeMap<String, DeleteFileRef>,
    last_sequence_number: i64,
    published: Vec<DataFileRef>,
}

impl TableState {
    fn current_snapshot_id(&self) -> Option<i64> {
        self.snapshots.last().map(|s| s.snapshot_id)
    }

    fn next_snapshot_id(&self) -> i64 {
        self.current_snapshot_id().map_or(1, |id| id + 1)
    }

    fn push_snapshot(
        &mut self,
        operation: SnapshotOperation,
        added_data_files: usize,
        removed_data_files: usize,
    ) -> Snapshot {
        self.last_sequence_number += 1;
        let snapshot = Snapshot {
            snapshot_id: self.next_snapshot_id(),
            parent_id: self.current_snapshot_id(),
            sequence_number: self.last_sequence_number,
            operation,
            committed_at: Utc::now(),
            added_data_files,
            removed_data_files,
        };
        self.snapshots.push(snapshot.clone());
        snapshot
    }
}

/// An in-memory table.
#[derive(Clone)]
pub struct MemoryTable {
    namespace: String,
    name: String,
    hive_location: String,
    state: Arc<RwLock<TableState>>,
}

impl MemoryTable {
    /// Create an empty table with the given hive location.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        hive_location: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            hive_location: hive_location.into(),
            state: Arc::new(RwLock::new(TableState::default())),
        }
    }

    /// Append data files in a new snapshot, returning its ID.
    pub fn append(&self, files: &[DataFileRef]) -> i64 {
        let mut state = self.state.write();
        for file in files {
            state
                .data_files
                .insert(file.file_path.clone(), Arc::clone(file));
        }
        state
            .push_snapshot(SnapshotOperation::Append, files.len(), 0)
            .snapshot_id
    }

    /// Current snapshot ID, if any snapshot exists.
    pub fn current_snapshot_id(&self) -> Option<i64> {
        self.state.read().current_snapshot_id()
    }

    /// Last assigned sequence number.
    pub fn last_sequence_number(&self) -> i64 {
        self.state.read().last_sequence_number
    }

    /// Snapshot history, oldest first.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.state.read().snapshots.clone()
    }

    /// Live data files ordered by path.
    pub fn data_files(&self) -> Vec<DataFileRef> {
        self.state.read().data_files.values().cloned().collect()
    }

    /// Live delete files ordered by path.
    pub fn delete_files(&self) -> Vec<DeleteFileRef> {
        self.state.read().delete_files.values().cloned().collect()
    }

    /// Files published after rewrites committed, in publication order.
    pub fn published_files(&self) -> Vec<DataFileRef> {
        self.state.read().published.clone()
    }
}

impl RewriteTable for MemoryTable {
    type Rewrite = MemoryRewrite;

    fn new_rewrite(&self) -> MemoryRewrite {
        MemoryRewrite::new(Arc::clone(&self.state))
    }

    fn hive_location(&self) -> &str {
        &self.hive_location
    }

    fn name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// A call received by a [`MemoryRewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOp {
    AddData(String),
    AddDelete(String),
    DeleteData(String),
    DeleteDelete(String),
    SequenceNumber(i64),
    ValidateFrom(i64),
    Commit,
    /// Data file added after commit
    Publish(String),
}

/// Rewrite transaction over a [`MemoryTable`].
pub struct MemoryRewrite {
    state: Arc<RwLock<TableState>>,
    ops: Vec<RewriteOp>,
    data_to_add: Vec<DataFileRef>,
    deletes_to_add: Vec<DeleteFileRef>,
    data_to_remove: Vec<DataFileRef>,
    deletes_to_remove: Vec<DeleteFileRef>,
    sequence_number: Option<i64>,
    base_snapshot_id: Option<i64>,
    committed: bool,
}

impl MemoryRewrite {
    fn new(state: Arc<RwLock<TableState>>) -> Self {
        Self {
            state,
            ops: Vec::new(),
            data_to_add: Vec::new(),
            deletes_to_add: Vec::new(),
            data_to_remove: Vec::new(),
            deletes_to_remove: Vec::new(),
            sequence_number: None,
            base_snapshot_id: None,
            committed: false,
        }
    }

    /// Every call received so far, in order.
    pub fn ops(&self) -> &[RewriteOp] {
        &self.ops
    }

    /// Paths of data files staged before commit.
    pub fn staged_data_files(&self) -> Vec<&str> {
        self.data_to_add
            .iter()
            .map(|f| f.file_path.as_str())
            .collect()
    }

    fn validate(&self, state: &TableState) -> Result<()> {
        if let Some(base) = self.base_snapshot_id {
            if !state.snapshots.iter().any(|s| s.snapshot_id == base) {
                return Err(IcebergError::SnapshotNotFound(base).into());
            }
        }

        for file in &self.data_to_remove {
            if !state.data_files.contains_key(&file.file_path) {
                return Err(IcebergError::ValidationConflict(format!(
                    "Data file to replace is no longer live: {}",
                    file.file_path
                ))
                .into());
            }
        }

        for file in &self.deletes_to_remove {
            if !state.delete_files.contains_key(&file.file_path) {
                return Err(IcebergError::ValidationConflict(format!(
                    "Delete file to replace is no longer live: {}",
                    file.file_path
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RewriteTransaction for MemoryRewrite {
    fn add_data_file(&mut self, file: DataFileRef) {
        if self.committed {
            self.ops.push(RewriteOp::Publish(file.file_path.clone()));
            self.state.write().published.push(file);
            return;
        }
        self.ops.push(RewriteOp::AddData(file.file_path.clone()));
        self.data_to_add.push(file);
    }

    fn add_delete_file(&mut self, file: DeleteFileRef) {
        self.ops.push(RewriteOp::AddDelete(file.file_path.clone()));
        self.deletes_to_add.push(file);
    }

    fn delete_data_file(&mut self, file: DataFileRef) {
        self.ops.push(RewriteOp::DeleteData(file.file_path.clone()));
        self.data_to_remove.push(file);
    }

    fn delete_delete_file(&mut self, file: DeleteFileRef) {
        self.ops.push(RewriteOp::DeleteDelete(file.file_path.clone()));
        self.deletes_to_remove.push(file);
    }

    fn data_sequence_number(&mut self, sequence_number: i64) {
        self.ops.push(RewriteOp::SequenceNumber(sequence_number));
        self.sequence_number = Some(sequence_number);
    }

    fn validate_from_snapshot(&mut self, snapshot_id: i64) {
        self.ops.push(RewriteOp::ValidateFrom(snapshot_id));
        self.base_snapshot_id = Some(snapshot_id);
    }

    async fn commit(&mut self) -> Result<RewriteCommit> {
        if self.committed {
            return Err(IcebergError::AlreadyCommitted.into());
        }
        self.ops.push(RewriteOp::Commit);

        let mut state = self.state.write();
        self.validate(&state)?;

        for file in &self.data_to_remove {
            state.data_files.remove(&file.file_path);
        }
        for file in &self.deletes_to_remove {
            state.delete_files.remove(&file.file_path);
        }
        for file in &self.data_to_add {
            state
                .data_files
                .insert(file.file_path.clone(), Arc::clone(file));
        }
        for file in &self.deletes_to_add {
            state
                .delete_files
                .insert(file.file_path.clone(), Arc::clone(file));
        }

        let snapshot = state.push_snapshot(
            SnapshotOperation::Replace,
            self.data_to_add.len(),
            self.data_to_remove.len(),
        );
        drop(state);
        self.committed = true;

        debug!(
            snapshot_id = snapshot.snapshot_id,
            added = snapshot.added_data_files,
            removed = snapshot.removed_data_files,
            "Committed in-memory rewrite"
        );

        Ok(RewriteCommit {
            snapshot_id: snapshot.snapshot_id,
            sequence_number: self.sequence_number.unwrap_or(snapshot.sequence_number),
            committed_at: snapshot.committed_at,
            data_files: self.data_to_add.clone(),
        })
    }
}
