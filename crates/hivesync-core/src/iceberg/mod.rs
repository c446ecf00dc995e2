//! Table-format side of a rewrite.
//!
//! This module provides:
//!
//! - Data and delete file references shared between caller and transaction
//! - The rewrite transaction contract the coordinator delegates to
//! - An in-memory table implementing that contract

mod files;
mod memory;
mod transaction;

pub use files::{
    ContentFile, DataFile, DataFileRef, DeleteContent, DeleteFile, DeleteFileRef, FileFormat,
};
pub use memory::{MemoryRewrite, MemoryTable, RewriteOp, Snapshot, SnapshotOperation};
pub use transaction::{RewriteCommit, RewriteTable, RewriteTransaction};
