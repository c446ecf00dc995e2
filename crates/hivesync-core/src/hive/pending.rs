//! Pending hive-located files of a rewrite.
//!
//! Accumulates, across staging calls, the data files that live in the hive
//! location. Entries are appended in call order and never deduplicated.

use crate::hive::classifier::LocationClassifier;
use crate::iceberg::DataFileRef;
use std::sync::Arc;
use tracing::debug;

/// Hive-located data files withheld until the rewrite commits.
#[derive(Debug)]
pub struct PendingFileSet {
    classifier: Arc<dyn LocationClassifier>,
    to_add: Vec<DataFileRef>,
    to_delete: Vec<DataFileRef>,
}

impl PendingFileSet {
    /// Create an empty set that classifies against `classifier`.
    pub fn new(classifier: Arc<dyn LocationClassifier>) -> Self {
        Self {
            classifier,
            to_add: Vec::new(),
            to_delete: Vec::new(),
        }
    }

    /// The classifier used for staging.
    pub fn classifier(&self) -> &dyn LocationClassifier {
        self.classifier.as_ref()
    }

    /// Append the hive-located candidates to the pending sets.
    pub fn stage(&mut self, add_candidates: &[DataFileRef], delete_candidates: &[DataFileRef]) {
        for file in add_candidates {
            if self.classifier.is_hive_located(&file.file_path) {
                debug!(path = %file.file_path, "Pending hive file add");
                self.to_add.push(Arc::clone(file));
            }
        }

        for file in delete_candidates {
            if self.classifier.is_hive_located(&file.file_path) {
                debug!(path = %file.file_path, "Pending hive file delete");
                self.to_delete.push(Arc::clone(file));
            }
        }
    }

    /// Hive-located files to add.
    pub fn to_add(&self) -> &[DataFileRef] {
        &self.to_add
    }

    /// Hive-located files to delete.
    pub fn to_delete(&self) -> &[DataFileRef] {
        &self.to_delete
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }

    /// Take both sets, leaving this one empty.
    pub fn take(&mut self) -> (Vec<DataFileRef>, Vec<DataFileRef>) {
        (
            std::mem::take(&mut self.to_add),
            std::mem::take(&mut self.to_delete),
        )
    }

    /// Drop everything pending.
    pub fn clear(&mut self) {
        self.to_add.clear();
        self.to_delete.clear();
    }
}
