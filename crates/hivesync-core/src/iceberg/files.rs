//! Data and delete file references.
//!
//! Files are owned by the caller and shared by reference (`Arc`) with the
//! rewrite coordinator and the underlying transaction. Equality is structural,
//! so two references built from the same values compare equal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared reference to a data file.
pub type DataFileRef = Arc<DataFile>;

/// Shared reference to a delete file.
pub type DeleteFileRef = Arc<DeleteFile>;

/// Anything that lives at a storage path.
pub trait ContentFile {
    /// Full storage path of the file.
    fn path(&self) -> &str;
}

/// Physical file format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Parquet,
    Orc,
    Avro,
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Parquet => write!(f, "parquet"),
            FileFormat::Orc => write!(f, "orc"),
            FileFormat::Avro => write!(f, "avro"),
        }
    }
}

/// Kind of rows a delete file marks as removed.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeleteContent {
    /// Deletes by file path and row position
    #[default]
    Position,
    /// Deletes by equality on a set of field ids
    Equality,
}

/// A data file tracked by the table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct DataFile {
    /// File path in storage
    pub file_path: String,
    /// File format
    #[serde(default)]
    pub file_format: FileFormat,
    /// Partition values (empty for unpartitioned tables)
    #[serde(default)]
    pub partition_values: BTreeMap<String, String>,
    /// Number of records in the file
    #[serde(default)]
    pub record_count: u64,
    /// File size in bytes
    #[serde(default)]
    pub file_size_bytes: u64,
}

impl DataFile {
    /// Create a data file with only a path; other attributes take defaults.
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            file_format: FileFormat::default(),
            partition_values: BTreeMap::new(),
            record_count: 0,
            file_size_bytes: 0,
        }
    }

    /// Set the record count.
    pub fn with_record_count(mut self, record_count: u64) -> Self {
        self.record_count = record_count;
        self
    }

    /// Set the file size.
    pub fn with_file_size(mut self, file_size_bytes: u64) -> Self {
        self.file_size_bytes = file_size_bytes;
        self
    }

    /// Add a partition value.
    pub fn with_partition(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.partition_values.insert(field.into(), value.into());
        self
    }

    /// Wrap into a shared reference.
    pub fn into_ref(self) -> DataFileRef {
        Arc::new(self)
    }
}

impl ContentFile for DataFile {
    fn path(&self) -> &str {
        &self.file_path
    }
}

/// A delete file that marks rows of data files as removed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct DeleteFile {
    /// File path in storage
    pub file_path: String,
    /// Delete content kind
    #[serde(default)]
    pub content: DeleteContent,
    /// File format
    #[serde(default)]
    pub file_format: FileFormat,
    /// Partition values (empty for unpartitioned tables)
    #[serde(default)]
    pub partition_values: BTreeMap<String, String>,
    /// Field ids used for equality deletes
    #[serde(default)]
    pub equality_ids: Vec<i32>,
    /// Number of delete records in the file
    #[serde(default)]
    pub record_count: u64,
    /// File size in bytes
    #[serde(default)]
    pub file_size_bytes: u64,
}

impl DeleteFile {
    /// Create a position delete file.
    pub fn position(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: DeleteContent::Position,
            file_format: FileFormat::default(),
            partition_values: BTreeMap::new(),
            equality_ids: Vec::new(),
            record_count: 0,
            file_size_bytes: 0,
        }
    }

    /// Create an equality delete file over the given field ids.
    pub fn equality(file_path: impl Into<String>, equality_ids: Vec<i32>) -> Self {
        Self {
            content: DeleteContent::Equality,
            equality_ids,
            ..Self::position(file_path)
        }
    }

    /// Wrap into a shared reference.
    pub fn into_ref(self) -> DeleteFileRef {
        Arc::new(self)
    }
}

impl ContentFile for DeleteFile {
    fn path(&self) -> &str {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_file_builder() {
        let file = DataFile::new("s3://warehouse/db/t/a.parquet")
            .with_record_count(10)
            .with_file_size(2048)
            .with_partition("dt", "2024-01-01");

        assert_eq!(file.path(), "s3://warehouse/db/t/a.parquet");
        assert_eq!(file.record_count, 10);
        assert_eq!(file.file_size_bytes, 2048);
        assert_eq!(file.partition_values.get("dt").unwrap(), "2024-01-01");
        assert_eq!(file.file_format, FileFormat::Parquet);
    }

    #[test]
    fn test_equality_delete_file() {
        let file = DeleteFile::equality("/wh/t/eq-0.parquet", vec![1, 2]);
        assert_eq!(file.content, DeleteContent::Equality);
        assert_eq!(file.equality_ids, vec![1, 2]);
        assert_eq!(file.path(), "/wh/t/eq-0.parquet");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let file: DataFile = toml::from_str(r#"file_path = "/wh/t/a.orc"
file_format = "orc""#)
        .unwrap();
        assert_eq!(file.file_format, FileFormat::Orc);
        assert_eq!(file.record_count, 0);
        assert!(file.partition_values.is_empty());
    }

    #[test]
    fn test_file_format_display() {
        assert_eq!(FileFormat::Parquet.to_string(), "parquet");
        assert_eq!(FileFormat::Avro.to_string(), "avro");
    }
}
