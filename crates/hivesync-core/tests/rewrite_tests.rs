//! End-to-end rewrite tests against the in-memory table.

use hivesync_core::hive::{ClassifierMode, HiveRewriteCoordinator, RewriteFiles, RewriteState};
use hivesync_core::iceberg::{
    DataFile, DataFileRef, DeleteFile, MemoryRewrite, MemoryTable, RewriteOp, RewriteTable,
    RewriteTransaction,
};
use hivesync_core::{Error, IcebergError};

fn file(path: &str) -> DataFileRef {
    DataFile::new(path).with_record_count(100).into_ref()
}

fn table() -> MemoryTable {
    MemoryTable::new("db", "t1", "/wh/t1")
}

fn coordinator(table: &MemoryTable) -> HiveRewriteCoordinator<MemoryRewrite> {
    HiveRewriteCoordinator::for_table(table, ClassifierMode::Substring).unwrap()
}

fn paths(files: &[DataFileRef]) -> Vec<&str> {
    files.iter().map(|f| f.file_path.as_str()).collect()
}

#[test]
fn test_hive_files_withheld_from_immediate_adds() {
    let table = table();
    let mut rewrite = coordinator(&table);

    rewrite
        .rewrite_files(&[], &[file("/wh/t1/a.parquet"), file("/ext/b.parquet")])
        .unwrap();

    assert_eq!(rewrite.delegate().staged_data_files(), vec!["/ext/b.parquet"]);
    assert_eq!(paths(rewrite.pending().to_add()), vec!["/wh/t1/a.parquet"]);
    assert!(rewrite.pending().to_delete().is_empty());
}

#[tokio::test]
async fn test_commit_republishes_full_committed_list() {
    let table = table();
    let mut rewrite = coordinator(&table);
    rewrite
        .rewrite_files(&[], &[file("/wh/t1/a.parquet"), file("/ext/b.parquet")])
        .unwrap();

    let outcome = rewrite.commit().await.unwrap();

    assert_eq!(outcome.republished, 2);
    assert_eq!(outcome.hive_files_added, vec!["/wh/t1/a.parquet"]);
    assert_eq!(
        paths(&table.published_files()),
        vec!["/wh/t1/a.parquet", "/ext/b.parquet"]
    );
    assert_eq!(rewrite.state(), RewriteState::Committed);

    // The hive file never reached the pre-commit add stream.
    let ops = rewrite.delegate().ops();
    assert!(!ops.contains(&RewriteOp::AddData("/wh/t1/a.parquet".into())));
    let publishes = ops
        .iter()
        .filter(|op| **op == RewriteOp::Publish("/wh/t1/a.parquet".into()))
        .count();
    assert_eq!(publishes, 1);
}

#[tokio::test]
async fn test_conflicting_commit_publishes_nothing() {
    let table = table();
    let base = table.append(&[file("/wh/t1/x.parquet")]);

    let mut rewrite = coordinator(&table);
    rewrite
        .validate_from_snapshot(base)
        .unwrap()
        .rewrite_files(
            &[file("/wh/t1/x.parquet")],
            &[file("/wh/t1/y.parquet"), file("/ext/z.parquet")],
        )
        .unwrap();

    // A concurrent writer replaces the same file first.
    let mut concurrent = table.new_rewrite();
    concurrent.delete_data_file(file("/wh/t1/x.parquet"));
    concurrent.add_data_file(file("/ext/w.parquet"));
    concurrent.commit().await.unwrap();

    let err = rewrite.commit().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Iceberg(IcebergError::ValidationConflict(_))
    ));
    assert_eq!(rewrite.state(), RewriteState::Failed);
    assert!(rewrite.pending().is_empty());
    assert!(table.published_files().is_empty());
    assert!(!rewrite
        .delegate()
        .ops()
        .iter()
        .any(|op| matches!(op, RewriteOp::Publish(_))));
    assert_eq!(paths(&table.data_files()), vec!["/ext/w.parquet"]);
}

#[tokio::test]
async fn test_rewrite_with_deletes_and_sequence_number() {
    let table = table();
    table.append(&[file("/wh/t1/old.parquet"), file("/ext/old.parquet")]);

    let mut seed = table.new_rewrite();
    seed.add_delete_file(DeleteFile::position("/wh/t1/pos-old.parquet").into_ref());
    seed.commit().await.unwrap();

    let mut rewrite = coordinator(&table);
    rewrite
        .rewrite_files_at_sequence(&[file("/ext/old.parquet")], &[file("/ext/new.parquet")], 1)
        .unwrap()
        .rewrite_files_with_deletes(
            &[file("/wh/t1/old.parquet")],
            &[DeleteFile::position("/wh/t1/pos-old.parquet").into_ref()],
            &[file("/wh/t1/new.parquet")],
            &[DeleteFile::equality("/wh/t1/eq-new.parquet", vec![1]).into_ref()],
        )
        .unwrap();

    let ops = rewrite.delegate().ops();
    assert_eq!(ops[0], RewriteOp::SequenceNumber(1));
    assert!(ops.contains(&RewriteOp::AddDelete("/wh/t1/eq-new.parquet".into())));
    assert!(ops.contains(&RewriteOp::DeleteData("/wh/t1/old.parquet".into())));

    let outcome = rewrite.commit().await.unwrap();

    assert_eq!(outcome.sequence_number, 1);
    assert_eq!(outcome.hive_files_added, vec!["/wh/t1/new.parquet"]);
    assert_eq!(outcome.hive_files_removed, vec!["/wh/t1/old.parquet"]);
    assert_eq!(paths(&table.data_files()), vec!["/ext/new.parquet"]);

    let deletes: Vec<String> = table
        .delete_files()
        .iter()
        .map(|f| f.file_path.clone())
        .collect();
    assert_eq!(deletes, vec!["/wh/t1/eq-new.parquet"]);
    assert_eq!(rewrite.stats().delete_files_added, 1);
    assert_eq!(rewrite.stats().hive_files_deferred, 1);
}

#[test]
fn test_ancestor_mode_does_not_defer_sibling_table() {
    let table = table();
    let mut rewrite = HiveRewriteCoordinator::for_table(&table, ClassifierMode::Ancestor).unwrap();

    rewrite
        .rewrite_files(&[], &[file("/wh/t10/a.parquet"), file("/WH/T1/b.parquet")])
        .unwrap();

    assert_eq!(rewrite.delegate().staged_data_files(), vec!["/wh/t10/a.parquet"]);
    assert_eq!(paths(rewrite.pending().to_add()), vec!["/WH/T1/b.parquet"]);
}

#[test]
fn test_blank_hive_location_rejected() {
    let table = MemoryTable::new("db", "t1", " ");
    let result = HiveRewriteCoordinator::for_table(&table, ClassifierMode::Substring);
    assert!(matches!(result, Err(Error::Config(_))));
}
