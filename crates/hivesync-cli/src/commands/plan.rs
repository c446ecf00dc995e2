//! Plan command implementation.
//!
//! A rewrite plan is a TOML file describing the files a rewrite replaces and
//! adds, together with the files the table already holds:
//!
//! ```toml
//! sequence_number = 4
//!
//! [[existing]]
//! file_path = "s3://warehouse/db/orders_hive/dt=2024-01-01/part-0.parquet"
//!
//! [[data_files_to_delete]]
//! file_path = "s3://warehouse/db/orders_hive/dt=2024-01-01/part-0.parquet"
//!
//! [[data_files_to_add]]
//! file_path = "s3://warehouse/db/orders_hive/dt=2024-01-01/part-1.parquet"
//! record_count = 1200
//! ```

use anyhow::{Context, Result};
use hivesync_core::hive::{HiveRewriteCoordinator, RewriteFiles};
use hivesync_core::iceberg::{
    DataFile, DataFileRef, DeleteFile, DeleteFileRef, MemoryRewrite, MemoryTable, RewriteTable,
    RewriteTransaction,
};
use hivesync_core::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Files a rewrite replaces and adds.
#[derive(Debug, Default, Deserialize)]
pub struct RewritePlan {
    /// Data files already live in the table
    #[serde(default)]
    pub existing: Vec<DataFile>,
    /// Delete files already live in the table
    #[serde(default)]
    pub existing_delete_files: Vec<DeleteFile>,
    #[serde(default)]
    pub data_files_to_delete: Vec<DataFile>,
    #[serde(default)]
    pub data_files_to_add: Vec<DataFile>,
    #[serde(default)]
    pub delete_files_to_replace: Vec<DeleteFile>,
    #[serde(default)]
    pub delete_files_to_add: Vec<DeleteFile>,
    /// Data sequence number override
    pub sequence_number: Option<i64>,
    /// Snapshot to validate against (defaults to the seeded table's current snapshot)
    pub validate_from_snapshot: Option<i64>,
}

impl RewritePlan {
    /// Load a plan from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Parse a plan from TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse plan file")
    }

    fn has_delete_files(&self) -> bool {
        !self.delete_files_to_replace.is_empty() || !self.delete_files_to_add.is_empty()
    }
}

fn data_refs(files: &[DataFile]) -> Vec<DataFileRef> {
    files.iter().cloned().map(DataFile::into_ref).collect()
}

fn delete_refs(files: &[DeleteFile]) -> Vec<DeleteFileRef> {
    files.iter().cloned().map(DeleteFile::into_ref).collect()
}

/// Build an in-memory table holding the plan's existing files.
pub async fn seed_table(config: &Config, plan: &RewritePlan) -> Result<MemoryTable> {
    let table = MemoryTable::new(
        config.table.namespace.clone(),
        config.table.name.clone(),
        config.table.hive_location.clone(),
    );

    if !plan.existing.is_empty() {
        table.append(&data_refs(&plan.existing));
    }

    if !plan.existing_delete_files.is_empty() {
        let mut seed = table.new_rewrite();
        for file in delete_refs(&plan.existing_delete_files) {
            seed.add_delete_file(file);
        }
        seed.commit().await?;
    }

    Ok(table)
}

/// Stage the plan into a new coordinator over `table`.
pub fn stage_plan(
    config: &Config,
    plan: &RewritePlan,
    table: &MemoryTable,
) -> Result<HiveRewriteCoordinator<MemoryRewrite>> {
    let mut rewrite = HiveRewriteCoordinator::for_table(table, config.classifier.mode)?;

    if let Some(snapshot_id) = plan.validate_from_snapshot.or(table.current_snapshot_id()) {
        rewrite.validate_from_snapshot(snapshot_id)?;
    }

    let to_delete = data_refs(&plan.data_files_to_delete);
    let to_add = data_refs(&plan.data_files_to_add);

    match (plan.sequence_number, plan.has_delete_files()) {
        (Some(sequence_number), false) => {
            rewrite.rewrite_files_at_sequence(&to_delete, &to_add, sequence_number)?;
        }
        (None, false) => {
            rewrite.rewrite_files(&to_delete, &to_add)?;
        }
        (sequence_number, true) => {
            if let Some(sequence_number) = sequence_number {
                rewrite.rewrite_files_at_sequence(&[], &[], sequence_number)?;
            }
            rewrite.rewrite_files_with_deletes(
                &to_delete,
                &delete_refs(&plan.delete_files_to_replace),
                &to_add,
                &delete_refs(&plan.delete_files_to_add),
            )?;
        }
    }

    Ok(rewrite)
}

/// Classification of a staged plan.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub table: String,
    pub hive_location: String,
    /// Data files staged into the transaction right away
    pub staged_adds: Vec<String>,
    /// Hive-located data files withheld until commit
    pub deferred_adds: Vec<String>,
    /// Data files removed
    pub deletes: Vec<String>,
    /// Hive-located data files removed
    pub hive_deletes: Vec<String>,
    pub delete_files_added: u64,
    pub delete_files_removed: u64,
}

impl PlanReport {
    pub fn from_rewrite(config: &Config, rewrite: &HiveRewriteCoordinator<MemoryRewrite>) -> Self {
        let paths = |files: &[DataFileRef]| -> Vec<String> {
            files.iter().map(|f| f.file_path.clone()).collect()
        };

        Self {
            table: config.table.full_name(),
            hive_location: config.table.hive_location.clone(),
            staged_adds: rewrite
                .delegate()
                .staged_data_files()
                .into_iter()
                .map(String::from)
                .collect(),
            deferred_adds: paths(rewrite.pending().to_add()),
            deletes: rewrite
                .delegate()
                .ops()
                .iter()
                .filter_map(|op| match op {
                    hivesync_core::iceberg::RewriteOp::DeleteData(path) => Some(path.clone()),
                    _ => None,
                })
                .collect(),
            hive_deletes: paths(rewrite.pending().to_delete()),
            delete_files_added: rewrite.stats().delete_files_added,
            delete_files_removed: rewrite.stats().delete_files_deleted,
        }
    }

    fn print(&self) {
        println!("Rewrite plan for {}", self.table);
        println!("  Hive location: {}", self.hive_location);
        print_list("Staged now", &self.staged_adds);
        print_list("Deferred until commit", &self.deferred_adds);
        print_list("Removed", &self.deletes);
        print_list("Removed from hive location", &self.hive_deletes);
        println!("  Delete files added: {}", self.delete_files_added);
        println!("  Delete files removed: {}", self.delete_files_removed);
    }
}

pub(crate) fn print_list(title: &str, items: &[String]) {
    println!("  {} ({}):", title, items.len());
    for item in items {
        println!("    - {}", item);
    }
}

/// Classify a rewrite plan without committing it.
pub fn run(config: Config, plan_path: &Path, json: bool) -> Result<()> {
    let plan = RewritePlan::from_file(plan_path)?;

    info!(
        table = %config.table.full_name(),
        plan = %plan_path.display(),
        "Classifying rewrite plan"
    );

    // Existing files only matter for commit validation.
    let table = MemoryTable::new(
        config.table.namespace.clone(),
        config.table.name.clone(),
        config.table.hive_location.clone(),
    );
    let rewrite = stage_plan(&config, &plan, &table)?;
    let report = PlanReport::from_rewrite(&config, &rewrite);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_toml(
            r#"
[table]
namespace = "db"
name = "t1"
hive_location = "/wh/t1"
"#,
        )
        .unwrap()
    }

    const PLAN: &str = r#"
sequence_number = 9

[[existing]]
file_path = "/wh/t1/old.parquet"

[[data_files_to_delete]]
file_path = "/wh/t1/old.parquet"

[[data_files_to_add]]
file_path = "/wh/t1/a.parquet"

[[data_files_to_add]]
file_path = "/ext/b.parquet"
record_count = 10
"#;

    #[test]
    fn test_parse_plan() {
        let plan = RewritePlan::from_toml(PLAN).unwrap();
        assert_eq!(plan.sequence_number, Some(9));
        assert_eq!(plan.existing.len(), 1);
        assert_eq!(plan.data_files_to_add.len(), 2);
        assert!(!plan.has_delete_files());
    }

    #[test]
    fn test_report_splits_hive_files() {
        let config = config();
        let plan = RewritePlan::from_toml(PLAN).unwrap();
        let table = MemoryTable::new("db", "t1", "/wh/t1");

        let rewrite = stage_plan(&config, &plan, &table).unwrap();
        let report = PlanReport::from_rewrite(&config, &rewrite);

        assert_eq!(report.staged_adds, vec!["/ext/b.parquet"]);
        assert_eq!(report.deferred_adds, vec!["/wh/t1/a.parquet"]);
        assert_eq!(report.deletes, vec!["/wh/t1/old.parquet"]);
        assert_eq!(report.hive_deletes, vec!["/wh/t1/old.parquet"]);
    }

    #[test]
    fn test_plan_with_delete_files() {
        let config = config();
        let plan = RewritePlan::from_toml(
            r#"
[[data_files_to_add]]
file_path = "/wh/t1/a.parquet"

[[delete_files_to_add]]
file_path = "/wh/t1/eq.parquet"
content = "equality"
equality_ids = [1]
"#,
        )
        .unwrap();
        let table = MemoryTable::new("db", "t1", "/wh/t1");

        let rewrite = stage_plan(&config, &plan, &table).unwrap();
        let report = PlanReport::from_rewrite(&config, &rewrite);

        assert!(report.staged_adds.is_empty());
        assert_eq!(report.deferred_adds, vec!["/wh/t1/a.parquet"]);
        assert_eq!(report.delete_files_added, 1);
    }
}
