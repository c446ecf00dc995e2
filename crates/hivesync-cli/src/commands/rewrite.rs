//! Rewrite command implementation.

use super::plan::{print_list, seed_table, stage_plan, PlanReport, RewritePlan};
use anyhow::Result;
use hivesync_core::Config;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Result of a committed rewrite.
#[derive(Debug, Serialize)]
struct RewriteReport {
    #[serde(flatten)]
    plan: PlanReport,
    snapshot_id: i64,
    sequence_number: i64,
    committed_at: String,
    /// Files published after commit, in order
    published: Vec<String>,
    /// Live data files after commit
    live_data_files: Vec<String>,
}

/// Run a rewrite plan against an in-memory table and commit it.
pub async fn run(config: Config, plan_path: &Path, json: bool) -> Result<()> {
    let plan = RewritePlan::from_file(plan_path)?;

    info!(
        table = %config.table.full_name(),
        plan = %plan_path.display(),
        "Running rewrite plan"
    );

    let table = seed_table(&config, &plan).await?;
    let mut rewrite = stage_plan(&config, &plan, &table)?;
    let staged = PlanReport::from_rewrite(&config, &rewrite);

    let outcome = rewrite.commit().await?;

    let report = RewriteReport {
        plan: staged,
        snapshot_id: outcome.snapshot_id,
        sequence_number: outcome.sequence_number,
        committed_at: outcome.committed_at.to_rfc3339(),
        published: table
            .published_files()
            .iter()
            .map(|f| f.file_path.clone())
            .collect(),
        live_data_files: table
            .data_files()
            .iter()
            .map(|f| f.file_path.clone())
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Rewrite committed:");
        println!("  Snapshot: {}", report.snapshot_id);
        println!("  Sequence number: {}", report.sequence_number);
        println!("  Committed at: {}", report.committed_at);
        print_list("Published", &report.published);
        print_list("Live data files", &report.live_data_files);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_rewrite_commits_plan() {
        let config = Config::from_toml(
            r#"
[table]
namespace = "db"
name = "t1"
hive_location = "/wh/t1"
"#,
        )
        .unwrap();

        let mut plan_file = tempfile::NamedTempFile::new().unwrap();
        plan_file
            .write_all(
                br#"
[[existing]]
file_path = "/ext/old.parquet"

[[data_files_to_delete]]
file_path = "/ext/old.parquet"

[[data_files_to_add]]
file_path = "/wh/t1/a.parquet"
"#,
            )
            .unwrap();

        run(config, plan_file.path(), true).await.unwrap();
    }

    #[tokio::test]
    async fn test_rewrite_missing_existing_file_conflicts() {
        let config = Config::from_toml(
            r#"
[table]
namespace = "db"
name = "t1"
hive_location = "/wh/t1"
"#,
        )
        .unwrap();

        let mut plan_file = tempfile::NamedTempFile::new().unwrap();
        plan_file
            .write_all(
                br#"
[[data_files_to_delete]]
file_path = "/ext/missing.parquet"
"#,
            )
            .unwrap();

        let err = run(config, plan_file.path(), false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<hivesync_core::Error>(),
            Some(hivesync_core::Error::Iceberg(
                hivesync_core::IcebergError::ValidationConflict(_)
            ))
        ));
    }
}
