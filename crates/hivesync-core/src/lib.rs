//! Hivesync Core - hive-location-aware rewrites for Iceberg tables
//!
//! Tables that keep a classic hive directory next to their Iceberg metadata
//! must not register files under the hive location until the metadata commit
//! has succeeded. This library provides:
//!
//! - Path classification against the hive location root
//! - A rewrite coordinator that defers hive-located files and republishes
//!   them once the underlying transaction commits
//! - An in-memory table for dry runs and tests

pub mod config;
pub mod error;
pub mod hive;
pub mod iceberg;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use error::{IcebergError, RewriteError};
pub use hive::{HiveRewriteCoordinator, RewriteFiles, RewriteState};
