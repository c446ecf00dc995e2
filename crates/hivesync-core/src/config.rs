//! Configuration structures for hivesync.
//!
//! Configuration is loaded from TOML files and can be overridden via CLI flags.

use crate::hive::{ClassifierMode, HiveLocation};
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Table configuration
    pub table: TableConfig,

    /// Hive location classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Monitoring configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableConfig {
    /// Namespace (database)
    pub namespace: String,

    /// Table name
    pub name: String,

    /// Table-format native location
    #[serde(default)]
    pub location: Option<String>,

    /// Root of the hive directory layout kept for directory-listing readers
    pub hive_location: String,
}

impl TableConfig {
    /// Fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// The validated hive location root.
    pub fn hive_location(&self) -> crate::Result<HiveLocation> {
        HiveLocation::new(self.hive_location.clone())
    }
}

/// Hive location classification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Classification policy
    #[serde(default)]
    pub mode: ClassifierMode,
}

/// Monitoring configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MonitoringConfig {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Directive string understood by log filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Plain text format
    Text,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if self.table.namespace.is_empty() {
            return Err(crate::Error::Config("Table namespace is required".into()));
        }

        if self.table.name.is_empty() {
            return Err(crate::Error::Config("Table name is required".into()));
        }

        self.table.hive_location()?;

        if let Some(location) = &self.table.location {
            if self.classifier.mode == ClassifierMode::Substring
                && crate::hive::is_hive_located(location, &self.table.hive_location)
            {
                tracing::warn!(
                    location = %location,
                    hive_location = %self.table.hive_location,
                    "Table location contains the hive location; every native file will be treated as hive-located"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[table]
namespace = "db"
name = "orders"
location = "s3://warehouse/db/orders"
hive_location = "s3://warehouse/db/orders_hive"

[classifier]
mode = "ancestor"

[monitoring]
log_level = "debug"
log_format = "text"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert_eq!(config.table.full_name(), "db.orders");
        assert_eq!(
            config.table.hive_location().unwrap().as_str(),
            "s3://warehouse/db/orders_hive"
        );
        assert_eq!(config.classifier.mode, ClassifierMode::Ancestor);
        assert_eq!(config.monitoring.log_level, LogLevel::Debug);
        assert_eq!(config.monitoring.log_format, LogFormat::Text);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml(
            r#"
[table]
namespace = "db"
name = "orders"
hive_location = "/wh/orders"
"#,
        )
        .unwrap();
        assert_eq!(config.classifier.mode, ClassifierMode::Substring);
        assert_eq!(config.monitoring.log_level, LogLevel::Info);
        assert_eq!(config.monitoring.log_format, LogFormat::Json);
        assert!(config.table.location.is_none());
    }

    #[test]
    fn test_config_validation_empty_hive_location() {
        let err = Config::from_toml(
            r#"
[table]
namespace = "db"
name = "orders"
hive_location = ""
"#,
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_config_validation_empty_name() {
        let err = Config::from_toml(
            r#"
[table]
namespace = "db"
name = ""
hive_location = "/wh/orders"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Table name is required"));
    }

    #[test]
    fn test_missing_table_section() {
        assert!(Config::from_toml("[monitoring]\nlog_level = \"warn\"\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.table.name, "orders");
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/hivesync.toml"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::default().as_str(), "info");
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }
}
