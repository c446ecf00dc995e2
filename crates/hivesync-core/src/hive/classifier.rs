//! Hive location classification.
//!
//! Decides whether a file lives under the table's hive location, the classic
//! directory layout kept for directory-listing readers. Two policies exist:
//!
//! - [`SubstringClassifier`]: case-insensitive substring containment. This is
//!   the historical rule and the default. A root that is a plain substring of
//!   an unrelated path (`/wh/t1` inside `/wh/t10/x`) also matches.
//! - [`AncestorClassifier`]: case-insensitive path-prefix test with a `/`
//!   boundary after the root.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Root of a table's hive location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveLocation(String);

impl HiveLocation {
    /// Create a hive location root. Blank roots are rejected.
    pub fn new(root: impl Into<String>) -> Result<Self> {
        let root = root.into();
        if root.trim().is_empty() {
            return Err(Error::Config("Hive location root must not be empty".into()));
        }
        Ok(Self(root))
    }

    /// The root as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Case-insensitive substring test of `root` within `path`.
pub fn is_hive_located(path: &str, root: &str) -> bool {
    path.to_lowercase().contains(&root.to_lowercase())
}

/// Policy deciding whether a path belongs to the hive location.
pub trait LocationClassifier: Send + Sync + fmt::Debug {
    /// Whether `path` is located in the hive location.
    fn is_hive_located(&self, path: &str) -> bool;

    /// The hive location root this classifier tests against.
    fn location(&self) -> &HiveLocation;
}

/// Classification policy selectable from configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Case-insensitive substring containment
    #[default]
    Substring,
    /// Case-insensitive ancestor directory test
    Ancestor,
}

impl ClassifierMode {
    /// Build the classifier for this mode.
    pub fn classifier(self, location: HiveLocation) -> Arc<dyn LocationClassifier> {
        match self {
            ClassifierMode::Substring => Arc::new(SubstringClassifier::new(location)),
            ClassifierMode::Ancestor => Arc::new(AncestorClassifier::new(location)),
        }
    }
}

/// Substring containment classifier.
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    location: HiveLocation,
    root_lower: String,
}

impl SubstringClassifier {
    pub fn new(location: HiveLocation) -> Self {
        let root_lower = location.as_str().to_lowercase();
        Self {
            location,
            root_lower,
        }
    }
}

impl LocationClassifier for SubstringClassifier {
    fn is_hive_located(&self, path: &str) -> bool {
        path.to_lowercase().contains(&self.root_lower)
    }

    fn location(&self) -> &HiveLocation {
        &self.location
    }
}

/// Ancestor directory classifier.
///
/// Matches the root itself and anything below it. Trailing slashes on the
/// root are ignored.
#[derive(Debug, Clone)]
pub struct AncestorClassifier {
    location: HiveLocation,
    root_lower: String,
}

impl AncestorClassifier {
    pub fn new(location: HiveLocation) -> Self {
        let root_lower = location.as_str().trim_end_matches('/').to_lowercase();
        Self {
            location,
            root_lower,
        }
    }
}

impl LocationClassifier for AncestorClassifier {
    fn is_hive_located(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        match path.strip_prefix(&self.root_lower) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.root_lower.is_empty(),
            None => false,
        }
    }

    fn location(&self) -> &HiveLocation {
        &self.location
    }
}
