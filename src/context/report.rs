//! Provenance of the last initialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which stage contributed a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Build,
    File,
    Cmd,
}

/// A contributing source with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Stage that produced this source
    pub origin: SourceOrigin,

    /// Priority stamp the stage wrote with
    pub priority: i32,

    /// File path (None for build and command line)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of the raw file bytes (None for build and command line)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Summary of one `init` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitReport {
    /// When the run finished
    pub created_at: DateTime<Utc>,

    /// Sources merged, in precedence order
    pub sources: Vec<ConfigSource>,

    /// Distinct errors returned to the caller, rendered
    pub errors: Vec<String>,
}

impl InitReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
