//! Persisted trash settings.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often the background cleanup task fires.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_RETENTION_DAYS: u32 = 30;

/// How long trashed items are kept before automatic purge. Serialized as the
/// string `"never"` or a plain day count, matching the settings document the
/// UI writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RetentionRepr", into = "RetentionRepr")]
pub enum RetentionPolicy {
    Never,
    Days(u32),
}

impl RetentionPolicy {
    /// Items deleted strictly before the returned instant are expired.
    /// `None` means nothing ever expires.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RetentionPolicy::Never => None,
            RetentionPolicy::Days(days) => Some(now - chrono::Duration::days(*days as i64)),
        }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::Days(DEFAULT_RETENTION_DAYS)
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(untagged)]
enum RetentionRepr {
    Days(u32),
    Text(String),
}

impl From<RetentionPolicy> for RetentionRepr {
    fn from(policy: RetentionPolicy) -> Self {
        match policy {
            RetentionPolicy::Never => RetentionRepr::Text("never".to_string()),
            RetentionPolicy::Days(days) => RetentionRepr::Days(days),
        }
    }
}

impl TryFrom<RetentionRepr> for RetentionPolicy {
    type Error = String;

    fn try_from(repr: RetentionRepr) -> Result<Self, Self::Error> {
        match repr {
            RetentionRepr::Days(days) => Ok(RetentionPolicy::Days(days)),
            RetentionRepr::Text(text) if text == "never" => Ok(RetentionPolicy::Never),
            RetentionRepr::Text(other) => Err(format!("unknown retention policy: {other}")),
        }
    }
}

/// User-facing trash configuration, persisted inside the workspace and
/// re-read on every cleanup run so external edits take effect immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashSettings {
    #[serde(default)]
    pub retention: RetentionPolicy,
}
