// ABOUTME: Timestamp-derived backup identifiers.
// ABOUTME: A process-wide generator keeps identifiers unique within the same clock tick.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, const_mutex};
use serde::{Deserialize, Serialize};
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

static GENERATOR: BackupIdGenerator = BackupIdGenerator::new();

/// Unique name of one backup snapshot, used for manual recovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(String);

impl BackupId {
    /// Generate a fresh identifier from the current UTC time.
    pub fn generate() -> Self {
        GENERATOR.next_at(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues `YYYYmmdd-HHMMSS` identifiers, appending `-N` when a second is reused.
///
/// The issued timestamp never moves backwards, so a clock step back
/// continues the counter of the last issued second instead of repeating it.
pub struct BackupIdGenerator {
    last: Mutex<Option<(i64, u32)>>,
}

impl BackupIdGenerator {
    pub const fn new() -> Self {
        Self {
            last: const_mutex(None),
        }
    }

    /// Issue the next identifier for the given wall-clock time.
    pub fn next_at(&self, now: DateTime<Utc>) -> BackupId {
        let mut last = self.last.lock();
        let now_secs = now.timestamp();

        let (secs, counter) = match *last {
            Some((prev, counter)) if now_secs <= prev => (prev, counter + 1),
            _ => (now_secs, 0),
        };
        *last = Some((secs, counter));

        let stamp = DateTime::<Utc>::from_timestamp(secs, 0)
            .unwrap_or(now)
            .format(TIMESTAMP_FORMAT)
            .to_string();

        if counter == 0 {
            BackupId(stamp)
        } else {
            BackupId(format!("{stamp}-{counter}"))
        }
    }
}

impl Default for BackupIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
