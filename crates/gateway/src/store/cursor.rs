//! Scheduler cursor: the end of the last window the scheduler dispatched.
//!
//! Kept in the state directory and re-read before every tick, so a
//! restarted server and the one-shot `carecall tick` command continue
//! from the same point instead of covering a window twice.

use std::path::Path;

use cc_domain::error::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JsonTable, Keyed};

const CARE_CALLS: &str = "care_calls";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CursorRow {
    name: String,
    /// Local wall-clock time in the scheduler's timezone.
    window_end: NaiveDateTime,
    updated_at: DateTime<Utc>,
}

impl Keyed for CursorRow {
    type Key = String;
    fn key(&self) -> String {
        self.name.clone()
    }
}

pub struct SchedulerCursor {
    table: JsonTable<CursorRow>,
}

impl SchedulerCursor {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            table: JsonTable::open(dir, "scheduler_cursor")?,
        })
    }

    /// End of the last dispatched window, as currently stored on disk.
    pub async fn last_window_end(&self) -> Result<Option<NaiveDateTime>> {
        self.table.reload().await?;
        Ok(self.table.get(&CARE_CALLS.to_string()).await.map(|row| row.window_end))
    }

    /// Move the cursor to `end`. A cursor never moves backwards.
    pub async fn advance(&self, end: NaiveDateTime) -> Result<()> {
        self.table
            .write(|rows| {
                let row = rows.entry(CARE_CALLS.to_string()).or_insert_with(|| CursorRow {
                    name: CARE_CALLS.to_string(),
                    window_end: end,
                    updated_at: Utc::now(),
                });
                row.window_end = row.window_end.max(end);
                row.updated_at = Utc::now();
                Ok(())
            })
            .await
    }
}
