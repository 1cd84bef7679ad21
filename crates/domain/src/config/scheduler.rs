use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// When false the background tick loop is not spawned. Manual ticks
    /// (`POST /v1/scheduler/tick`, `carecall tick`) still work.
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_600")]
    pub interval_secs: u64,
    /// IANA zone the call times are expressed in.
    #[serde(default = "d_timezone")]
    pub timezone: String,
    /// A tick that follows the previous window end by more than this
    /// starts a fresh `[now - interval, now)` window instead of catching up.
    #[serde(default = "d_60")]
    pub max_catchup_minutes: u64,
    /// Outbound calls placed in parallel within one tick.
    #[serde(default = "d_8")]
    pub dispatch_concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 600,
            timezone: d_timezone(),
            max_catchup_minutes: 60,
            dispatch_concurrency: 8,
        }
    }
}

impl SchedulerConfig {
    /// Parse `timezone` into a chrono-tz zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("scheduler.timezone {:?}: {e}", self.timezone)))
    }
}

fn d_true() -> bool {
    true
}
fn d_600() -> u64 {
    600
}
fn d_60() -> u64 {
    60
}
fn d_8() -> usize {
    8
}
fn d_timezone() -> String {
    "Asia/Seoul".into()
}
