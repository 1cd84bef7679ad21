//! Periodic care-call scheduler.
//!
//! Windows end on wall-clock multiples of the interval counted from local
//! midnight (`09:00`, `09:10`, ... for the default ten minutes), and each
//! one starts where the stored [`SchedulerCursor`] says the previous one
//! ended. A restart, or a `carecall tick` run next to the server, lands
//! on the same boundary and finds an empty window instead of calling the
//! same slot again. The first tick ever (or one after a gap longer than
//! `max_catchup_minutes`) covers the single interval before the boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cc_domain::config::SchedulerConfig;
use cc_domain::error::Result;
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::runtime::dispatch::CallDispatcher;
use crate::runtime::window::{match_due, TickWindow};
use crate::store::{ElderDirectory, SchedulerCursor};

/// What one tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick_id: Uuid,
    pub window: TickWindow,
    pub matched: usize,
    pub sent: usize,
    pub failed: usize,
    pub not_found: usize,
}

pub struct CallScheduler {
    directory: Arc<ElderDirectory>,
    dispatcher: Arc<CallDispatcher>,
    cursor: Arc<SchedulerCursor>,
    tz: Tz,
    interval: Duration,
    max_catchup: Duration,
    concurrency: usize,
    running: AtomicBool,
}

/// Clears the re-entrancy flag when the tick ends, including on panic.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CallScheduler {
    pub fn new(
        cfg: &SchedulerConfig,
        directory: Arc<ElderDirectory>,
        dispatcher: Arc<CallDispatcher>,
        cursor: Arc<SchedulerCursor>,
    ) -> Result<Self> {
        Ok(Self {
            directory,
            dispatcher,
            cursor,
            tz: cfg.tz()?,
            interval: Duration::seconds(cfg.interval_secs.max(60) as i64),
            max_catchup: Duration::minutes(cfg.max_catchup_minutes as i64),
            concurrency: cfg.dispatch_concurrency,
            running: AtomicBool::new(false),
        })
    }

    fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }

    /// Run one tick against the current wall clock.
    pub async fn tick(&self) -> Result<Option<TickReport>> {
        self.tick_at(self.local_now()).await
    }

    /// Time to sleep until just past the next window boundary.
    pub fn until_next_boundary(&self) -> std::time::Duration {
        let now = self.local_now();
        let next = floor_to_interval(now, self.interval) + self.interval + Duration::seconds(1);
        (next - now).to_std().unwrap_or_default()
    }

    /// Run one tick as if the local time were `now`.
    ///
    /// `Ok(None)` when the previous tick is still running. The cursor is
    /// advanced before dispatch: a crash mid-batch loses those calls
    /// rather than repeating them.
    pub async fn tick_at(&self, now: NaiveDateTime) -> Result<Option<TickReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("previous scheduler tick still running, skipping");
            return Ok(None);
        }
        let _guard = TickGuard(&self.running);

        let tick_id = Uuid::new_v4();
        let window = self.next_window(now).await?;
        if window.is_empty() {
            tracing::debug!(%tick_id, start = %window.start, end = %window.end, "window already covered, nothing to do");
            return Ok(Some(TickReport {
                tick_id,
                window,
                matched: 0,
                sent: 0,
                failed: 0,
                not_found: 0,
            }));
        }
        self.cursor.advance(window.end).await?;

        let settings = self.directory.active_settings().await;
        let due = match_due(&window, &settings);
        let matched = due.len();
        let summary = self.dispatcher.dispatch_all(due, self.concurrency).await;

        tracing::info!(
            %tick_id,
            start = %window.start,
            end = %window.end,
            matched,
            sent = summary.sent,
            failed = summary.failed,
            not_found = summary.not_found,
            "scheduler tick finished"
        );

        Ok(Some(TickReport {
            tick_id,
            window,
            matched,
            sent: summary.sent,
            failed: summary.failed,
            not_found: summary.not_found,
        }))
    }

    /// This tick's window, from the stored cursor to the last boundary.
    async fn next_window(&self, now: NaiveDateTime) -> Result<TickWindow> {
        let end = floor_to_interval(now, self.interval);

        let window = match self.cursor.last_window_end().await? {
            Some(prev) if prev >= end => TickWindow::new(prev, end),
            Some(prev) if end - prev <= self.max_catchup.max(self.interval) => TickWindow::new(prev, end),
            Some(prev) => {
                tracing::warn!(
                    previous_end = %prev,
                    now = %end,
                    "scheduler gap exceeds max_catchup_minutes, slots in the gap are skipped"
                );
                TickWindow::ending_at(end, self.interval)
            }
            None => TickWindow::ending_at(end, self.interval),
        };

        if window.end - window.start > Duration::hours(24) {
            return Ok(TickWindow::ending_at(end, Duration::hours(24)));
        }
        Ok(window)
    }
}

/// Latest interval boundary at or before `t`, counted from local midnight.
fn floor_to_interval(t: NaiveDateTime, interval: Duration) -> NaiveDateTime {
    let step = interval.num_seconds().max(1);
    let secs = i64::from(t.time().num_seconds_from_midnight());
    t.date().and_time(NaiveTime::MIN) + Duration::seconds(secs - secs % step)
}
