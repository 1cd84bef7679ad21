//! Turning extracted signals into a [`RecordPatch`].

use cc_domain::care::hhmm;
use cc_domain::error::Result;
use cc_domain::record::{RecordPatch, WellbeingStatus};
use cc_domain::signals::{ExtractedHealthSignals, SleepSignal};
use cc_domain::slot::CallSlot;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Anchor the reported bed and wake times to `date`. A wake time earlier
/// than the bed time is taken to be the next morning.
pub fn parse_sleep(sleep: &SleepSignal, date: NaiveDate) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let start = parse_clock(sleep.sleep_start_time.as_deref(), "sleepStartTime");
    let end = parse_clock(sleep.sleep_end_time.as_deref(), "sleepEndTime");

    let start_at = start.map(|t| date.and_time(t));
    let end_at = end.map(|t| {
        let at = date.and_time(t);
        match start {
            Some(s) if t < s => at + Duration::days(1),
            _ => at,
        }
    });
    (start_at, end_at)
}

fn parse_clock(raw: Option<&str>, field: &'static str) -> Option<chrono::NaiveTime> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = hhmm::parse(raw);
    if parsed.is_none() {
        tracing::warn!(field, value = raw, "unparseable sleep time, skipping");
    }
    parsed
}

/// Build the record patch for one successful extraction.
///
/// `slot` is the resolved slot of the call; health fields are only
/// written for the evening slot, and a failed resolution leaves them
/// untouched.
pub fn build_record_patch(
    signals: &ExtractedHealthSignals,
    call_date: NaiveDate,
    slot: &Result<CallSlot>,
    record_id: i64,
) -> RecordPatch {
    let mut patch = RecordPatch::default();

    if let Some(sleep) = &signals.sleep_data {
        let (start, end) = parse_sleep(sleep, call_date);
        patch.sleep_start = start;
        patch.sleep_end = end;
    }

    if let Some((status, details)) = categorical(&signals.psychological_state, signals.psychological_status.as_deref()) {
        patch.psych_status = Some(status);
        patch.psych_details = Some(details);
    }

    match slot {
        Ok(slot) if slot.finalizes_health_status() => {
            if let Some((status, details)) = categorical(&signals.health_signs, signals.health_status.as_deref()) {
                patch.health_status = Some(status);
                patch.health_details = Some(details);
            }
        }
        Ok(slot) => {
            tracing::debug!(record_id, %slot, "health status is only finalized by the evening call");
        }
        Err(e) => {
            tracing::error!(record_id, error = %e, "cannot resolve call slot, health status left unchanged");
        }
    }

    patch
}

/// Status plus `", "`-joined sentences, only when both are usable.
fn categorical(sentences: &[String], status: Option<&str>) -> Option<(WellbeingStatus, String)> {
    let sentences: Vec<&str> = sentences
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return None;
    }
    let status = WellbeingStatus::from_label(status?)?;
    Some((status, sentences.join(", ")))
}

/// Split a health-detail string into distinct, trimmed symptoms.
pub fn symptom_list(details: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in details.split(',') {
        let s = part.trim();
        if !s.is_empty() && !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    }
    out
}
