//! Daily and weekly rollups of an elder's call results.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::care::ElderId;
use crate::record::WellbeingStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatistics {
    pub elder_id: ElderId,
    pub date: NaiveDate,
    pub completed_calls: u32,
    pub missed_calls: u32,
    /// `None` when no call that day established whether the meal was eaten.
    pub breakfast: Option<bool>,
    pub lunch: Option<bool>,
    pub dinner: Option<bool>,
    /// Number of scheduled doses for the day.
    pub medication_goal: u32,
    pub medication_taken: u32,
    pub avg_sleep_minutes: Option<u32>,
    pub avg_blood_sugar: Option<u32>,
    pub health_status: Option<WellbeingStatus>,
    pub mental_status: Option<WellbeingStatus>,
    pub updated_at: DateTime<Utc>,
}

impl DailyStatistics {
    pub fn empty(elder_id: ElderId, date: NaiveDate) -> Self {
        Self {
            elder_id,
            date,
            completed_calls: 0,
            missed_calls: 0,
            breakfast: None,
            lunch: None,
            dinner: None,
            medication_goal: 0,
            medication_taken: 0,
            avg_sleep_minutes: None,
            avg_blood_sugar: None,
            health_status: None,
            mental_status: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStatistics {
    pub elder_id: ElderId,
    /// Monday of the ISO week.
    pub week_start: NaiveDate,
    /// Eaten meals over recorded meals, in percent.
    pub meal_rate: Option<u8>,
    /// Taken doses over scheduled doses, in percent.
    pub medication_rate: Option<u8>,
    pub missed_calls: u32,
    pub bad_health_days: u32,
    pub good_mental: u32,
    pub bad_mental: u32,
    pub avg_sleep_minutes: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `part / whole` as a rounded percentage; `None` when `whole` is zero.
pub fn percent(part: u32, whole: u32) -> Option<u8> {
    if whole == 0 {
        return None;
    }
    let pct = (f64::from(part) * 100.0 / f64::from(whole)).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

/// Rounded mean; `None` for an empty input.
pub fn mean(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|v| u64::from(*v)).sum();
    Some(((sum as f64) / values.len() as f64).round() as u32)
}
