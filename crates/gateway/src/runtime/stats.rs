//! Daily and weekly rollups.
//!
//! Rollups are always recomputed from the call records and health rows
//! of their period, never incremented, so a refresh can run any number
//! of times for the same record.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cc_domain::care::ElderId;
use cc_domain::error::Result;
use cc_domain::record::{
    BloodSugarEntry, CallRecord, CallStatus, EatenStatus, MealEntry, MealType, MedicationTakenEntry, TakenStatus,
    WellbeingStatus,
};
use cc_domain::stats::{mean, percent, week_start, DailyStatistics, WeeklyStatistics};
use chrono::{Duration, NaiveDate, Utc};

use crate::store::{CallRecordStore, ElderDirectory, HealthDataStore, JsonTable, Keyed};

/// Statistics hooks called by the analysis pipeline once per record.
#[async_trait]
pub trait StatisticsAggregator: Send + Sync {
    /// Refresh the health rollups touched by an enriched record.
    async fn record_enriched(&self, record: &CallRecord) -> Result<()>;

    /// Refresh the missed-call counters touched by an unanswered call.
    async fn record_missed_call(&self, record: &CallRecord) -> Result<()>;
}

impl Keyed for DailyStatistics {
    type Key = (ElderId, NaiveDate);
    fn key(&self) -> Self::Key {
        (self.elder_id, self.date)
    }
}

impl Keyed for WeeklyStatistics {
    type Key = (ElderId, NaiveDate);
    fn key(&self) -> Self::Key {
        (self.elder_id, self.week_start)
    }
}

/// Source rows for one elder over a date range.
struct PeriodRows {
    records: Vec<CallRecord>,
    meals: Vec<MealEntry>,
    medications: Vec<MedicationTakenEntry>,
    blood_sugar: Vec<BloodSugarEntry>,
}

impl PeriodRows {
    fn on(&self, date: NaiveDate) -> PeriodRows {
        PeriodRows {
            records: self.records.iter().filter(|r| r.call_date() == date).cloned().collect(),
            meals: self.meals.iter().filter(|m| m.recorded_at.date() == date).cloned().collect(),
            medications: self.medications.iter().filter(|m| m.recorded_on == date).cloned().collect(),
            blood_sugar: self.blood_sugar.iter().filter(|b| b.measured_on == date).cloned().collect(),
        }
    }

    fn count_status(&self, pred: impl Fn(CallStatus) -> bool) -> u32 {
        self.records.iter().filter(|r| pred(r.status)).count() as u32
    }

    fn sleep_minutes(&self) -> Vec<u32> {
        self.records
            .iter()
            .filter_map(|r| {
                let minutes = (r.sleep_end? - r.sleep_start?).num_minutes();
                u32::try_from(minutes).ok().filter(|m| *m > 0)
            })
            .collect()
    }

    fn taken_doses(&self) -> u32 {
        self.medications
            .iter()
            .filter(|m| m.taken_status == Some(TakenStatus::Taken))
            .count() as u32
    }

    /// Latest known eaten status for one meal of the day.
    fn meal_eaten(&self, meal: MealType) -> Option<bool> {
        self.meals
            .iter()
            .filter(|m| m.meal_type == meal)
            .filter_map(|m| m.eaten.map(|e| ((m.recorded_at, m.id), e == EatenStatus::Eaten)))
            .max_by_key(|(at, _)| *at)
            .map(|(_, eaten)| eaten)
    }

    fn latest(&self, field: impl Fn(&CallRecord) -> Option<WellbeingStatus>) -> Option<WellbeingStatus> {
        self.records
            .iter()
            .filter_map(|r| field(r).map(|s| ((r.called_at, r.id), s)))
            .max_by_key(|(at, _)| *at)
            .map(|(_, s)| s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RollingStatistics
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RollingStatistics {
    records: Arc<CallRecordStore>,
    health: Arc<HealthDataStore>,
    directory: Arc<ElderDirectory>,
    daily: JsonTable<DailyStatistics>,
    weekly: JsonTable<WeeklyStatistics>,
}

impl RollingStatistics {
    pub fn open(
        dir: &Path,
        records: Arc<CallRecordStore>,
        health: Arc<HealthDataStore>,
        directory: Arc<ElderDirectory>,
    ) -> Result<Self> {
        Ok(Self {
            records,
            health,
            directory,
            daily: JsonTable::open(dir, "daily_statistics")?,
            weekly: JsonTable::open(dir, "weekly_statistics")?,
        })
    }

    async fn rows(&self, elder_id: ElderId, from: NaiveDate, to: NaiveDate) -> PeriodRows {
        PeriodRows {
            records: self.records.list_for_elder_between(elder_id, from, to).await,
            meals: self.health.meals_between(elder_id, from, to).await,
            medications: self.health.medications_between(elder_id, from, to).await,
            blood_sugar: self.health.blood_sugar_between(elder_id, from, to).await,
        }
    }

    /// Scheduled doses per day.
    async fn daily_goal(&self, elder_id: ElderId) -> u32 {
        self.directory
            .profile(elder_id)
            .await
            .map(|p| p.medications.len() as u32)
            .unwrap_or(0)
    }

    pub async fn compute_daily(&self, elder_id: ElderId, date: NaiveDate) -> DailyStatistics {
        let rows = self.rows(elder_id, date, date).await;
        let goal = self.daily_goal(elder_id).await;
        daily_from(elder_id, date, goal, &rows)
    }

    pub async fn compute_weekly(&self, elder_id: ElderId, any_day: NaiveDate) -> WeeklyStatistics {
        let monday = week_start(any_day);
        let sunday = monday + Duration::days(6);
        let rows = self.rows(elder_id, monday, sunday).await;
        let goal = self.daily_goal(elder_id).await;
        weekly_from(elder_id, monday, goal, &rows)
    }

    pub async fn refresh_day(&self, elder_id: ElderId, date: NaiveDate) -> Result<DailyStatistics> {
        let stats = self.compute_daily(elder_id, date).await;
        self.daily.upsert(stats.clone()).await?;
        Ok(stats)
    }

    pub async fn refresh_week(&self, elder_id: ElderId, any_day: NaiveDate) -> Result<WeeklyStatistics> {
        let stats = self.compute_weekly(elder_id, any_day).await;
        self.weekly.upsert(stats.clone()).await?;
        Ok(stats)
    }

    /// Stored daily rollup, or a fresh computation when none was stored.
    pub async fn daily(&self, elder_id: ElderId, date: NaiveDate) -> DailyStatistics {
        match self.daily.get(&(elder_id, date)).await {
            Some(stats) => stats,
            None => self.compute_daily(elder_id, date).await,
        }
    }

    /// Stored weekly rollup for the week containing `any_day`, or a fresh
    /// computation.
    pub async fn weekly(&self, elder_id: ElderId, any_day: NaiveDate) -> WeeklyStatistics {
        match self.weekly.get(&(elder_id, week_start(any_day))).await {
            Some(stats) => stats,
            None => self.compute_weekly(elder_id, any_day).await,
        }
    }

    async fn refresh_both(&self, record: &CallRecord) -> Result<()> {
        let date = record.call_date();
        self.refresh_day(record.elder_id, date).await?;
        self.refresh_week(record.elder_id, date).await?;
        Ok(())
    }
}

#[async_trait]
impl StatisticsAggregator for RollingStatistics {
    async fn record_enriched(&self, record: &CallRecord) -> Result<()> {
        self.refresh_both(record).await
    }

    async fn record_missed_call(&self, record: &CallRecord) -> Result<()> {
        self.refresh_both(record).await
    }
}

fn daily_from(elder_id: ElderId, date: NaiveDate, goal: u32, rows: &PeriodRows) -> DailyStatistics {
    let sugar: Vec<u32> = rows.blood_sugar.iter().map(|b| b.value).collect();
    DailyStatistics {
        elder_id,
        date,
        completed_calls: rows.count_status(|s| s == CallStatus::Completed),
        missed_calls: rows.count_status(CallStatus::is_missed),
        breakfast: rows.meal_eaten(MealType::Breakfast),
        lunch: rows.meal_eaten(MealType::Lunch),
        dinner: rows.meal_eaten(MealType::Dinner),
        medication_goal: goal,
        medication_taken: rows.taken_doses(),
        avg_sleep_minutes: mean(&rows.sleep_minutes()),
        avg_blood_sugar: mean(&sugar),
        health_status: rows.latest(|r| r.health_status),
        mental_status: rows.latest(|r| r.psych_status),
        updated_at: Utc::now(),
    }
}

fn weekly_from(elder_id: ElderId, monday: NaiveDate, daily_goal: u32, rows: &PeriodRows) -> WeeklyStatistics {
    let known_meals = rows.meals.iter().filter(|m| m.eaten.is_some()).count() as u32;
    let eaten_meals = rows
        .meals
        .iter()
        .filter(|m| m.eaten == Some(EatenStatus::Eaten))
        .count() as u32;

    let mut bad_health_days = 0;
    let mut good_mental = 0;
    let mut bad_mental = 0;
    for offset in 0..7 {
        let day = rows.on(monday + Duration::days(offset));
        if day.latest(|r| r.health_status) == Some(WellbeingStatus::Bad) {
            bad_health_days += 1;
        }
        match day.latest(|r| r.psych_status) {
            Some(WellbeingStatus::Good) => good_mental += 1,
            Some(WellbeingStatus::Bad) => bad_mental += 1,
            None => {}
        }
    }

    WeeklyStatistics {
        elder_id,
        week_start: monday,
        meal_rate: percent(eaten_meals, known_meals),
        medication_rate: percent(rows.taken_doses(), daily_goal * 7),
        missed_calls: rows.count_status(CallStatus::is_missed),
        bad_health_days,
        good_mental,
        bad_mental,
        avg_sleep_minutes: mean(&rows.sleep_minutes()),
        updated_at: Utc::now(),
    }
}
