//! Health sub-records (blood sugar, medication, meals) owned by a call
//! record.

use std::path::Path;

use async_trait::async_trait;
use cc_domain::care::ElderId;
use cc_domain::error::Result;
use cc_domain::record::{BloodSugarEntry, MealEntry, MedicationTakenEntry, RecordId};
use chrono::NaiveDate;
use serde::Serialize;

use super::{IdSequence, JsonTable, Keyed};

/// Write side used by the analysis savers.
///
/// Each method replaces every row of its kind owned by `record_id` with
/// `entries`, so running the same analysis twice leaves one copy. Ids on
/// the incoming entries are ignored and assigned by the sink.
#[async_trait]
pub trait HealthRecordSink: Send + Sync {
    async fn replace_blood_sugar(&self, record_id: RecordId, entries: Vec<BloodSugarEntry>) -> Result<usize>;

    async fn replace_medications(
        &self,
        record_id: RecordId,
        entries: Vec<MedicationTakenEntry>,
    ) -> Result<usize>;

    async fn replace_meals(&self, record_id: RecordId, entries: Vec<MealEntry>) -> Result<usize>;
}

impl Keyed for BloodSugarEntry {
    type Key = i64;
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for MedicationTakenEntry {
    type Key = i64;
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for MealEntry {
    type Key = i64;
    fn key(&self) -> i64 {
        self.id
    }
}

/// Everything derived for a single call record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordHealthData {
    pub blood_sugar: Vec<BloodSugarEntry>,
    pub medications: Vec<MedicationTakenEntry>,
    pub meals: Vec<MealEntry>,
}

pub struct HealthDataStore {
    blood_sugar: JsonTable<BloodSugarEntry>,
    medications: JsonTable<MedicationTakenEntry>,
    meals: JsonTable<MealEntry>,
    blood_sugar_ids: IdSequence,
    medication_ids: IdSequence,
    meal_ids: IdSequence,
}

impl HealthDataStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        let blood_sugar = JsonTable::<BloodSugarEntry>::open(dir, "blood_sugar")?;
        let medications = JsonTable::<MedicationTakenEntry>::open(dir, "medication_taken")?;
        let meals = JsonTable::<MealEntry>::open(dir, "meals")?;

        let blood_sugar_ids = IdSequence::after(blood_sugar.list().await.iter().map(|e| e.id).max());
        let medication_ids = IdSequence::after(medications.list().await.iter().map(|e| e.id).max());
        let meal_ids = IdSequence::after(meals.list().await.iter().map(|e| e.id).max());

        Ok(Self {
            blood_sugar,
            medications,
            meals,
            blood_sugar_ids,
            medication_ids,
            meal_ids,
        })
    }

    pub async fn for_record(&self, record_id: RecordId) -> RecordHealthData {
        RecordHealthData {
            blood_sugar: self.blood_sugar.filter(|e| e.call_record_id == record_id).await,
            medications: self.medications.filter(|e| e.call_record_id == record_id).await,
            meals: self.meals.filter(|e| e.call_record_id == record_id).await,
        }
    }

    /// Drop every sub-record of a call record (used before reanalysis).
    pub async fn clear_record(&self, record_id: RecordId) -> Result<usize> {
        let mut removed = self.blood_sugar.retain(|e| e.call_record_id != record_id).await?;
        removed += self.medications.retain(|e| e.call_record_id != record_id).await?;
        removed += self.meals.retain(|e| e.call_record_id != record_id).await?;
        Ok(removed)
    }

    pub async fn blood_sugar_between(&self, elder_id: ElderId, from: NaiveDate, to: NaiveDate) -> Vec<BloodSugarEntry> {
        self.blood_sugar
            .filter(|e| e.elder_id == elder_id && e.measured_on >= from && e.measured_on <= to)
            .await
    }

    pub async fn medications_between(
        &self,
        elder_id: ElderId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<MedicationTakenEntry> {
        self.medications
            .filter(|e| e.elder_id == elder_id && e.recorded_on >= from && e.recorded_on <= to)
            .await
    }

    pub async fn meals_between(&self, elder_id: ElderId, from: NaiveDate, to: NaiveDate) -> Vec<MealEntry> {
        self.meals
            .filter(|e| {
                let day = e.recorded_at.date();
                e.elder_id == elder_id && day >= from && day <= to
            })
            .await
    }
}

#[async_trait]
impl HealthRecordSink for HealthDataStore {
    async fn replace_blood_sugar(&self, record_id: RecordId, entries: Vec<BloodSugarEntry>) -> Result<usize> {
        let ids = &self.blood_sugar_ids;
        self.blood_sugar
            .write(|map| {
                map.retain(|_, e| e.call_record_id != record_id);
                let count = entries.len();
                for mut e in entries {
                    e.id = ids.next();
                    e.call_record_id = record_id;
                    map.insert(e.id, e);
                }
                Ok(count)
            })
            .await
    }

    async fn replace_medications(
        &self,
        record_id: RecordId,
        entries: Vec<MedicationTakenEntry>,
    ) -> Result<usize> {
        let ids = &self.medication_ids;
        self.medications
            .write(|map| {
                map.retain(|_, e| e.call_record_id != record_id);
                let count = entries.len();
                for mut e in entries {
                    e.id = ids.next();
                    e.call_record_id = record_id;
                    map.insert(e.id, e);
                }
                Ok(count)
            })
            .await
    }

    async fn replace_meals(&self, record_id: RecordId, entries: Vec<MealEntry>) -> Result<usize> {
        let ids = &self.meal_ids;
        self.meals
            .write(|map| {
                map.retain(|_, e| e.call_record_id != record_id);
                let count = entries.len();
                for mut e in entries {
                    e.id = ids.next();
                    e.call_record_id = record_id;
                    map.insert(e.id, e);
                }
                Ok(count)
            })
            .await
    }
}
