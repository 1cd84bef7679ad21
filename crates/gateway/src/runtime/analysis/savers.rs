//! Sub-domain savers. Each one maps its slice of the extracted signals to
//! rows owned by the call record and hands them to the sink. A failing
//! saver is logged and counted; it never stops the others.

use cc_domain::care::{ElderProfile, MedicationTime};
use cc_domain::record::{
    BloodSugarEntry, BloodSugarStatus, CallRecord, EatenStatus, MealEntry, MealType, MeasurementType,
    MedicationTakenEntry, TakenStatus,
};
use cc_domain::signals::{BloodSugarSignal, ExtractedHealthSignals, MealSignal, MedicationSignal};

use crate::runtime::metrics::PipelineMetrics;
use crate::store::HealthRecordSink;

/// Rows written per kind. `None` when the kind was skipped or failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub blood_sugar: Option<usize>,
    pub medications: Option<usize>,
    pub meals: Option<usize>,
}

pub async fn save_all(
    sink: &dyn HealthRecordSink,
    record: &CallRecord,
    profile: Option<&ElderProfile>,
    signals: &ExtractedHealthSignals,
    metrics: &mut PipelineMetrics,
) -> SaveSummary {
    let mut summary = SaveSummary::default();

    if !signals.blood_sugar_data.is_empty() {
        let rows = blood_sugar_rows(record, &signals.blood_sugar_data);
        let res = sink.replace_blood_sugar(record.id, rows).await;
        summary.blood_sugar = settle("blood_sugar", record.id, res, metrics);
    }

    if !signals.medication_data.is_empty() {
        let rows = medication_rows(record, profile, &signals.medication_data);
        let res = sink.replace_medications(record.id, rows).await;
        summary.medications = settle("medication", record.id, res, metrics);
    }

    if !signals.meal_data.is_empty() {
        let rows = meal_rows(record, &signals.meal_data);
        let res = sink.replace_meals(record.id, rows).await;
        summary.meals = settle("meal", record.id, res, metrics);
    }

    summary
}

fn settle(
    kind: &'static str,
    record_id: i64,
    res: cc_domain::error::Result<usize>,
    metrics: &mut PipelineMetrics,
) -> Option<usize> {
    metrics.store_write(res.is_ok());
    match res {
        Ok(n) => {
            tracing::debug!(record_id, kind, rows = n, "health rows saved");
            Some(n)
        }
        Err(e) => {
            tracing::error!(record_id, kind, error = %e, "saving health rows failed");
            None
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

pub fn blood_sugar_rows(record: &CallRecord, signals: &[BloodSugarSignal]) -> Vec<BloodSugarEntry> {
    signals
        .iter()
        .filter_map(|s| {
            let value = s.blood_sugar_value?;
            let measurement_type = non_blank(s.meal_time.as_deref()).and_then(MeasurementType::from_label);
            let status = non_blank(s.status.as_deref()).and_then(BloodSugarStatus::from_label);

            let mut summary = String::new();
            if let Some(at) = non_blank(s.measurement_time.as_deref()) {
                summary.push_str(at);
                summary.push(' ');
            }
            if let Some(t) = measurement_type {
                summary.push_str(t.korean());
                summary.push(' ');
            }
            summary.push_str(&format!("{value}mg/dL"));

            Some(BloodSugarEntry {
                id: 0,
                call_record_id: record.id,
                elder_id: record.elder_id,
                measured_on: record.call_date(),
                measurement_type,
                value,
                status,
                summary,
            })
        })
        .collect()
}

pub fn medication_rows(
    record: &CallRecord,
    profile: Option<&ElderProfile>,
    signals: &[MedicationSignal],
) -> Vec<MedicationTakenEntry> {
    signals
        .iter()
        .filter_map(|s| {
            let name = non_blank(s.medication_type.as_deref())?;
            let taken_status = non_blank(s.taken.as_deref()).and_then(TakenStatus::from_label);
            let taken_time = non_blank(s.taken_time.as_deref()).and_then(MedicationTime::from_label);
            let schedule_id = match (profile, taken_time) {
                (Some(p), Some(time)) => p.find_schedule(name, time).map(|m| m.id),
                _ => None,
            };

            let summary = match (taken_time, taken_status) {
                (Some(t), Some(st)) => format!("{} {} {}", t.korean(), name, st.korean()),
                (None, Some(st)) => format!("{} {}", name, st.korean()),
                _ => name.to_string(),
            };

            Some(MedicationTakenEntry {
                id: 0,
                call_record_id: record.id,
                elder_id: record.elder_id,
                recorded_on: record.call_date(),
                schedule_id,
                name: name.to_string(),
                taken_status,
                taken_time,
                summary,
            })
        })
        .collect()
}

pub fn meal_rows(record: &CallRecord, signals: &[MealSignal]) -> Vec<MealEntry> {
    signals
        .iter()
        .filter_map(|s| {
            let meal_type = non_blank(s.meal_type.as_deref()).and_then(MealType::from_label)?;
            Some(MealEntry {
                id: 0,
                call_record_id: record.id,
                elder_id: record.elder_id,
                recorded_at: record.called_at,
                meal_type,
                eaten: non_blank(s.meal_eaten_status.as_deref()).and_then(EatenStatus::from_label),
                summary: non_blank(s.meal_summary.as_deref()).unwrap_or_default().to_string(),
            })
        })
        .collect()
}
