//! Call records and the health sub-records derived from them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::care::{ElderId, MedicationTime, SettingId};

pub type RecordId = i64;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status enums
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Final status of a call as reported by the telephony provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Completed,
    Failed,
    Busy,
    NoAnswer,
}

impl CallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Busy => "busy",
            Self::NoAnswer => "no-answer",
        }
    }

    pub fn is_missed(self) -> bool {
        self == Self::NoAnswer
    }
}

/// Categorical good/bad summary used for both mood and health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellbeingStatus {
    Good,
    Bad,
}

impl WellbeingStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "good" | "좋음" => Some(Self::Good),
            "bad" | "나쁨" => Some(Self::Bad),
            _ => None,
        }
    }
}

/// Where a record is in the post-call analysis state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    #[default]
    Ingested,
    Extracting,
    Enriched,
    ExtractionFailed,
    /// Nothing to analyze (blank transcript).
    Skipped,
}

impl AnalysisStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Enriched | Self::ExtractionFailed | Self::Skipped)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// CallRecord
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One actual call attempt. Created by the completion webhook and then
/// patched in place by the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: RecordId,
    pub elder_id: ElderId,
    pub setting_id: SettingId,
    /// Local wall-clock time of the call in the service timezone.
    pub called_at: NaiveDateTime,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: CallStatus,
    pub responded: bool,
    pub transcript: Option<String>,
    pub idempotency_key: String,

    // ── Derived by analysis ─────────────────────────────────────────
    #[serde(default)]
    pub sleep_start: Option<NaiveDateTime>,
    #[serde(default)]
    pub sleep_end: Option<NaiveDateTime>,
    #[serde(default)]
    pub psych_status: Option<WellbeingStatus>,
    #[serde(default)]
    pub psych_details: Option<String>,
    #[serde(default)]
    pub health_status: Option<WellbeingStatus>,
    #[serde(default)]
    pub health_details: Option<String>,
    #[serde(default)]
    pub ai_health_comment: Option<String>,
    #[serde(default)]
    pub ai_extracted_json: Option<String>,

    // ── Bookkeeping ─────────────────────────────────────────────────
    #[serde(default)]
    pub analysis: AnalysisStage,
    #[serde(default)]
    pub stats_updated: bool,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    pub fn call_date(&self) -> NaiveDate {
        self.called_at.date()
    }

    pub fn has_transcript(&self) -> bool {
        self.transcript
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// A partial update of a record's derived fields. Only `Some` fields are
/// written; everything else on the record is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub sleep_start: Option<NaiveDateTime>,
    pub sleep_end: Option<NaiveDateTime>,
    pub psych_status: Option<WellbeingStatus>,
    pub psych_details: Option<String>,
    pub health_status: Option<WellbeingStatus>,
    pub health_details: Option<String>,
    pub ai_health_comment: Option<String>,
    pub ai_extracted_json: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, record: &mut CallRecord) {
        if let Some(v) = self.sleep_start {
            record.sleep_start = Some(v);
        }
        if let Some(v) = self.sleep_end {
            record.sleep_end = Some(v);
        }
        if let Some(v) = self.psych_status {
            record.psych_status = Some(v);
        }
        if let Some(v) = self.psych_details {
            record.psych_details = Some(v);
        }
        if let Some(v) = self.health_status {
            record.health_status = Some(v);
        }
        if let Some(v) = self.health_details {
            record.health_details = Some(v);
        }
        if let Some(v) = self.ai_health_comment {
            record.ai_health_comment = Some(v);
        }
        if let Some(v) = self.ai_extracted_json {
            record.ai_extracted_json = Some(v);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sub-domain records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BloodSugarStatus {
    Low,
    Normal,
    High,
}

impl BloodSugarStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "NORMAL" => Some(Self::Normal),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    BeforeMeal,
    AfterMeal,
}

impl MeasurementType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "before_meal" | "before" | "fasting" | "식전" | "공복" => Some(Self::BeforeMeal),
            "after_meal" | "after" | "식후" => Some(Self::AfterMeal),
            _ => None,
        }
    }

    pub fn korean(self) -> &'static str {
        match self {
            Self::BeforeMeal => "식전",
            Self::AfterMeal => "식후",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodSugarEntry {
    pub id: i64,
    pub call_record_id: RecordId,
    pub elder_id: ElderId,
    pub measured_on: NaiveDate,
    pub measurement_type: Option<MeasurementType>,
    pub value: u32,
    pub status: Option<BloodSugarStatus>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakenStatus {
    Taken,
    NotTaken,
}

impl TakenStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "taken" | "복용함" => Some(Self::Taken),
            "not_taken" | "not taken" | "복용하지 않음" => Some(Self::NotTaken),
            _ => None,
        }
    }

    pub fn korean(self) -> &'static str {
        match self {
            Self::Taken => "복용함",
            Self::NotTaken => "복용하지 않음",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationTakenEntry {
    pub id: i64,
    pub call_record_id: RecordId,
    pub elder_id: ElderId,
    pub recorded_on: NaiveDate,
    /// Registered schedule this dose belongs to, when one matches.
    pub schedule_id: Option<i64>,
    pub name: String,
    pub taken_status: Option<TakenStatus>,
    pub taken_time: Option<MedicationTime>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "breakfast" | "morning" | "아침" => Some(Self::Breakfast),
            "lunch" | "점심" => Some(Self::Lunch),
            "dinner" | "evening" | "저녁" => Some(Self::Dinner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EatenStatus {
    Eaten,
    NotEaten,
}

impl EatenStatus {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "eaten" | "섭취함" => Some(Self::Eaten),
            "not_eaten" | "not eaten" | "섭취하지 않음" => Some(Self::NotEaten),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealEntry {
    pub id: i64,
    pub call_record_id: RecordId,
    pub elder_id: ElderId,
    pub recorded_at: NaiveDateTime,
    pub meal_type: MealType,
    /// `None` when the call did not establish whether the meal was eaten.
    pub eaten: Option<EatenStatus>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CallRecord {
        let at = NaiveDate::from_ymd_opt(2025, 7, 27)
            .unwrap()
            .and_hms_opt(21, 30, 0)
            .unwrap();
        CallRecord {
            id: 1,
            elder_id: 1,
            setting_id: 1,
            called_at: at,
            start_time: None,
            end_time: None,
            status: CallStatus::Completed,
            responded: true,
            transcript: Some("어르신: 잘 잤어요".into()),
            idempotency_key: "k".into(),
            sleep_start: None,
            sleep_end: None,
            psych_status: Some(WellbeingStatus::Good),
            psych_details: Some("기분 좋음".into()),
            health_status: None,
            health_details: None,
            ai_health_comment: None,
            ai_extracted_json: None,
            analysis: AnalysisStage::Ingested,
            stats_updated: false,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn call_status_uses_kebab_case_on_the_wire() {
        let s: CallStatus = serde_json::from_str(r#""no-answer""#).unwrap();
        assert_eq!(s, CallStatus::NoAnswer);
        assert!(s.is_missed());
        assert_eq!(serde_json::to_string(&CallStatus::Completed).unwrap(), r#""completed""#);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut r = record();
        RecordPatch {
            health_status: Some(WellbeingStatus::Bad),
            health_details: Some("두통".into()),
            ..Default::default()
        }
        .apply(&mut r);
        assert_eq!(r.health_status, Some(WellbeingStatus::Bad));
        assert_eq!(r.health_details.as_deref(), Some("두통"));
        // untouched
        assert_eq!(r.psych_status, Some(WellbeingStatus::Good));
        assert_eq!(r.psych_details.as_deref(), Some("기분 좋음"));
        assert!(r.sleep_start.is_none());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(RecordPatch::default().is_empty());
        let p = RecordPatch {
            ai_health_comment: Some("x".into()),
            ..Default::default()
        };
        assert!(!p.is_empty());
    }

    #[test]
    fn labels_accept_english_and_korean() {
        assert_eq!(WellbeingStatus::from_label("좋음"), Some(WellbeingStatus::Good));
        assert_eq!(WellbeingStatus::from_label("BAD"), Some(WellbeingStatus::Bad));
        assert_eq!(WellbeingStatus::from_label("보통"), None);
        assert_eq!(TakenStatus::from_label("복용하지 않음"), Some(TakenStatus::NotTaken));
        assert_eq!(TakenStatus::from_label("taken"), Some(TakenStatus::Taken));
        assert_eq!(MealType::from_label("저녁"), Some(MealType::Dinner));
        assert_eq!(EatenStatus::from_label("not_eaten"), Some(EatenStatus::NotEaten));
        assert_eq!(MeasurementType::from_label("공복"), Some(MeasurementType::BeforeMeal));
        assert_eq!(BloodSugarStatus::from_label("high"), Some(BloodSugarStatus::High));
    }

    #[test]
    fn transcript_blankness() {
        let mut r = record();
        assert!(r.has_transcript());
        r.transcript = Some("  \n ".into());
        assert!(!r.has_transcript());
        r.transcript = None;
        assert!(!r.has_transcript());
    }
}
