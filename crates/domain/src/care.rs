use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub type ElderId = i64;
pub type SettingId = i64;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Elder profile
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElderStatus {
    #[default]
    Activated,
    Deactivated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Elder {
    pub id: ElderId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub status: ElderStatus,
}

impl Elder {
    pub fn is_active(&self) -> bool {
        self.status == ElderStatus::Activated
    }
}

/// Free-form health notes a guardian registered for the elder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthProfile {
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub name: String,
}

/// Time-of-day tag of a medication dose. Each call slot asks about the
/// doses tagged with its own time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MedicationTime {
    Morning,
    Lunch,
    Dinner,
}

impl MedicationTime {
    /// Accepts the English tokens used in extraction output as well as the
    /// Korean labels guardians and older prompts use.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "morning" | "breakfast" | "아침" => Some(Self::Morning),
            "lunch" | "noon" | "점심" => Some(Self::Lunch),
            "dinner" | "evening" | "저녁" => Some(Self::Dinner),
            _ => None,
        }
    }

    pub fn korean(self) -> &'static str {
        match self {
            Self::Morning => "아침",
            Self::Lunch => "점심",
            Self::Dinner => "저녁",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationSchedule {
    pub id: i64,
    pub name: String,
    pub schedule_time: MedicationTime,
}

/// Everything registered about one elder. Stored as a single aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElderProfile {
    pub elder: Elder,
    #[serde(default)]
    pub health: Option<HealthProfile>,
    #[serde(default)]
    pub diseases: Vec<Disease>,
    #[serde(default)]
    pub medications: Vec<MedicationSchedule>,
}

impl ElderProfile {
    /// Distinct medication names in registration order.
    pub fn medication_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for m in &self.medications {
            let name = m.name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Find the schedule entry a reported dose belongs to.
    pub fn find_schedule(&self, name: &str, time: MedicationTime) -> Option<&MedicationSchedule> {
        let name = name.trim();
        self.medications
            .iter()
            .find(|m| m.name.trim() == name && m.schedule_time == time)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Call setting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    Daily,
}

/// The three daily call times of one elder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSetting {
    pub id: SettingId,
    pub elder_id: ElderId,
    #[serde(with = "hhmm")]
    pub first_call_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub second_call_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub third_call_time: NaiveTime,
    #[serde(default)]
    pub recurrence: Recurrence,
}

/// `HH:mm` (de)serialization for times of day. Seconds are accepted on
/// input and dropped.
pub mod hhmm {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid HH:mm time: {raw}")))
    }

    /// Parse `H:mm`, `HH:mm` or `HH:mm:ss`, truncating to the minute.
    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
            .and_then(|t| t.with_second(0))
    }
}
