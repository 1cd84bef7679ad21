//! Structured health signals extracted from a call transcript by the LLM.
//!
//! The model's output is loosely typed: lists may be `null`, numbers may
//! arrive as strings. Deserialization here is deliberately lenient so a
//! single odd field does not discard the whole extraction; the savers
//! apply the per-entry skip rules afterwards.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedHealthSignals {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub meal_data: Vec<MealSignal>,
    #[serde(default)]
    pub sleep_data: Option<SleepSignal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub psychological_state: Vec<String>,
    #[serde(default)]
    pub psychological_status: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub blood_sugar_data: Vec<BloodSugarSignal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub medication_data: Vec<MedicationSignal>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub health_signs: Vec<String>,
    #[serde(default)]
    pub health_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSignal {
    #[serde(default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub meal_eaten_status: Option<String>,
    #[serde(default)]
    pub meal_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSignal {
    #[serde(default)]
    pub sleep_start_time: Option<String>,
    #[serde(default)]
    pub sleep_end_time: Option<String>,
    #[serde(default)]
    pub total_sleep_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodSugarSignal {
    #[serde(default)]
    pub measurement_time: Option<String>,
    #[serde(default)]
    pub meal_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub blood_sugar_value: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSignal {
    #[serde(default)]
    pub medication_type: Option<String>,
    #[serde(default)]
    pub taken: Option<String>,
    #[serde(default)]
    pub taken_time: Option<String>,
}

impl ExtractedHealthSignals {
    /// True when the model found nothing worth persisting.
    pub fn is_empty(&self) -> bool {
        self.meal_data.is_empty()
            && self.sleep_data.is_none()
            && self.psychological_state.is_empty()
            && self.blood_sugar_data.is_empty()
            && self.medication_data.is_empty()
            && self.health_signs.is_empty()
    }
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

/// Accept `120`, `120.0`, `"120"` and `"120 mg/dL"`; anything else is `None`.
fn lenient_u32<'de, D>(d: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Some(serde_json::Value::String(s)) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    })
}
