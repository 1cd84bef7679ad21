//! Classification of a call time into one of the three daily slots.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::care::{CallSetting, MedicationTime};
use crate::error::{Error, Result};

/// One of the three daily care-call windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSlot {
    First,
    Second,
    Third,
}

impl CallSlot {
    pub const ALL: [CallSlot; 3] = [CallSlot::First, CallSlot::Second, CallSlot::Third];

    /// 1-based call order.
    pub fn order(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    pub fn medication_time(self) -> MedicationTime {
        match self {
            Self::First => MedicationTime::Morning,
            Self::Second => MedicationTime::Lunch,
            Self::Third => MedicationTime::Dinner,
        }
    }

    /// Only the last call of the day may finalize the health summary.
    pub fn finalizes_health_status(self) -> bool {
        self == Self::Third
    }
}

impl std::fmt::Display for CallSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot{}", self.order())
    }
}

/// Resolve which slot `call_time` belongs to.
///
/// Windows are `[first, second)`, `[second, third)` and
/// `[third, 24:00) ∪ [00:00, first)`. The three times must be strictly
/// increasing within the day; anything else is rejected rather than
/// guessed.
pub fn resolve_slot(
    call_time: NaiveTime,
    first: NaiveTime,
    second: NaiveTime,
    third: NaiveTime,
) -> Result<CallSlot> {
    if !(first < second && second < third) {
        return Err(Error::MisconfiguredCallWindow(format!(
            "call times must be strictly ordered, got {} / {} / {}",
            first.format("%H:%M"),
            second.format("%H:%M"),
            third.format("%H:%M"),
        )));
    }

    if call_time >= first && call_time < second {
        Ok(CallSlot::First)
    } else if call_time >= second && call_time < third {
        Ok(CallSlot::Second)
    } else if call_time >= third || call_time < first {
        Ok(CallSlot::Third)
    } else {
        Err(Error::MisconfiguredCallWindow(format!(
            "no slot matches {}",
            call_time.format("%H:%M")
        )))
    }
}

impl CallSetting {
    pub fn slot_time(&self, slot: CallSlot) -> NaiveTime {
        match slot {
            CallSlot::First => self.first_call_time,
            CallSlot::Second => self.second_call_time,
            CallSlot::Third => self.third_call_time,
        }
    }

    pub fn resolve_slot(&self, call_time: NaiveTime) -> Result<CallSlot> {
        resolve_slot(
            call_time,
            self.first_call_time,
            self.second_call_time,
            self.third_call_time,
        )
        .map_err(|e| match e {
            Error::MisconfiguredCallWindow(msg) => {
                Error::MisconfiguredCallWindow(format!("setting {}: {msg}", self.id))
            }
            other => other,
        })
    }

    /// Reject settings whose times do not partition the day.
    pub fn validate(&self) -> Result<()> {
        self.resolve_slot(self.first_call_time).map(|_| ())
    }
}
