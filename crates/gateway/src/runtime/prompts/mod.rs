//! Slot-specific conversation strategies for outbound calls.
//!
//! Every strategy filters the medication schedule to its own time of day,
//! asks about blood glucose only for diabetic elders and appends the
//! guardian's health notes.

mod templates;

use cc_domain::care::{ElderProfile, MedicationTime};
use cc_domain::slot::CallSlot;
use regex::Regex;
use serde::Serialize;

/// Which script a call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStrategy {
    /// Morning: sleep, breakfast, morning medication.
    First,
    /// Lunch: meal and lunch medication.
    Second,
    /// Evening: dinner, evening medication, mood and health check.
    Third,
    /// On-demand call covering everything at once.
    Immediate,
}

/// Inputs shared by every strategy.
pub struct PromptContext<'a> {
    pub profile: &'a ElderProfile,
    /// Compiled once at startup from `prompts.diabetes_pattern`.
    pub diabetes: &'a Regex,
    pub fallback_name: &'a str,
}

impl CallStrategy {
    pub fn for_slot(slot: CallSlot) -> Self {
        match slot {
            CallSlot::First => Self::First,
            CallSlot::Second => Self::Second,
            CallSlot::Third => Self::Third,
        }
    }

    /// Medication time this strategy asks about; `None` means all of them.
    fn medication_time(self) -> Option<MedicationTime> {
        match self {
            Self::First => Some(MedicationTime::Morning),
            Self::Second => Some(MedicationTime::Lunch),
            Self::Third => Some(MedicationTime::Dinner),
            Self::Immediate => None,
        }
    }

    fn asks_glucose(self) -> bool {
        !matches!(self, Self::Second)
    }

    fn script(self) -> &'static str {
        match self {
            Self::First => templates::FIRST,
            Self::Second => templates::SECOND,
            Self::Third => templates::THIRD,
            Self::Immediate => templates::IMMEDIATE,
        }
    }

    pub fn generate(self, ctx: &PromptContext<'_>) -> String {
        let diabetic = self.asks_glucose() && has_diabetes(ctx.profile, ctx.diabetes);
        let (glucose_goal, glucose_flow) = if diabetic {
            (templates::GLUCOSE_GOAL, templates::GLUCOSE_FLOW)
        } else {
            ("", "")
        };

        let body = self
            .script()
            .replace("%MEDS%", &medication_list(ctx.profile, self.medication_time()))
            .replace("%NAME%", &address(ctx.profile, ctx.fallback_name))
            .replace("%GLUCOSE_GOAL%", glucose_goal)
            .replace("%GLUCOSE_FLOW%", glucose_flow);

        let mut prompt = String::with_capacity(body.len() + 512);
        prompt.push_str(templates::PERSONA);
        prompt.push('\n');
        prompt.push_str(&body);
        prompt.push_str("\n\n");
        prompt.push_str(templates::STYLE);
        if let Some(notes) = notes_section(ctx.profile) {
            prompt.push_str("\n\n");
            prompt.push_str(&notes);
        }
        prompt.push_str("\n\n");
        prompt.push_str(templates::CLOSING);
        prompt
    }
}

/// How the agent addresses the elder: `"<name> 어르신"`, or the fallback
/// alone when no name is registered.
fn address(profile: &ElderProfile, fallback: &str) -> String {
    let name = profile.elder.name.trim();
    if name.is_empty() {
        fallback.to_string()
    } else {
        format!("{name} 어르신")
    }
}

fn medication_list(profile: &ElderProfile, time: Option<MedicationTime>) -> String {
    let mut names: Vec<&str> = Vec::new();
    for m in &profile.medications {
        if time.is_some_and(|t| t != m.schedule_time) {
            continue;
        }
        let name = m.name.trim();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }

    if !names.is_empty() {
        return names.join(", ");
    }
    match time {
        Some(t) => format!("등록된 {} 복약 없음", t.korean()),
        None => "등록된 복약 없음".into(),
    }
}

fn has_diabetes(profile: &ElderProfile, pattern: &Regex) -> bool {
    profile.diseases.iter().any(|d| pattern.is_match(&d.name))
}

fn notes_section(profile: &ElderProfile) -> Option<String> {
    let notes: Vec<&str> = profile
        .health
        .as_ref()?
        .notes
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();
    if notes.is_empty() {
        return None;
    }
    let mut out = String::from(templates::NOTES_HEADER);
    for note in notes {
        out.push_str("\n- ");
        out.push_str(note);
    }
    Some(out)
}
