//! Tick windows and the matcher that finds the call slots due in one.

use std::collections::BTreeMap;

use cc_domain::care::{CallSetting, ElderId, ElderProfile, SettingId};
use cc_domain::slot::CallSlot;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Half-open `[start, end)` range of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TickWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// `[end - length, end)`.
    pub fn ending_at(end: NaiveDateTime, length: Duration) -> Self {
        Self { start: end - length, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether some calendar date in the window, combined with `time`,
    /// falls inside it. Handles windows that cross midnight.
    pub fn contains_time(&self, time: NaiveTime) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut date = self.start.date();
        let last = self.end.date();
        while date <= last {
            let candidate = date.and_time(time);
            if candidate >= self.start && candidate < self.end {
                return true;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        false
    }
}

/// One (setting, slot) pair to call in this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueCall {
    pub elder_id: ElderId,
    pub setting_id: SettingId,
    pub slot: CallSlot,
}

/// Find every slot whose configured time falls inside `window`.
///
/// Runs one pass per slot over the settings of activated elders. A
/// (setting, slot) pair is returned at most once per window.
pub fn match_due(window: &TickWindow, settings: &[(ElderProfile, CallSetting)]) -> Vec<DueCall> {
    let mut due: BTreeMap<(SettingId, CallSlot), DueCall> = BTreeMap::new();

    for slot in CallSlot::ALL {
        for (profile, setting) in settings {
            if !profile.elder.is_active() {
                continue;
            }
            if window.contains_time(setting.slot_time(slot)) {
                due.entry((setting.id, slot)).or_insert(DueCall {
                    elder_id: setting.elder_id,
                    setting_id: setting.id,
                    slot,
                });
            }
        }
    }

    due.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::care::{Elder, ElderStatus, Recurrence};
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn entry(id: i64, status: ElderStatus, times: (NaiveTime, NaiveTime, NaiveTime)) -> (ElderProfile, CallSetting) {
        (
            ElderProfile {
                elder: Elder {
                    id,
                    name: "김순자".into(),
                    phone: "01012345678".into(),
                    status,
                },
                health: None,
                diseases: vec![],
                medications: vec![],
            },
            CallSetting {
                id: id * 10,
                elder_id: id,
                first_call_time: times.0,
                second_call_time: times.1,
                third_call_time: times.2,
                recurrence: Recurrence::Daily,
            },
        )
    }

    #[test]
    fn window_is_half_open() {
        let w = TickWindow::new(at(27, 10, 0), at(27, 10, 10));
        assert!(w.contains_time(t(10, 0)));
        assert!(w.contains_time(t(10, 5)));
        assert!(!w.contains_time(t(10, 10)));

        let earlier = TickWindow::new(at(27, 9, 50), at(27, 10, 0));
        assert!(!earlier.contains_time(t(10, 5)));
    }

    #[test]
    fn window_across_midnight() {
        let w = TickWindow::new(at(27, 23, 50), at(28, 0, 10));
        assert!(w.contains_time(t(23, 55)));
        assert!(w.contains_time(t(0, 5)));
        assert!(!w.contains_time(t(0, 10)));
        assert!(!w.contains_time(t(12, 0)));
    }

    #[test]
    fn empty_window_matches_nothing() {
        let w = TickWindow::new(at(27, 10, 0), at(27, 10, 0));
        assert!(w.is_empty());
        assert!(!w.contains_time(t(10, 0)));
    }

    #[test]
    fn ending_at_subtracts_length() {
        let w = TickWindow::ending_at(at(27, 10, 10), Duration::minutes(10));
        assert_eq!(w.start, at(27, 10, 0));
    }

    #[test]
    fn matcher_skips_inactive_and_picks_the_right_slot() {
        let settings = vec![
            entry(1, ElderStatus::Activated, (t(10, 5), t(13, 0), t(21, 0))),
            entry(2, ElderStatus::Deactivated, (t(10, 5), t(13, 0), t(21, 0))),
            entry(3, ElderStatus::Activated, (t(8, 0), t(10, 2), t(21, 0))),
            entry(4, ElderStatus::Activated, (t(8, 0), t(13, 0), t(21, 0))),
        ];
        let w = TickWindow::new(at(27, 10, 0), at(27, 10, 10));
        let due = match_due(&w, &settings);
        assert_eq!(
            due,
            vec![
                DueCall { elder_id: 1, setting_id: 10, slot: CallSlot::First },
                DueCall { elder_id: 3, setting_id: 30, slot: CallSlot::Second },
            ]
        );
    }

    #[test]
    fn duplicate_settings_are_dispatched_once() {
        let one = entry(1, ElderStatus::Activated, (t(10, 5), t(13, 0), t(21, 0)));
        let settings = vec![one.clone(), one];
        let w = TickWindow::new(at(27, 10, 0), at(27, 10, 10));
        assert_eq!(match_due(&w, &settings).len(), 1);
    }
}
