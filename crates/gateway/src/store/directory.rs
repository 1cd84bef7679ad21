//! Elder profiles and their call settings.

use std::path::Path;

use cc_domain::care::{CallSetting, ElderId, ElderProfile, Recurrence, SettingId};
use cc_domain::error::{Error, Result};
use chrono::NaiveTime;

use super::{IdSequence, JsonTable, Keyed};

impl Keyed for ElderProfile {
    type Key = ElderId;
    fn key(&self) -> ElderId {
        self.elder.id
    }
}

impl Keyed for CallSetting {
    type Key = SettingId;
    fn key(&self) -> SettingId {
        self.id
    }
}

pub struct ElderDirectory {
    profiles: JsonTable<ElderProfile>,
    settings: JsonTable<CallSetting>,
    setting_ids: IdSequence,
    medication_ids: IdSequence,
}

impl ElderDirectory {
    pub async fn open(dir: &Path) -> Result<Self> {
        let profiles = JsonTable::<ElderProfile>::open(dir, "elders")?;
        let settings = JsonTable::<CallSetting>::open(dir, "call_settings")?;

        let setting_ids = IdSequence::after(settings.list().await.iter().map(|s| s.id).max());
        let medication_ids = IdSequence::after(
            profiles
                .list()
                .await
                .iter()
                .flat_map(|p| p.medications.iter().map(|m| m.id))
                .max(),
        );

        Ok(Self {
            profiles,
            settings,
            setting_ids,
            medication_ids,
        })
    }

    pub async fn profile(&self, elder_id: ElderId) -> Option<ElderProfile> {
        self.profiles.get(&elder_id).await
    }

    /// Insert or replace an elder's profile.
    ///
    /// Medication entries with a non-positive id keep the id of the stored
    /// entry with the same name and time, else get a fresh one.
    pub async fn put_profile(&self, mut profile: ElderProfile) -> Result<ElderProfile> {
        if profile.elder.name.trim().is_empty() {
            return Err(Error::InvalidInput("elder name must not be empty".into()));
        }
        if profile.elder.phone.trim().is_empty() {
            return Err(Error::InvalidInput("elder phone must not be empty".into()));
        }
        if profile.medications.iter().any(|m| m.name.trim().is_empty()) {
            return Err(Error::InvalidInput("medication name must not be empty".into()));
        }

        let elder_id = profile.elder.id;
        let saved = self
            .profiles
            .write(|rows| {
                let previous = rows.get(&elder_id).map(|p| p.medications.as_slice()).unwrap_or_default();
                let mut claimed: Vec<i64> = profile.medications.iter().map(|m| m.id).filter(|id| *id > 0).collect();
                for med in &mut profile.medications {
                    if med.id > 0 {
                        continue;
                    }
                    let reused = previous
                        .iter()
                        .find(|p| p.name == med.name && p.schedule_time == med.schedule_time && !claimed.contains(&p.id))
                        .map(|p| p.id);
                    med.id = reused.unwrap_or_else(|| self.medication_ids.next());
                    claimed.push(med.id);
                }
                rows.insert(elder_id, profile.clone());
                Ok(profile)
            })
            .await?;

        tracing::info!(elder_id, "elder profile saved");
        Ok(saved)
    }

    pub async fn setting(&self, setting_id: SettingId) -> Option<CallSetting> {
        self.settings.get(&setting_id).await
    }

    pub async fn setting_for_elder(&self, elder_id: ElderId) -> Option<CallSetting> {
        self.settings
            .filter(|s| s.elder_id == elder_id)
            .await
            .into_iter()
            .next()
    }

    /// Create or edit the elder's call setting.
    ///
    /// The elder keeps a single setting; an edit reuses its id so call
    /// records keep pointing at it. Times that are not strictly ordered
    /// are rejected with `MisconfiguredCallWindow`.
    pub async fn put_setting(
        &self,
        elder_id: ElderId,
        first: NaiveTime,
        second: NaiveTime,
        third: NaiveTime,
    ) -> Result<CallSetting> {
        if self.profile(elder_id).await.is_none() {
            return Err(Error::NotFound(format!("elder {elder_id}")));
        }

        // Lookup and insert share the table lock, so concurrent edits
        // cannot both mint a new setting for the same elder.
        let setting = self
            .settings
            .write(|rows| {
                let existing = rows.values().find(|s| s.elder_id == elder_id).map(|s| s.id);
                let mut setting = CallSetting {
                    id: existing.unwrap_or_default(),
                    elder_id,
                    first_call_time: first,
                    second_call_time: second,
                    third_call_time: third,
                    recurrence: Recurrence::Daily,
                };
                setting.validate()?;
                if existing.is_none() {
                    setting.id = self.setting_ids.next();
                }
                rows.insert(setting.id, setting.clone());
                Ok(setting)
            })
            .await?;

        let id = setting.id;
        tracing::info!(
            elder_id,
            setting_id = id,
            first = %first.format("%H:%M"),
            second = %second.format("%H:%M"),
            third = %third.format("%H:%M"),
            "call setting saved"
        );
        Ok(setting)
    }

    /// Settings of activated elders, paired with their profile.
    pub async fn active_settings(&self) -> Vec<(ElderProfile, CallSetting)> {
        let settings = self.settings.list().await;
        let mut out = Vec::with_capacity(settings.len());
        for setting in settings {
            if let Some(profile) = self.profile(setting.elder_id).await {
                if profile.elder.is_active() {
                    out.push((profile, setting));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::care::{Elder, ElderStatus, MedicationSchedule, MedicationTime};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn profile(id: ElderId, status: ElderStatus) -> ElderProfile {
        ElderProfile {
            elder: Elder {
                id,
                name: format!("elder-{id}"),
                phone: "010-0000-0000".into(),
                status,
            },
            health: None,
            diseases: vec![],
            medications: vec![MedicationSchedule {
                id: 0,
                name: "혈압약".into(),
                schedule_time: MedicationTime::Morning,
            }],
        }
    }

    #[tokio::test]
    async fn setting_edit_keeps_its_id() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();

        let created = directory.put_setting(1, t(8, 0), t(13, 0), t(21, 0)).await.unwrap();
        let edited = directory.put_setting(1, t(9, 0), t(14, 0), t(20, 0)).await.unwrap();
        assert_eq!(created.id, edited.id);
        assert_eq!(directory.setting(created.id).await.unwrap().first_call_time, t(9, 0));
    }

    #[tokio::test]
    async fn misordered_edit_is_rejected_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();
        directory.put_setting(1, t(8, 0), t(13, 0), t(21, 0)).await.unwrap();

        let err = directory.put_setting(1, t(13, 0), t(8, 0), t(21, 0)).await.unwrap_err();
        assert!(matches!(err, Error::MisconfiguredCallWindow(_)));
        assert_eq!(directory.setting_for_elder(1).await.unwrap().first_call_time, t(8, 0));
    }

    #[tokio::test]
    async fn setting_for_unknown_elder_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        let err = directory.put_setting(5, t(8, 0), t(13, 0), t(21, 0)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn only_activated_elders_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();
        directory.put_profile(profile(2, ElderStatus::Deactivated)).await.unwrap();
        directory.put_setting(1, t(8, 0), t(13, 0), t(21, 0)).await.unwrap();
        directory.put_setting(2, t(8, 0), t(13, 0), t(21, 0)).await.unwrap();

        let active = directory.active_settings().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0.elder.id, 1);
    }

    #[tokio::test]
    async fn medication_ids_are_assigned_and_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        {
            let directory = ElderDirectory::open(dir.path()).await.unwrap();
            let saved = directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();
            assert_eq!(saved.medications[0].id, 1);
        }
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        let saved = directory.put_profile(profile(2, ElderStatus::Activated)).await.unwrap();
        assert_eq!(saved.medications[0].id, 2);
    }

    #[tokio::test]
    async fn profile_edit_keeps_medication_ids() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        let first = directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();
        let kept_id = first.medications[0].id;

        // Clients resend the list without ids.
        let mut edit = profile(1, ElderStatus::Activated);
        edit.medications.push(MedicationSchedule {
            id: 0,
            name: "당뇨약".into(),
            schedule_time: MedicationTime::Dinner,
        });
        let second = directory.put_profile(edit).await.unwrap();
        assert_eq!(second.medications[0].id, kept_id);
        assert!(second.medications[1].id > kept_id);

        let ids = |p: &ElderProfile| p.medications.iter().map(|m| m.id).collect::<Vec<_>>();
        let again = directory.put_profile(second.clone()).await.unwrap();
        assert_eq!(ids(&again), ids(&second));
    }

    #[tokio::test]
    async fn duplicate_medications_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();

        let mut edit = profile(1, ElderStatus::Activated);
        edit.medications.push(edit.medications[0].clone());
        let saved = directory.put_profile(edit).await.unwrap();
        assert_ne!(saved.medications[0].id, saved.medications[1].id);
    }

    #[tokio::test]
    async fn concurrent_first_settings_share_one_id() {
        let dir = tempfile::tempdir().unwrap();
        let directory = std::sync::Arc::new(ElderDirectory::open(dir.path()).await.unwrap());
        directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();

        let mut handles = Vec::new();
        for h in 8..12 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory.put_setting(1, t(h, 0), t(13, 0), t(21, 0)).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(directory.settings.list().await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_setting_does_not_consume_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        directory.put_profile(profile(1, ElderStatus::Activated)).await.unwrap();

        assert!(directory.put_setting(1, t(13, 0), t(8, 0), t(21, 0)).await.is_err());
        let created = directory.put_setting(1, t(8, 0), t(13, 0), t(21, 0)).await.unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn blank_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ElderDirectory::open(dir.path()).await.unwrap();
        let mut p = profile(1, ElderStatus::Activated);
        p.elder.name = "  ".into();
        assert!(matches!(
            directory.put_profile(p).await.unwrap_err(),
            Error::InvalidInput(_)
        ));
    }
}
