//! CallRecord storage.
//!
//! Records are written once by the completion webhook and afterwards only
//! through the stage and patch helpers here. `version` is bumped on every
//! mutation; [`CallRecordStore::apply_patch`] refuses to write over a
//! version it did not read.

use std::path::Path;

use cc_domain::care::ElderId;
use cc_domain::error::{Error, Result};
use cc_domain::record::{AnalysisStage, CallRecord, RecordId, RecordPatch};
use chrono::{DateTime, NaiveDate, Utc};

use super::{IdSequence, JsonTable, Keyed};

impl Keyed for CallRecord {
    type Key = RecordId;
    fn key(&self) -> RecordId {
        self.id
    }
}

pub struct CallRecordStore {
    table: JsonTable<CallRecord>,
    ids: IdSequence,
}

impl CallRecordStore {
    pub async fn open(dir: &Path) -> Result<Self> {
        let table = JsonTable::<CallRecord>::open(dir, "call_records")?;
        let ids = IdSequence::after(table.list().await.iter().map(|r| r.id).max());
        Ok(Self { table, ids })
    }

    /// Insert `record` unless one with the same idempotency key exists.
    ///
    /// The id of `record` is ignored and assigned here. Returns the stored
    /// record and whether it was newly created.
    pub async fn insert_unique(&self, mut record: CallRecord) -> Result<(CallRecord, bool)> {
        let ids = &self.ids;
        self.table
            .write(|map| {
                if let Some(existing) = map
                    .values()
                    .find(|r| r.idempotency_key == record.idempotency_key)
                {
                    return Ok((existing.clone(), false));
                }
                record.id = ids.next();
                record.version = 1;
                map.insert(record.id, record.clone());
                Ok((record, true))
            })
            .await
    }

    pub async fn get(&self, id: RecordId) -> Option<CallRecord> {
        self.table.get(&id).await
    }

    /// Records of one elder on a local calendar date, oldest first.
    pub async fn list_for_elder_on(&self, elder_id: ElderId, date: NaiveDate) -> Vec<CallRecord> {
        self.list_for_elder_between(elder_id, date, date).await
    }

    /// Records of one elder between two local dates (inclusive), oldest first.
    pub async fn list_for_elder_between(
        &self,
        elder_id: ElderId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<CallRecord> {
        let mut rows = self
            .table
            .filter(|r| r.elder_id == elder_id && r.call_date() >= from && r.call_date() <= to)
            .await;
        rows.sort_by_key(|r| (r.called_at, r.id));
        rows
    }

    pub async fn set_stage(&self, id: RecordId, stage: AnalysisStage) -> Result<CallRecord> {
        self.table
            .update(&id, |r| {
                r.analysis = stage;
                touch(r);
                Ok(r.clone())
            })
            .await
    }

    /// Apply the analysis patch and move the record to `stage`.
    ///
    /// Fails with `Conflict` when the stored version no longer matches
    /// `expected_version`.
    pub async fn apply_patch(
        &self,
        id: RecordId,
        expected_version: u64,
        patch: RecordPatch,
        stage: AnalysisStage,
    ) -> Result<CallRecord> {
        self.table
            .update(&id, |r| {
                if r.version != expected_version {
                    return Err(Error::Conflict(format!(
                        "call record {id} is at version {}, expected {expected_version}",
                        r.version
                    )));
                }
                patch.apply(r);
                r.analysis = stage;
                touch(r);
                Ok(r.clone())
            })
            .await
    }

    pub async fn mark_stats_updated(&self, id: RecordId) -> Result<()> {
        self.table
            .update(&id, |r| {
                r.stats_updated = true;
                touch(r);
                Ok(())
            })
            .await
    }

    /// Clear every derived field and put the record back at `ingested`.
    /// The raw call data is kept.
    pub async fn reset_for_reanalysis(&self, id: RecordId) -> Result<CallRecord> {
        self.table
            .update(&id, |r| {
                r.sleep_start = None;
                r.sleep_end = None;
                r.psych_status = None;
                r.psych_details = None;
                r.health_status = None;
                r.health_details = None;
                r.ai_health_comment = None;
                r.ai_extracted_json = None;
                r.analysis = AnalysisStage::Ingested;
                r.stats_updated = false;
                touch(r);
                Ok(r.clone())
            })
            .await
    }

    /// Ids of records stuck in `ingested`/`extracting` since before `cutoff`.
    pub async fn pending_older_than(&self, cutoff: DateTime<Utc>) -> Vec<RecordId> {
        self.table
            .filter(|r| {
                matches!(r.analysis, AnalysisStage::Ingested | AnalysisStage::Extracting)
                    && r.updated_at < cutoff
            })
            .await
            .into_iter()
            .map(|r| r.id)
            .collect()
    }
}

fn touch(r: &mut CallRecord) {
    r.version += 1;
    r.updated_at = Utc::now();
}
