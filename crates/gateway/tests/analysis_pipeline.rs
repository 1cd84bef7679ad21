//! End-to-end pipeline runs over real stores with a scripted model.

mod common;

use cc_domain::error::Error;
use cc_domain::record::{AnalysisStage, EatenStatus, MealType, TakenStatus, WellbeingStatus};
use cc_gateway::runtime::analysis::{request_reanalysis, RunOutcome};
use chrono::NaiveDate;

use common::{completion, harness, harness_without_llm, seed_elder, EXTRACTION};

fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[tokio::test]
async fn retried_extraction_enriches_the_record() {
    let h = harness(vec![
        Err(Error::Http("502 bad gateway".into())),
        Ok("죄송합니다, 다시 말씀해 주세요".into()),
        Ok(EXTRACTION.into()),
    ])
    .await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    let (record, created) = h
        .state
        .ingester
        .ingest(completion(1, setting_id, "2025-07-28T12:30:00Z"))
        .await
        .unwrap();
    assert!(created);

    let outcome = h.state.pipeline.run(record.id).await.unwrap();
    assert_eq!(outcome, RunOutcome::Enriched);
    assert_eq!(h.llm.extractions(), 3);

    let record = h.state.records.get(record.id).await.unwrap();
    assert_eq!(record.analysis, AnalysisStage::Enriched);
    assert!(record.stats_updated);
    assert_eq!(record.psych_status, Some(WellbeingStatus::Good));
    assert_eq!(record.psych_details.as_deref(), Some("기분이 좋다고 하심"));
    // 21:30 local is the third slot, so health is finalized.
    assert_eq!(record.health_status, Some(WellbeingStatus::Bad));
    assert_eq!(record.health_details.as_deref(), Some("두통"));
    assert!(record.ai_health_comment.is_some());
    assert!(record.ai_extracted_json.is_some());
    assert_eq!(
        record.sleep_start,
        Some(day("2025-07-28").and_hms_opt(22, 0, 0).unwrap())
    );
    assert_eq!(
        record.sleep_end,
        Some(day("2025-07-29").and_hms_opt(6, 0, 0).unwrap())
    );

    let rows = h.state.health.for_record(record.id).await;
    assert_eq!(rows.blood_sugar.len(), 1, "null reading is skipped");
    assert_eq!(rows.blood_sugar[0].value, 145);
    assert_eq!(rows.medications.len(), 1, "blank medication name is skipped");
    assert_eq!(rows.medications[0].taken_status, Some(TakenStatus::Taken));
    assert!(rows.medications[0].schedule_id.is_some());
    assert_eq!(rows.meals.len(), 1, "unknown meal type is skipped");
    assert_eq!(rows.meals[0].meal_type, MealType::Dinner);
    assert_eq!(rows.meals[0].eaten, Some(EatenStatus::Eaten));

    let daily = h.state.stats.daily(1, day("2025-07-28")).await;
    assert_eq!(daily.completed_calls, 1);
    assert_eq!(daily.dinner, Some(true));
    assert_eq!(daily.medication_goal, 2);
    assert_eq!(daily.medication_taken, 1);
    assert_eq!(daily.avg_blood_sugar, Some(145));
    assert_eq!(daily.avg_sleep_minutes, Some(480));
    assert_eq!(daily.health_status, Some(WellbeingStatus::Bad));
    assert_eq!(daily.mental_status, Some(WellbeingStatus::Good));
}

#[tokio::test]
async fn exhausted_retries_keep_the_transcript() {
    let h = harness(vec![
        Err(Error::Timeout("slow".into())),
        Ok(String::new()),
        Ok("not json".into()),
    ])
    .await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    let (record, _) = h
        .state
        .ingester
        .ingest(completion(1, setting_id, "2025-07-28T12:30:00Z"))
        .await
        .unwrap();

    let outcome = h.state.pipeline.run(record.id).await.unwrap();
    assert_eq!(outcome, RunOutcome::ExtractionFailed);
    assert_eq!(h.llm.extractions(), 3);

    let record = h.state.records.get(record.id).await.unwrap();
    assert_eq!(record.analysis, AnalysisStage::ExtractionFailed);
    assert!(record.has_transcript());
    assert!(record.psych_status.is_none());
    assert!(record.health_status.is_none());
    assert!(record.ai_extracted_json.is_none());

    let rows = h.state.health.for_record(record.id).await;
    assert!(rows.blood_sugar.is_empty() && rows.medications.is_empty() && rows.meals.is_empty());
}

#[tokio::test]
async fn second_run_creates_no_duplicates() {
    let h = harness(vec![Ok(EXTRACTION.into()), Ok(EXTRACTION.into())]).await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    let (record, _) = h
        .state
        .ingester
        .ingest(completion(1, setting_id, "2025-07-28T12:30:00Z"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(h.state.pipeline.run(record.id), h.state.pipeline.run(record.id));
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| o.as_str());
    assert_eq!(outcomes, vec![RunOutcome::AlreadyProcessed, RunOutcome::Enriched]);
    assert_eq!(h.llm.extractions(), 1);

    let rows = h.state.health.for_record(record.id).await;
    assert_eq!(rows.blood_sugar.len(), 1);
    assert_eq!(rows.medications.len(), 1);
    assert_eq!(rows.meals.len(), 1);
}

#[tokio::test]
async fn reanalysis_replaces_derived_rows() {
    let h = harness(vec![Ok(EXTRACTION.into()), Ok(EXTRACTION.into())]).await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    let (record, _) = h
        .state
        .ingester
        .ingest(completion(1, setting_id, "2025-07-28T12:30:00Z"))
        .await
        .unwrap();
    h.state.pipeline.run(record.id).await.unwrap();

    let reset = request_reanalysis(
        &h.state.records,
        &h.state.health,
        &h.state.queue,
        &h.state.record_locks,
        record.id,
    )
    .await
    .unwrap();
    assert_eq!(reset.analysis, AnalysisStage::Ingested);
    assert!(reset.psych_status.is_none());
    assert!(h.state.health.for_record(record.id).await.meals.is_empty());

    assert_eq!(h.state.pipeline.run(record.id).await.unwrap(), RunOutcome::Enriched);
    let rows = h.state.health.for_record(record.id).await;
    assert_eq!(rows.blood_sugar.len(), 1);
    assert_eq!(rows.meals.len(), 1);
}

#[tokio::test]
async fn early_slots_leave_health_untouched() {
    let h = harness(vec![Ok(EXTRACTION.into())]).await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    // 00:30Z is 09:30 in Seoul: the first slot.
    let (record, _) = h
        .state
        .ingester
        .ingest(completion(1, setting_id, "2025-07-28T00:30:00Z"))
        .await
        .unwrap();

    assert_eq!(h.state.pipeline.run(record.id).await.unwrap(), RunOutcome::Enriched);
    let record = h.state.records.get(record.id).await.unwrap();
    assert_eq!(record.psych_status, Some(WellbeingStatus::Good));
    assert!(record.health_status.is_none());
    assert!(record.health_details.is_none());
    assert!(record.ai_health_comment.is_none());
    assert_eq!(h.llm.comment_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_transcript_is_skipped() {
    let h = harness(vec![]).await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    let mut payload = completion(1, setting_id, "2025-07-28T12:30:00Z");
    payload.status = cc_domain::record::CallStatus::NoAnswer;
    payload.responded = 0;
    payload.transcription = None;
    let (record, _) = h.state.ingester.ingest(payload).await.unwrap();

    assert_eq!(h.state.pipeline.run(record.id).await.unwrap(), RunOutcome::Skipped);
    assert_eq!(h.llm.extractions(), 0);

    let daily = h.state.stats.daily(1, day("2025-07-28")).await;
    assert_eq!(daily.missed_calls, 1);
    assert_eq!(daily.completed_calls, 0);
}

#[tokio::test]
async fn no_provider_fails_extraction_without_error() {
    let h = harness_without_llm().await;
    let setting_id = seed_elder(&h.state, 1, "김순자").await;
    let (record, _) = h
        .state
        .ingester
        .ingest(completion(1, setting_id, "2025-07-28T12:30:00Z"))
        .await
        .unwrap();

    assert_eq!(
        h.state.pipeline.run(record.id).await.unwrap(),
        RunOutcome::ExtractionFailed
    );
    let record = h.state.records.get(record.id).await.unwrap();
    assert_eq!(record.analysis, AnalysisStage::ExtractionFailed);
    assert!(record.stats_updated);
}
