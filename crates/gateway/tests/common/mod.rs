//! Shared fixtures: scripted LLM and telephony doubles plus a fully
//! wired [`AppState`] over a temporary state directory.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cc_domain::care::{Elder, ElderProfile, ElderStatus, MedicationSchedule, MedicationTime};
use cc_domain::config::Config;
use cc_domain::error::{Error, Result};
use cc_domain::record::CallStatus;
use cc_gateway::bootstrap::assemble_app_state;
use cc_gateway::runtime::dispatch::{OutboundCall, TelephonyClient};
use cc_gateway::runtime::ingest::{CallCompletion, TranscriptSegment, Transcription};
use cc_gateway::state::AppState;
use cc_providers::{ChatRequest, ChatResponse, LlmProvider, ProviderRegistry};
use chrono::{DateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use tempfile::TempDir;

// ── LLM double ───────────────────────────────────────────────────────

/// Answers extraction requests (`json_mode`) from a script, one entry
/// per call; an exhausted script fails. Free-text requests get `comment`.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String>>>,
    comment: String,
    pub extraction_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            comment: "두통이 있으시니 충분히 쉬시도록 살펴 주세요.".into(),
            extraction_calls: AtomicUsize::new(0),
            comment_calls: AtomicUsize::new(0),
        }
    }

    pub fn extractions(&self) -> usize {
        self.extraction_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let content = if req.json_mode {
            self.extraction_calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Http("script exhausted".into())))?
        } else {
            self.comment_calls.fetch_add(1, Ordering::SeqCst);
            self.comment.clone()
        };
        Ok(ChatResponse {
            content,
            usage: None,
            model: "scripted".into(),
            finish_reason: Some("stop".into()),
        })
    }

    fn provider_id(&self) -> &str {
        "mock"
    }
}

// ── Telephony double ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingTelephony {
    pub calls: Mutex<Vec<OutboundCall>>,
    /// Elder ids whose calls fail.
    pub failing: Mutex<Vec<i64>>,
}

impl RecordingTelephony {
    pub fn placed(&self) -> Vec<OutboundCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TelephonyClient for RecordingTelephony {
    async fn place_call(&self, call: &OutboundCall) -> Result<()> {
        if self.failing.lock().contains(&call.elder_id) {
            return Err(Error::ExternalCall("telephony returned 503".into()));
        }
        self.calls.lock().push(call.clone());
        Ok(())
    }
}

// ── Harness ──────────────────────────────────────────────────────────

pub struct Harness {
    pub state: AppState,
    pub llm: Arc<ScriptedLlm>,
    pub telephony: Arc<RecordingTelephony>,
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.state_path = dir.path().to_path_buf();
    config.analysis.backoff_ms = 1;
    config.analysis.attempt_timeout_ms = 5_000;
    config.server.api_token_env = String::new();
    config.server.call_data_secret_env = String::new();
    config
}

pub async fn harness(script: Vec<Result<String>>) -> Harness {
    harness_with(script, |_| {}).await
}

pub async fn harness_with(script: Vec<Result<String>>, tweak: impl FnOnce(&mut Config)) -> Harness {
    let llm = Arc::new(ScriptedLlm::new(script));
    let registry = ProviderRegistry::from_providers(
        vec![llm.clone() as Arc<dyn LlmProvider>],
        [
            ("extractor".to_string(), "mock/test-model".to_string()),
            ("summarizer".to_string(), "mock/test-model".to_string()),
        ],
    );
    build(registry, llm, tweak).await
}

/// No provider registered at all; `llm` is never consulted.
pub async fn harness_without_llm() -> Harness {
    build(ProviderRegistry::default(), Arc::new(ScriptedLlm::new(vec![])), |_| {}).await
}

async fn build(registry: ProviderRegistry, llm: Arc<ScriptedLlm>, tweak: impl FnOnce(&mut Config)) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    tweak(&mut config);
    let telephony = Arc::new(RecordingTelephony::default());

    let state = assemble_app_state(Arc::new(config), Arc::new(registry), telephony.clone())
        .await
        .unwrap();
    Harness {
        state,
        llm,
        telephony,
        _dir: dir,
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

pub fn hm(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// Registers an elder on metformin in the morning and evening, with call
/// times 09:00 / 13:00 / 21:00. Returns the setting id.
pub async fn seed_elder(state: &AppState, elder_id: i64, name: &str) -> i64 {
    state
        .directory
        .put_profile(ElderProfile {
            elder: Elder {
                id: elder_id,
                name: name.into(),
                phone: "010-1234-5678".into(),
                status: ElderStatus::Activated,
            },
            health: None,
            diseases: vec![],
            medications: vec![
                MedicationSchedule {
                    id: 0,
                    name: "메트포르민".into(),
                    schedule_time: MedicationTime::Morning,
                },
                MedicationSchedule {
                    id: 0,
                    name: "메트포르민".into(),
                    schedule_time: MedicationTime::Dinner,
                },
            ],
        })
        .await
        .unwrap();
    state
        .directory
        .put_setting(elder_id, hm("09:00"), hm("13:00"), hm("21:00"))
        .await
        .unwrap()
        .id
}

/// A completed call with a short transcript. `start` is UTC; the service
/// timezone is Asia/Seoul, so 12:30Z lands in the 21:00 slot.
pub fn completion(elder_id: i64, setting_id: i64, start: &str) -> CallCompletion {
    let start: DateTime<Utc> = start.parse().unwrap();
    CallCompletion {
        elder_id,
        setting_id,
        status: CallStatus::Completed,
        start_time: Some(start),
        end_time: Some(start + chrono::Duration::minutes(4)),
        responded: 1,
        transcription: Some(Transcription {
            language: Some("ko".into()),
            full_text: vec![
                TranscriptSegment {
                    speaker: Some("AI".into()),
                    text: Some("오늘 하루 어떠셨어요?".into()),
                },
                TranscriptSegment {
                    speaker: Some("어르신".into()),
                    text: Some("저녁 잘 먹었고 약도 먹었어. 머리가 좀 아파.".into()),
                },
            ],
        }),
    }
}

pub const EXTRACTION: &str = r#"{
  "date": "2025-07-28",
  "mealData": [
    {"mealType": "저녁", "mealEatenStatus": "섭취함", "mealSummary": "된장찌개"},
    {"mealType": "간식", "mealEatenStatus": "섭취함", "mealSummary": "떡"}
  ],
  "sleepData": {"sleepStartTime": "22:00", "sleepEndTime": "06:00", "totalSleepTime": "8시간"},
  "psychologicalState": ["기분이 좋다고 하심"],
  "psychologicalStatus": "좋음",
  "bloodSugarData": [
    {"measurementTime": "저녁", "mealTime": "식후", "bloodSugarValue": 145, "status": "NORMAL"},
    {"measurementTime": "아침", "mealTime": "식전", "bloodSugarValue": null, "status": null}
  ],
  "medicationData": [
    {"medicationType": "메트포르민", "taken": "복용함", "takenTime": "저녁"},
    {"medicationType": "", "taken": "복용함", "takenTime": "아침"}
  ],
  "healthSigns": ["두통"],
  "healthStatus": "나쁨"
}"#;
