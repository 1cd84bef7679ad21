//! LLM messages for health-signal extraction and the symptom comment.

use cc_domain::chat::Message;
use chrono::NaiveDate;

const EXTRACTION_SYSTEM: &str = "당신은 어르신 안부 전화 기록에서 건강 데이터를 추출하는 전문가입니다. \
통화 내용에 실제로 언급된 정보만 사용하고, 알 수 없는 값은 null로 두세요. \
반드시 지정된 JSON 객체 하나로만 응답하세요.";

const RESPONSE_SHAPE: &str = r#"응답 JSON 구조:
{
  "date": "YYYY-MM-DD",
  "mealData": [{"mealType": "breakfast|lunch|dinner", "mealEatenStatus": "eaten|not_eaten", "mealSummary": "식사 요약"}],
  "sleepData": {"sleepStartTime": "HH:mm", "sleepEndTime": "HH:mm", "totalSleepTime": "예: 8시간"} | null,
  "psychologicalState": ["심리 상태를 요약한 짧은 문장"],
  "psychologicalStatus": "good|bad" | null,
  "bloodSugarData": [{"measurementTime": "측정 시각", "mealTime": "before_meal|after_meal", "bloodSugarValue": 120, "status": "LOW|NORMAL|HIGH"}],
  "medicationData": [{"medicationType": "약 이름", "taken": "taken|not_taken", "takenTime": "morning|lunch|dinner"}],
  "healthSigns": ["건강 징후를 요약한 짧은 문장"],
  "healthStatus": "good|bad" | null
}"#;

/// System + user messages for one extraction attempt.
pub fn extraction_messages(call_date: NaiveDate, transcript: &str, medication_names: &[String]) -> Vec<Message> {
    let meds = if medication_names.is_empty() {
        "등록된 약 없음".to_string()
    } else {
        medication_names.join(", ")
    };

    let user = format!(
        "다음 통화 내용에서 건강 데이터를 추출하세요.\n\n\
         통화 날짜: {date}\n\
         통화 언어: 한국어\n\
         통화 내용:\n{transcript}\n\n\
         추출 규칙:\n\
         - 식사: 끼니 종류, 식사 여부, 간단한 요약\n\
         - 수면: 취침 시각과 기상 시각 (HH:mm), 총 수면 시간\n\
         - 심리 상태: 짧은 문장 목록과 good/bad 요약\n\
         - 혈당: 측정 시각, 식전/식후, 수치(mg/dL), 식전/식후를 고려한 LOW/NORMAL/HIGH\n\
         - 복약: 약 이름, 복용 여부, 복용 시간\n\
         - 건강 징후: 짧은 문장 목록과 good/bad 요약\n\n\
         약 이름은 다음 목록의 명칭을 사용하세요: [{meds}]. \
         목록에 없는 약이면 가장 비슷한 이름으로 맞추고, 불가능하면 언급된 이름을 그대로 쓰세요.\n\
         혈당을 여러 번 쟀거나 약을 여러 종류 드셨다면 각각을 별도의 객체로 나누어 배열에 담으세요. \
         한 필드에 여러 정보를 합치지 마세요.\n\n\
         {shape}",
        date = call_date.format("%Y-%m-%d"),
        shape = RESPONSE_SHAPE,
    );

    vec![Message::system(EXTRACTION_SYSTEM), Message::user(user)]
}

const SYMPTOM_SYSTEM: &str = "당신은 보호자에게 보내는 비의료적 안내 코멘트를 작성합니다. \
증상을 종합해 주의가 필요한 신호를 부드럽게 알리고, 보호자가 바로 할 수 있는 권고 한 가지를 담아 \
공백 포함 100자 내외의 존댓말 한 문장으로 작성하세요. 진단을 단정하지 마세요.";

/// Messages for the one-sentence symptom comment. `None` when there is
/// nothing to summarize.
pub fn symptom_messages(symptoms: &[String]) -> Option<Vec<Message>> {
    if symptoms.is_empty() {
        return None;
    }
    let user = format!(
        "다음은 어르신이 오늘 말씀하신 증상입니다. 한 문장으로 정리해 주세요.\n\n[증상 목록]\n{}",
        symptoms.join(", ")
    );
    Some(vec![Message::system(SYMPTOM_SYSTEM), Message::user(user)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_domain::chat::Role;

    #[test]
    fn extraction_prompt_carries_date_transcript_and_meds() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 27).unwrap();
        let msgs = extraction_messages(date, "어르신: 혈압약 먹었어요", &["혈압약".into(), "당뇨약".into()]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        let user = &msgs[1].content;
        assert!(user.contains("2025-07-27"));
        assert!(user.contains("어르신: 혈압약 먹었어요"));
        assert!(user.contains("[혈압약, 당뇨약]"));
        assert!(user.contains("\"bloodSugarData\""));
    }

    #[test]
    fn no_medication_uses_placeholder() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 27).unwrap();
        let msgs = extraction_messages(date, "x", &[]);
        assert!(msgs[1].content.contains("[등록된 약 없음]"));
    }

    #[test]
    fn symptom_prompt_needs_symptoms() {
        assert!(symptom_messages(&[]).is_none());
        let msgs = symptom_messages(&["두통".into(), "어지러움".into()]).unwrap();
        assert!(msgs[1].content.ends_with("두통, 어지러움"));
    }
}
