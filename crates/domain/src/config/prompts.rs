use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation prompts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Regex matched against each disease name. A match adds the blood
    /// glucose question to the morning, evening and immediate calls.
    #[serde(default = "d_diabetes_pattern")]
    pub diabetes_pattern: String,
    /// Used in place of a blank elder name.
    #[serde(default = "d_fallback_name")]
    pub fallback_elder_name: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            diabetes_pattern: d_diabetes_pattern(),
            fallback_elder_name: d_fallback_name(),
        }
    }
}

fn d_diabetes_pattern() -> String {
    "(?i)(당뇨|diabetes)".into()
}
fn d_fallback_name() -> String {
    "어르신".into()
}
