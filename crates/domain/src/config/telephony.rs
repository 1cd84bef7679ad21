use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Telephony
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Endpoint receiving outbound call requests. Dispatch fails with
    /// `ExternalCall` while unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "d_30")]
    pub timeout_secs: u64,
    /// Replaces the trunk `0` of locally formatted numbers.
    #[serde(default = "d_country_code")]
    pub country_code: String,
    #[serde(default = "d_user_agent")]
    pub user_agent: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
            country_code: d_country_code(),
            user_agent: d_user_agent(),
        }
    }
}

fn d_30() -> u64 {
    30
}
fn d_country_code() -> String {
    "+82".into()
}
fn d_user_agent() -> String {
    concat!("carecall/", env!("CARGO_PKG_VERSION")).into()
}
