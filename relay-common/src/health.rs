//! Typed view of the gateway `health` payload.
//!
//! The gateway returns more than this; only the fields the dashboard renders
//! are modelled and everything is optional.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Session key of the operator's main agent session.
pub const MAIN_SESSION_KEY: &str = "agent:main:main";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub heartbeat_seconds: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub sessions: Option<RecentSessions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentSessions {
    /// Entries that do not parse are dropped, the rest are kept.
    #[serde(default, deserialize_with = "lenient_entries")]
    pub recent: Vec<SessionEntry>,
}

/// Usage counters of one agent session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    #[serde(default)]
    pub key: Option<String>,
    /// Last update, milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub updated_at: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub input_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub output_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub percent_used: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub remaining_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub context_tokens: Option<u64>,
}

impl HealthSnapshot {
    /// Find a recent session by key.
    pub fn session(&self, key: &str) -> Option<&SessionEntry> {
        self.sessions.as_ref().and_then(|s| {
            s.recent
                .iter()
                .find(|entry| entry.key.as_deref() == Some(key))
        })
    }
}

// The gateway's health shape is loosely typed. A field of the wrong type
// reads as absent instead of failing the whole snapshot.

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<SessionEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Any finite number, rounded to the nearest integer.
fn rounded(value: Option<Value>) -> Option<f64> {
    value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .map(f64::round)
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(rounded(value).map(|n| n as i64))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(rounded(value).filter(|n| *n >= 0.0).map(|n| n as u64))
}
