//! Audience profile returned by the profile endpoint.
//!
//! The endpoint answers with
//!
//! ```json
//! {"Profile": {"pid": "...", "tpid": "...",
//!   "Audiences": {"Audience": [{"id": "123", "abbr": "sports"}]}}}
//! ```
//!
//! Missing sections decode as empty rather than failing.

use crate::transport::TransportError;
use serde::{Deserialize, Serialize};

/// One audience segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub abbr: String,
}

/// Audience segments the device belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceProfile {
    /// Profile id
    pub pid: Option<String>,
    /// Third-party profile id
    pub tpid: Option<String>,
    pub audiences: Vec<Audience>,
    /// The full decoded response
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Profile", default)]
    profile: Option<ProfileBody>,
}

#[derive(Deserialize)]
struct ProfileBody {
    #[serde(default, deserialize_with = "string_or_number")]
    pid: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    tpid: Option<String>,
    #[serde(rename = "Audiences", default)]
    audiences: Option<AudienceList>,
}

#[derive(Deserialize)]
struct AudienceList {
    #[serde(rename = "Audience", default)]
    audience: Vec<Audience>,
}

/// Ids arrive as strings or bare numbers depending on the account.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl AudienceProfile {
    /// Decode a profile from a response body.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, TransportError> {
        let raw: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Self::from_value(raw)
    }

    /// Decode a profile from an already parsed JSON value.
    pub fn from_value(raw: serde_json::Value) -> Result<Self, TransportError> {
        let envelope: Envelope = serde_json::from_value(raw.clone())
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        let (pid, tpid, audiences) = match envelope.profile {
            Some(body) => (
                body.pid,
                body.tpid,
                body.audiences.map(|a| a.audience).unwrap_or_default(),
            ),
            None => (None, None, Vec::new()),
        };

        Ok(Self {
            pid,
            tpid,
            audiences,
            raw,
        })
    }

    /// Audience abbreviations, in response order.
    pub fn abbreviations(&self) -> Vec<&str> {
        self.audiences.iter().map(|a| a.abbr.as_str()).collect()
    }

    /// Pretty-printed JSON of the raw response.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}
