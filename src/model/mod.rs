//! Wire-level data model shared with the remote bridge service.
//!
//! Field names follow the service's JSON contract (camelCase); role tags are
//! serialized exactly as `DOCTOR` / `PATIENT`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps arrive either as RFC 3339 or as a zone-less local datetime
/// (`2026-08-30T10:00:00`). The service emits the zone-less form; zone-less
/// values are taken as UTC.
mod wire_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Languages the bridge UI offers by default. Advisory only: the service
/// accepts free-form language names and the client does not validate against
/// this list.
pub const SUPPORTED_LANGUAGES: &[&str] = &["English", "Hindi", "Spanish", "French", "German"];

/// Which side of the bridge authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderRole {
    Doctor,
    Patient,
}

impl SenderRole {
    /// Wire tag, as sent in JSON bodies and multipart form fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderRole::Doctor => "DOCTOR",
            SenderRole::Patient => "PATIENT",
        }
    }
}

impl std::fmt::Display for SenderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bridge session between a doctor and a patient.
///
/// The `id` is assigned by the service and treated as opaque. A conversation
/// is never mutated after creation, only replaced by a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub doctor_language: String,
    pub patient_language: String,
    #[serde(with = "wire_time")]
    pub created_at: DateTime<Utc>,
}

/// A single utterance within a conversation.
///
/// Text messages always carry `original_text`; voice messages carry
/// `audio_url` and may have no text at all until transcription runs.
/// `translated_text` is filled in by the service and may be absent on
/// messages returned before translation completes. Messages are never
/// patched in place client-side; enrichment arrives as a replacement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_role: SenderRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(with = "wire_time")]
    pub created_at: DateTime<Utc>,
}

/// Response body of the summary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}
