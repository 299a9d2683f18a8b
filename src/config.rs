use anyhow::Result;
use serde::Deserialize;

use crate::model::SenderRole;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub session: SessionDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the remote bridge service, e.g. "http://localhost:8080/api".
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Capture buffer granularity in milliseconds (affects chunk size).
    pub buffer_duration_ms: u64,
}

/// Initial role and language pair; all three can be changed at runtime and
/// are re-read at the moment of each send.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionDefaults {
    pub role: SenderRole,
    pub doctor_language: String,
    pub patient_language: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:8080/api".to_string(),
                request_timeout_secs: 30,
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
                buffer_duration_ms: 100,
            },
            session: SessionDefaults {
                role: SenderRole::Doctor,
                doctor_language: "English".to_string(),
                patient_language: "Hindi".to_string(),
            },
        }
    }
}
