use crate::config::SessionDefaults;
use crate::model::SenderRole;

/// Process-wide role and language selection.
///
/// Read at the moment of each send; changing it mid-session does not affect
/// messages that were already sent.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub role: SenderRole,
    pub doctor_language: String,
    pub patient_language: String,
}

impl From<SessionDefaults> for SessionSettings {
    fn from(defaults: SessionDefaults) -> Self {
        Self {
            role: defaults.role,
            doctor_language: defaults.doctor_language,
            patient_language: defaults.patient_language,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            role: SenderRole::Doctor,
            doctor_language: "English".to_string(),
            patient_language: "Hindi".to_string(),
        }
    }
}
