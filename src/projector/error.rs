use reqwest::StatusCode;
use thiserror::Error;

/// HAP status code for "service communication failure".
pub const SERVICE_COMMUNICATION_FAILURE: i32 = -70402;

/// Failure of a single projector command.
///
/// The variants keep the cause for logging. Every variant reaches the
/// accessory host as the same communication failure.
#[derive(Debug, Error)]
pub enum ProjectorError {
    #[error("projector request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("projector returned HTTP {0}")]
    Status(StatusCode),

    #[error("projector rejected digest credentials")]
    Unauthorized,

    #[error("malformed projector response: {0}")]
    Malformed(String),

    #[error("projector rejected command {command:?} (reply {reply:?})")]
    DeviceRejected { command: String, reply: String },
}

impl ProjectorError {
    /// Status code surfaced to the accessory host.
    pub fn hap_status(&self) -> i32 {
        SERVICE_COMMUNICATION_FAILURE
    }
}

impl From<serde_json::Error> for ProjectorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
