use std::fmt;

use serde::Deserialize;

/// Reply the projector sends back when it rejects a command.
pub const PROJECTOR_ERR: &str = "ERR";

/// Property code for the lamp/power state.
pub const PROJECTOR_PROPERTY_POWER: &str = "PWR";

// ---------------------------------------------------------------------------
// Command
//
// The projector accepts the same ESC/VP21 grammar over HTTP that it accepts
// on its serial port, passed as the `jsoncallback` query parameter:
//
//   Query:  "PWR?"
//   Write:  "PWR ON"
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub property: String,
    pub value: Option<String>,
}

impl Command {
    pub fn query(property: impl Into<String>) -> Self {
        Self { property: property.into(), value: None }
    }

    pub fn set(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self { property: property.into(), value: Some(value.into()) }
    }

    /// Serialized command token, before percent-encoding.
    pub fn token(&self) -> String {
        match &self.value {
            None => format!("{}?", self.property),
            Some(value) => format!("{} {}", self.property, value),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Value written to `PWR` to switch the projector on or off.
pub fn power_value(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

// ---------------------------------------------------------------------------
// Response envelope  —  GET /cgi-bin/json_query?jsoncallback=...
//
//   { "projector": { "feature": { "error": false, "reply": "01" } } }
//
// Unknown sibling fields are ignored; `error` or `reply` missing is a
// malformed payload.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    pub projector: ProjectorSection,
}

#[derive(Debug, Deserialize)]
pub struct ProjectorSection {
    pub feature: Feature,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    pub error: bool,
    pub reply: String,
}

// ---------------------------------------------------------------------------
// PowerStatus  —  reply to "PWR?"
// ---------------------------------------------------------------------------

/// Operational state reported by the two-digit `PWR?` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerStatus {
    /// `00`
    Standby,
    /// `01`
    On,
    /// `02`
    WarmingUp,
    /// `03`
    Cooling,
    /// `04`: network monitoring / communication status.
    NetworkMonitoring,
    /// `05`
    ErrorStandby,
    /// `09`: standby, but images and audio can still be output externally.
    StandbyAvOutput,
    Unknown(String),
}

impl PowerStatus {
    pub fn from_reply(reply: &str) -> Self {
        match reply.trim() {
            "00" => Self::Standby,
            "01" => Self::On,
            "02" => Self::WarmingUp,
            "03" => Self::Cooling,
            "04" => Self::NetworkMonitoring,
            "05" => Self::ErrorStandby,
            "09" => Self::StandbyAvOutput,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Whether the accessory should report itself as active.
    ///
    /// `None` for codes outside the documented set.
    pub fn is_active(&self) -> Option<bool> {
        match self {
            Self::On | Self::WarmingUp | Self::StandbyAvOutput => Some(true),
            Self::Standby | Self::Cooling | Self::NetworkMonitoring | Self::ErrorStandby => {
                Some(false)
            }
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standby => f.write_str("standby"),
            Self::On => f.write_str("on"),
            Self::WarmingUp => f.write_str("warming_up"),
            Self::Cooling => f.write_str("cooling"),
            Self::NetworkMonitoring => f.write_str("network_monitoring"),
            Self::ErrorStandby => f.write_str("error_standby"),
            Self::StandbyAvOutput => f.write_str("standby_av_output"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}
