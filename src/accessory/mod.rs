pub mod registry;

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::projector::{
    error::ProjectorError,
    models::{power_value, PowerStatus, PROJECTOR_PROPERTY_POWER},
    ProjectorClient,
};

pub const MANUFACTURER: &str = "Epson";

// ---------------------------------------------------------------------------
// Information
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SleepDiscoveryMode {
    NotDiscoverable,
    AlwaysDiscoverable,
}

/// Identification metadata plus the fixed television-service characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub uuid: Uuid,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub name: String,
    pub active_identifier: u32,
    pub sleep_discovery_mode: SleepDiscoveryMode,
}

impl AccessoryInformation {
    pub fn new(uuid: Uuid, name: &str, model: &str, serial_number: &str) -> Self {
        Self {
            uuid,
            manufacturer: MANUFACTURER.to_owned(),
            model: model.to_owned(),
            serial_number: serial_number.to_owned(),
            name: name.to_owned(),
            active_identifier: 1,
            sleep_discovery_mode: SleepDiscoveryMode::AlwaysDiscoverable,
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteKey
// ---------------------------------------------------------------------------

/// Remote-control keys, numbered as in the HAP `RemoteKey` characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKey {
    Rewind,
    FastForward,
    NextTrack,
    PreviousTrack,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Select,
    Back,
    Exit,
    PlayPause,
    Information,
}

impl RemoteKey {
    pub fn code(self) -> u8 {
        match self {
            Self::Rewind => 0,
            Self::FastForward => 1,
            Self::NextTrack => 2,
            Self::PreviousTrack => 3,
            Self::ArrowUp => 4,
            Self::ArrowDown => 5,
            Self::ArrowLeft => 6,
            Self::ArrowRight => 7,
            Self::Select => 8,
            Self::Back => 9,
            Self::Exit => 10,
            Self::PlayPause => 11,
            Self::Information => 15,
        }
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rewind => "REWIND",
            Self::FastForward => "FAST_FORWARD",
            Self::NextTrack => "NEXT_TRACK",
            Self::PreviousTrack => "PREVIOUS_TRACK",
            Self::ArrowUp => "ARROW_UP",
            Self::ArrowDown => "ARROW_DOWN",
            Self::ArrowLeft => "ARROW_LEFT",
            Self::ArrowRight => "ARROW_RIGHT",
            Self::Select => "SELECT",
            Self::Back => "BACK",
            Self::Exit => "EXIT",
            Self::PlayPause => "PLAY_PAUSE",
            Self::Information => "INFORMATION",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Accessory
// ---------------------------------------------------------------------------

/// Last power state this process successfully wrote to the projector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerBookkeeping {
    pub on: Option<bool>,
    pub changed_at: Option<DateTime<Utc>>,
}

/// The projector as seen by the accessory host.
///
/// Cheap to clone; clones share the same bookkeeping.
#[derive(Debug, Clone)]
pub struct Accessory {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    information: AccessoryInformation,
    client: ProjectorClient,
    power: RwLock<PowerBookkeeping>,
}

impl Accessory {
    pub fn new(information: AccessoryInformation, client: ProjectorClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                information,
                client,
                power: RwLock::new(PowerBookkeeping::default()),
            }),
        }
    }

    pub fn information(&self) -> &AccessoryInformation {
        &self.inner.information
    }

    /// Local bookkeeping only. Never used to answer [`get_active`](Self::get_active).
    pub async fn power_bookkeeping(&self) -> PowerBookkeeping {
        *self.inner.power.read().await
    }

    /// Queries `PWR?` and maps the status code to the `Active` characteristic.
    ///
    /// Codes outside the documented set are reported as inactive.
    pub async fn get_active(&self) -> Result<bool, ProjectorError> {
        let reply = self.inner.client.get_property(PROJECTOR_PROPERTY_POWER).await?;
        let status = PowerStatus::from_reply(&reply);

        let active = status.is_active().unwrap_or_else(|| {
            warn!(reply = %reply, "Unrecognised power status code; reporting inactive");
            false
        });
        debug!(status = %status, active, "Get Characteristic Active");
        Ok(active)
    }

    /// Sends `PWR ON` / `PWR OFF`; bookkeeping is only updated once the
    /// projector accepted the command.
    pub async fn set_active(&self, active: bool) -> Result<(), ProjectorError> {
        let reply = self
            .inner
            .client
            .set_property(PROJECTOR_PROPERTY_POWER, power_value(active))
            .await?;

        *self.inner.power.write().await = PowerBookkeeping {
            on: Some(active),
            changed_at: Some(Utc::now()),
        };
        debug!(active, reply = %reply, "Set Characteristic Active");
        Ok(())
    }

    /// Remote keys are accepted and logged; nothing is sent to the projector.
    pub fn remote_key(&self, key: RemoteKey) {
        info!(key = %key, code = key.code(), "set Remote Key Pressed");
    }
}
