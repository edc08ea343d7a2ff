use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::accessory::{AccessoryInformation, PowerBookkeeping, RemoteKey, SleepDiscoveryMode};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessoryDto {
    pub uuid: Uuid,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub name: String,
    pub active_identifier: u32,
    pub sleep_discovery_mode: SleepDiscoveryMode,
    /// Last power state successfully written by this bridge.
    /// Not a device reading; `null` until the first write.
    pub last_set_active: Option<bool>,
    pub last_set_at: Option<DateTime<Utc>>,
}

impl AccessoryDto {
    pub fn new(info: &AccessoryInformation, power: PowerBookkeeping) -> Self {
        Self {
            uuid: info.uuid,
            manufacturer: info.manufacturer.clone(),
            model: info.model.clone(),
            serial_number: info.serial_number.clone(),
            name: info.name.clone(),
            active_identifier: info.active_identifier,
            sleep_discovery_mode: info.sleep_discovery_mode,
            last_set_active: power.on,
            last_set_at: power.changed_at,
        }
    }
}

/// Body of `GET`/`PUT /accessory/active`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActiveDto {
    pub active: bool,
}

/// Body of `PUT /accessory/remote-key`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoteKeyRequest {
    pub key: RemoteKey,
}
