use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Namespace for accessory UUIDs; the name is the device serial number.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x6f3b_1d2e_8a4c_4f5b_9e21_7c0d_3a5e_b812);

/// Stable accessory UUID for a projector serial number.
pub fn accessory_uuid(serial: &str) -> Uuid {
    Uuid::new_v5(&ACCESSORY_NAMESPACE, serial.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub name: String,
    pub model: String,
    pub serial: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryRecord {
    pub uuid: Uuid,
    pub display_name: String,
    pub device: DeviceContext,
}

impl AccessoryRecord {
    pub fn new(device: DeviceContext) -> Self {
        Self {
            uuid: accessory_uuid(&device.serial),
            display_name: device.name.clone(),
            device,
        }
    }
}

/// Outcome of [`AccessoryRegistry::reconcile`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Discovered and already known from the cache.
    pub restored: Vec<Uuid>,
    /// Discovered and newly registered.
    pub added: Vec<Uuid>,
    /// Known from the cache but no longer discovered; unregistered.
    pub removed: Vec<Uuid>,
}

/// Accessories known to this bridge, keyed by UUID.
#[derive(Debug, Default)]
pub struct AccessoryRegistry {
    records: HashMap<Uuid, AccessoryRecord>,
}

impl AccessoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the cache file at `path`.
    ///
    /// A missing file is an empty registry. An unreadable or malformed file
    /// is logged and also treated as empty: the cache is rebuilt on the next
    /// [`save`](Self::save).
    pub async fn load(path: &Path) -> Self {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No accessory cache yet");
                return Self::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read accessory cache");
                return Self::new();
            }
        };

        match serde_json::from_slice::<Vec<AccessoryRecord>>(&bytes) {
            Ok(records) => {
                let mut registry = Self::new();
                for record in records {
                    registry.restore(record);
                }
                registry
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed accessory cache");
                Self::new()
            }
        }
    }

    /// Writes every record to `path` as pretty JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let mut records: Vec<&AccessoryRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.uuid);
        let json = serde_json::to_vec_pretty(&records).context("Failed to serialize accessory cache")?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write accessory cache {}", path.display()))?;
        debug!(path = %path.display(), count = records.len(), "Accessory cache saved");
        Ok(())
    }

    /// Registers a record loaded from the cache.
    pub fn restore(&mut self, record: AccessoryRecord) {
        debug!(uuid = %record.uuid, name = %record.display_name, "Loading accessory from cache");
        self.records.insert(record.uuid, record);
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&AccessoryRecord> {
        self.records.get(uuid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Makes the registry hold exactly the `discovered` records.
    ///
    /// Known UUIDs keep their record with the device context refreshed,
    /// unknown ones are added, and anything not discovered is removed.
    pub fn reconcile(&mut self, discovered: Vec<AccessoryRecord>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for record in &discovered {
            match self.records.get_mut(&record.uuid) {
                Some(existing) => {
                    info!(uuid = %record.uuid, "Restoring existing accessory from cache");
                    existing.device = record.device.clone();
                    report.restored.push(record.uuid);
                }
                None => {
                    info!(uuid = %record.uuid, name = %record.display_name, "Adding new accessory");
                    self.records.insert(record.uuid, record.clone());
                    report.added.push(record.uuid);
                }
            }
        }

        self.records.retain(|uuid, record| {
            let keep = discovered.iter().any(|d| d.uuid == *uuid);
            if !keep {
                info!(uuid = %uuid, name = %record.display_name, "Removing existing accessory from cache");
                report.removed.push(*uuid);
            }
            keep
        });
        report.removed.sort();

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(serial: &str) -> DeviceContext {
        DeviceContext {
            name: format!("Projector {serial}"),
            model: "EH-LS12000B".to_owned(),
            serial: serial.to_owned(),
            ip_address: "192.168.1.50".to_owned(),
        }
    }

    fn temp_cache_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("projector_bridge_{}", Uuid::new_v4().simple()))
            .join(name)
    }

    #[test]
    fn uuid_is_stable_per_serial() {
        assert_eq!(accessory_uuid("X5JK0200123"), accessory_uuid("X5JK0200123"));
        assert_ne!(accessory_uuid("X5JK0200123"), accessory_uuid("X5JK0200124"));
        assert_eq!(AccessoryRecord::new(device("A")).uuid, accessory_uuid("A"));
    }

    #[test]
    fn reconcile_adds_unknown_device() {
        let mut registry = AccessoryRegistry::new();
        let record = AccessoryRecord::new(device("A"));

        let report = registry.reconcile(vec![record.clone()]);
        assert_eq!(report.added, vec![record.uuid]);
        assert!(report.restored.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(registry.get(&record.uuid), Some(&record));
    }

    #[test]
    fn reconcile_restores_cached_device_and_refreshes_context() {
        let mut registry = AccessoryRegistry::new();
        registry.restore(AccessoryRecord::new(device("A")));

        let mut moved = device("A");
        moved.ip_address = "192.168.1.77".to_owned();
        let record = AccessoryRecord::new(moved);

        let report = registry.reconcile(vec![record.clone()]);
        assert_eq!(report.restored, vec![record.uuid]);
        assert!(report.added.is_empty());
        assert_eq!(registry.get(&record.uuid).unwrap().device.ip_address, "192.168.1.77");
    }

    #[test]
    fn reconcile_removes_stale_devices() {
        let mut registry = AccessoryRegistry::new();
        let stale = AccessoryRecord::new(device("OLD"));
        registry.restore(stale.clone());

        let current = AccessoryRecord::new(device("NEW"));
        let report = registry.reconcile(vec![current.clone()]);

        assert_eq!(report.removed, vec![stale.uuid]);
        assert_eq!(report.added, vec![current.uuid]);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&stale.uuid).is_none());
    }

    #[tokio::test]
    async fn missing_cache_file_is_empty() {
        let registry = AccessoryRegistry::load(&temp_cache_path("missing.json")).await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_restores_records() {
        let path = temp_cache_path("accessories.json");
        let mut registry = AccessoryRegistry::new();
        let record = AccessoryRecord::new(device("A"));
        registry.reconcile(vec![record.clone()]);
        registry.save(&path).await.unwrap();

        let mut loaded = AccessoryRegistry::load(&path).await;
        assert_eq!(loaded.get(&record.uuid), Some(&record));
        let report = loaded.reconcile(vec![record.clone()]);
        assert_eq!(report.restored, vec![record.uuid]);

        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn malformed_cache_file_is_ignored() {
        let path = temp_cache_path("accessories.json");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, b"{ not json").await.unwrap();

        let registry = AccessoryRegistry::load(&path).await;
        assert!(registry.is_empty());

        let _ = fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
