use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    accessory::{
        registry::{AccessoryRecord, AccessoryRegistry, DeviceContext, ReconcileReport},
        Accessory, AccessoryInformation,
    },
    config::Config,
    projector::ProjectorClient,
};

/// Owns the configuration and registry, and produces the single accessory.
pub struct Platform {
    config: Config,
    client: ProjectorClient,
    registry: AccessoryRegistry,
}

impl Platform {
    /// Builds the projector client and restores the registry from the
    /// accessory cache, if one is configured.
    pub async fn new(config: Config) -> Result<Self> {
        let client = ProjectorClient::new(&config).context("Failed to build projector HTTP client")?;
        let registry = match &config.accessory_cache_path {
            Some(path) => AccessoryRegistry::load(path).await,
            None => AccessoryRegistry::new(),
        };
        debug!(cached = registry.len(), "Finished initializing platform");
        Ok(Self { config, client, registry })
    }

    /// The statically configured projector. Always exactly one.
    pub fn discovered_devices(&self) -> Vec<AccessoryRecord> {
        vec![AccessoryRecord::new(DeviceContext {
            name: self.config.name.clone(),
            model: self.config.model.clone(),
            serial: self.config.serial.clone(),
            ip_address: self.config.ip_address.clone(),
        })]
    }

    /// Reconciles the registry against the configured projector, persists
    /// the cache, and returns the accessory handle.
    pub async fn discover_devices(&mut self) -> Result<(Accessory, ReconcileReport)> {
        let discovered = self.discovered_devices();
        let record = discovered[0].clone();
        let report = self.registry.reconcile(discovered);

        // Best effort, like loading: the accessory is served either way.
        if let Some(path) = &self.config.accessory_cache_path {
            if let Err(e) = self.registry.save(path).await {
                warn!(path = %path.display(), error = %e, "Failed to save accessory cache");
            }
        }

        info!(
            uuid = %record.uuid,
            name = %record.display_name,
            added = report.added.len(),
            restored = report.restored.len(),
            removed = report.removed.len(),
            "Accessory registry reconciled"
        );

        let information = AccessoryInformation::new(
            record.uuid,
            &record.device.name,
            &record.device.model,
            &record.device.serial,
        );
        Ok((Accessory::new(information, self.client.clone()), report))
    }

    pub fn registry(&self) -> &AccessoryRegistry {
        &self.registry
    }
}
