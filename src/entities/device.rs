//! Device-level entity: connection health and application metadata.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::DOMAIN;
use crate::core::Coordinator;
use crate::error::SyncError;
use crate::subscribers::Subscription;

pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

/// Application metadata exposed by the device entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceAttributes {
    pub app_id: u64,
    pub app_name: String,
    pub commit: String,
    pub custom_ui_more_info: &'static str,
    pub icon: &'static str,
}

/// Consumer reporting whether the supervisor is reachable.
pub struct DeviceEntity {
    coordinator: Arc<Coordinator>,
    subscription: Mutex<Option<Subscription>>,
}

impl DeviceEntity {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self {
            coordinator,
            subscription: Mutex::new(None),
        }
    }

    pub fn entity_id(&self) -> String {
        format!("{DOMAIN}.device")
    }

    pub fn unique_id(&self) -> String {
        format!("{DOMAIN}_device")
    }

    pub fn is_available(&self) -> bool {
        self.coordinator.last_update_succeeded()
    }

    /// `"online"` after a successful refresh, `"offline"` otherwise.
    pub fn native_value(&self) -> &'static str {
        if self.is_available() { ONLINE } else { OFFLINE }
    }

    /// Metadata of the latest snapshot; `None` before the first success.
    pub fn attributes(&self) -> Option<DeviceAttributes> {
        self.coordinator.snapshot().map(|s| DeviceAttributes {
            app_id: s.application_id,
            app_name: s.application_name.clone(),
            commit: s.commit.clone(),
            custom_ui_more_info: "more-info-balena_docker-device",
            icon: "mdi:chip",
        })
    }

    pub fn attach<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let sub = self.coordinator.subscribe(callback);
        let previous = self.subscription.lock().replace(sub);
        drop(previous);
    }

    pub fn detach(&self) {
        let previous = self.subscription.lock().take();
        drop(previous);
    }

    pub fn is_attached(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    pub async fn update(&self) -> Result<(), SyncError> {
        self.coordinator.request_refresh().await
    }
}

impl std::fmt::Debug for DeviceEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceEntity")
            .field("available", &self.is_available())
            .finish()
    }
}
