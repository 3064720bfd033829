//! # Per-service entity.
//!
//! A [`ServiceEntity`] mirrors one service of the application. It reads the
//! coordinator's cache only; the network is touched by [`ServiceEntity::update`]
//! and [`ServiceEntity::control`] alone.
//!
//! ## Rules
//! - `is_available()` is true iff the last refresh succeeded **and** the
//!   snapshot still lists the service.
//! - `native_value()` is `None` while unavailable, so a stale status is never
//!   shown past one failed refresh.
//! - The entity owns at most one subscription; it is released on `detach()`
//!   or when the entity is dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::DOMAIN;
use crate::client::ServiceAction;
use crate::core::{Authorization, Coordinator};
use crate::error::SyncError;
use crate::model::{DownloadProgress, ServiceState, ServiceStatus};
use crate::subscribers::Subscription;

const MORE_INFO_PANEL: &str = "more-info-balena_docker";
const ICON_RUNNING: &str = "mdi:play-circle-outline";
const ICON_STOPPED: &str = "mdi:stop-circle-outline";

/// Extra attributes exposed alongside the status value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceAttributes {
    pub release_id: u64,
    pub download_progress: Option<DownloadProgress>,
    pub custom_ui_more_info: &'static str,
    pub icon: &'static str,
}

impl ServiceAttributes {
    fn from_state(state: &ServiceState) -> Self {
        Self {
            release_id: state.release_id,
            download_progress: state.download_progress.clone(),
            custom_ui_more_info: MORE_INFO_PANEL,
            icon: if state.status.is_running() {
                ICON_RUNNING
            } else {
                ICON_STOPPED
            },
        }
    }
}

/// Consumer bound to one service name.
pub struct ServiceEntity {
    coordinator: Arc<Coordinator>,
    service_name: String,
    auth: Authorization,
    subscription: Mutex<Option<Subscription>>,
}

impl ServiceEntity {
    pub fn new(coordinator: Arc<Coordinator>, service_name: impl Into<String>, auth: Authorization) -> Self {
        Self {
            coordinator,
            service_name: service_name.into(),
            auth,
            subscription: Mutex::new(None),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// `balena_docker.<service>`
    pub fn entity_id(&self) -> String {
        format!("{DOMAIN}.{}", self.service_name)
    }

    /// `balena_docker_<service>`
    pub fn unique_id(&self) -> String {
        format!("{DOMAIN}_{}", self.service_name)
    }

    pub fn is_available(&self) -> bool {
        self.coordinator.is_service_available(&self.service_name)
    }

    /// Cached state of the service, regardless of availability.
    pub fn current_state(&self) -> Option<ServiceState> {
        self.coordinator.service(&self.service_name)
    }

    /// Status text, `None` while unavailable.
    pub fn native_value(&self) -> Option<ServiceStatus> {
        if !self.is_available() {
            return None;
        }
        self.current_state().map(|s| s.status)
    }

    pub fn attributes(&self) -> Option<ServiceAttributes> {
        self.current_state().map(|s| ServiceAttributes::from_state(&s))
    }

    /// Status values the entity is expected to report.
    pub fn options(&self) -> &'static [&'static str] {
        &ServiceStatus::KNOWN
    }

    pub fn can_control(&self) -> bool {
        self.auth == Authorization::Allowed
    }

    /// Calls `callback` after every coordinator update until detached.
    ///
    /// Attaching again replaces the previous callback.
    pub fn attach<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let sub = self.coordinator.subscribe(callback);
        // The old subscription is released after the lock is gone.
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

    /// Forces a coordinator refresh.
    pub async fn update(&self) -> Result<(), SyncError> {
        self.coordinator.request_refresh().await
    }

    /// Parses `action` and issues it against this service.
    pub async fn control(&self, action: &str) -> Result<(), SyncError> {
        let action: ServiceAction = action.parse()?;
        self.coordinator
            .control_service(&self.service_name, action, self.auth)
            .await
    }
}

impl std::fmt::Debug for ServiceEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEntity")
            .field("service_name", &self.service_name)
            .field("auth", &self.auth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: &str) -> ServiceState {
        ServiceState {
            status: ServiceStatus::new(status),
            release_id: 4,
            download_progress: Some(DownloadProgress::Percent(42.0)),
        }
    }

    #[test]
    fn icon_follows_running_status() {
        assert_eq!(ServiceAttributes::from_state(&state("Running")).icon, ICON_RUNNING);
        assert_eq!(ServiceAttributes::from_state(&state("Exited")).icon, ICON_STOPPED);
        assert_eq!(ServiceAttributes::from_state(&state("Downloading")).icon, ICON_STOPPED);
    }

    #[test]
    fn attributes_copy_release_and_progress() {
        let attrs = ServiceAttributes::from_state(&state("Installing"));
        assert_eq!(attrs.release_id, 4);
        assert_eq!(attrs.download_progress, Some(DownloadProgress::Percent(42.0)));
        assert_eq!(attrs.custom_ui_more_info, "more-info-balena_docker");
    }
}
