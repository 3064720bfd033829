//! # Supervisor API client.
//!
//! [`SupervisorApi`] is the seam between the coordinator and the network. It is
//! stateless per call: no caching, no retries, no locking. Retry policy belongs
//! to the caller.
//!
//! - [`HttpSupervisorClient`] talks to a real supervisor over HTTP.
//! - Tests drive the coordinator with in-memory implementations.
//!
//! ## Implementing a custom client
//! ```no_run
//! use async_trait::async_trait;
//! use balena_sync::{ApplicationSnapshot, ServiceAction, SupervisorApi, SyncError};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl SupervisorApi for Offline {
//!     async fn fetch_snapshot(&self) -> Result<ApplicationSnapshot, SyncError> {
//!         ApplicationSnapshot::parse_state(r#"{"app":{"appId":1,"commit":"c","services":{}}}"#)
//!     }
//!
//!     async fn control_service(
//!         &self,
//!         _app_id: u64,
//!         _service_name: &str,
//!         _action: ServiceAction,
//!     ) -> Result<(), SyncError> {
//!         Ok(())
//!     }
//! }
//! ```

mod http;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::SyncError;
use crate::model::ApplicationSnapshot;

pub use http::HttpSupervisorClient;

/// Control command accepted by the supervisor for a single service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    /// All actions, in wire-name order.
    pub const ALL: [ServiceAction; 3] = [
        ServiceAction::Start,
        ServiceAction::Stop,
        ServiceAction::Restart,
    ];

    /// Path segment used by the supervisor API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start-service",
            ServiceAction::Stop => "stop-service",
            ServiceAction::Restart => "restart-service",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = SyncError;

    /// Accepts exactly `start-service`, `stop-service` and `restart-service`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                SyncError::invalid_argument(format!(
                    "invalid action to control container service: {s:?}"
                ))
            })
    }
}

/// Contract for talking to the supervisor.
#[async_trait]
pub trait SupervisorApi: Send + Sync + 'static {
    /// Fetches the current application state.
    ///
    /// Fails with [`SyncError::Protocol`] unless the response describes exactly
    /// one application, and with [`SyncError::Transport`] on network failure.
    async fn fetch_snapshot(&self) -> Result<ApplicationSnapshot, SyncError>;

    /// Issues a control command for one service of application `app_id`.
    ///
    /// Has no effect on any cached state; callers refresh afterwards.
    async fn control_service(
        &self,
        app_id: u64,
        service_name: &str,
        action: ServiceAction,
    ) -> Result<(), SyncError>;
}
