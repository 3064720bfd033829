//! # HTTP client for the supervisor API.
//!
//! Endpoints:
//! ```text
//! GET  {base}/v2/applications/state?apikey={key}
//! POST {base}/v2/applications/{appId}/{action}?apikey={key}   body: {"serviceName": "<svc>"}
//! ```
//!
//! ## Error mapping
//! - request could not be sent or timed out → [`SyncError::Transport`]
//! - non-2xx status, unreadable or malformed body → [`SyncError::Protocol`]
//! - control response without the literal `OK` → [`SyncError::Protocol`]

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::{ServiceAction, SupervisorApi};
use crate::core::CoordinatorConfig;
use crate::error::SyncError;
use crate::model::ApplicationSnapshot;

const TARGET: &str = "balena_sync::client";

/// Marker the supervisor puts in a successful control response.
const CONTROL_OK: &str = "OK";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ControlBody<'a> {
    service_name: &'a str,
}

/// Supervisor client backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpSupervisorClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSupervisorClient {
    /// Creates a client for `base_url` (trailing slashes are ignored).
    ///
    /// `timeout` bounds each request; `None` leaves requests unbounded.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SyncError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| SyncError::transport(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Creates a client from the connection fields of `cfg`.
    pub fn from_config(cfg: &CoordinatorConfig) -> Result<Self, SyncError> {
        Self::new(&cfg.base_url, &cfg.api_key, cfg.request_timeout_opt())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn state_url(&self) -> String {
        format!("{}/v2/applications/state", self.base_url)
    }

    fn control_url(&self, app_id: u64, action: ServiceAction) -> String {
        format!("{}/v2/applications/{app_id}/{}", self.base_url, action.as_str())
    }
}

#[async_trait]
impl SupervisorApi for HttpSupervisorClient {
    async fn fetch_snapshot(&self) -> Result<ApplicationSnapshot, SyncError> {
        let resp = self
            .http
            .get(self.state_url())
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(to_transport_error)?;

        let status = resp.status();
        let body = resp.text().await.map_err(to_body_error)?;
        if !status.is_success() {
            return Err(SyncError::protocol(format!(
                "unexpected status: {status} body={body}"
            )));
        }

        let snap = ApplicationSnapshot::parse_state(&body)?;
        debug!(
            target: TARGET,
            app_id = snap.application_id,
            services = snap.services.len(),
            "fetched application state"
        );
        Ok(snap)
    }

    async fn control_service(
        &self,
        app_id: u64,
        service_name: &str,
        action: ServiceAction,
    ) -> Result<(), SyncError> {
        let resp = self
            .http
            .post(self.control_url(app_id, action))
            .query(&[("apikey", self.api_key.as_str())])
            .json(&ControlBody { service_name })
            .send()
            .await
            .map_err(to_transport_error)?;

        let body = resp.text().await.map_err(to_body_error)?;
        check_control_response(&body).inspect_err(|_| {
            warn!(
                target: TARGET,
                app_id,
                service = service_name,
                action = action.as_str(),
                response = %body,
                "control command not acknowledged"
            );
        })
    }
}

/// Succeeds iff the body contains the literal `OK`.
///
/// Informational answers such as "already stopping" count as failures.
pub(crate) fn check_control_response(body: &str) -> Result<(), SyncError> {
    if body.contains(CONTROL_OK) {
        Ok(())
    } else {
        Err(SyncError::protocol(format!(
            "error communicating with API: {body}"
        )))
    }
}

fn to_transport_error(err: reqwest::Error) -> SyncError {
    SyncError::transport(err.to_string())
}

fn to_body_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::transport(err.to_string())
    } else {
        SyncError::protocol(format!("unreadable response body: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_response_requires_ok_marker() {
        assert!(check_control_response("OK").is_ok());
        assert!(check_control_response("\"OK\"").is_ok());

        let err = check_control_response("Service is already stopping").unwrap_err();
        assert!(matches!(err, SyncError::Protocol { .. }));
        assert!(check_control_response("").is_err());
        assert!(check_control_response("ok").is_err());
    }

    #[test]
    fn urls_are_built_without_double_slashes() {
        let client = HttpSupervisorClient::new("http://127.0.0.1:48484/", "k", None).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:48484");
        assert_eq!(
            client.state_url(),
            "http://127.0.0.1:48484/v2/applications/state"
        );
        assert_eq!(
            client.control_url(123, ServiceAction::Restart),
            "http://127.0.0.1:48484/v2/applications/123/restart-service"
        );
    }
}
