//! # Application snapshot and its wire format.
//!
//! The supervisor's state endpoint answers with an object keyed by application
//! name:
//!
//! ```text
//! {
//!   "tst": {
//!     "appId": 123,
//!     "appName": "tst",            (optional, key is used when absent)
//!     "commit": "abc",
//!     "services": {
//!       "ha": { "status": "Running", "releaseId": 1, "downloadProgress": null }
//!     }
//!   }
//! }
//! ```
//!
//! ## Rules
//! - The body must describe **exactly one** application, otherwise parsing fails
//!   with [`SyncError::Protocol`].
//! - `status` is kept verbatim; the supervisor may add values at any time.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Status text of one service, e.g. `Running`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceStatus(String);

impl ServiceStatus {
    pub const RUNNING: &'static str = "Running";
    pub const STOPPING: &'static str = "Stopping";
    pub const EXITED: &'static str = "Exited";
    pub const INSTALLING: &'static str = "Installing";

    /// Values the supervisor is known to report. Others are still accepted.
    pub const KNOWN: [&'static str; 4] = [
        Self::RUNNING,
        Self::STOPPING,
        Self::EXITED,
        Self::INSTALLING,
    ];

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_running(&self) -> bool {
        self.0 == Self::RUNNING
    }

    /// True if the value is one of [`ServiceStatus::KNOWN`].
    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.0.as_str())
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceStatus {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Download indicator reported while a service image is being fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DownloadProgress {
    Percent(f64),
    Text(String),
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadProgress::Percent(p) => write!(f, "{p}"),
            DownloadProgress::Text(t) => f.write_str(t),
        }
    }
}

/// State of one service within a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub status: ServiceStatus,
    pub release_id: u64,
    #[serde(default)]
    pub download_progress: Option<DownloadProgress>,
}

/// Immutable point-in-time view of one application.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplicationSnapshot {
    pub application_id: u64,
    pub application_name: String,
    pub commit: String,
    pub services: BTreeMap<String, ServiceState>,
}

/// Top-level entries of the state body in wire order.
///
/// Repeated keys are kept, so a body naming the same application twice still
/// counts as two.
struct WireEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for WireEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = WireEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object keyed by application name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<WireEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(1));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(WireEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Per-application object as it appears on the wire.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireApplication {
    app_id: u64,
    #[serde(default)]
    app_name: Option<String>,
    #[serde(default)]
    commit: String,
    #[serde(default)]
    services: BTreeMap<String, ServiceState>,
}

impl ApplicationSnapshot {
    /// Parses a state-endpoint body.
    ///
    /// Fails with [`SyncError::Protocol`] when the body is not JSON, is not an
    /// object keyed by application name, or does not hold exactly one application.
    ///
    /// # Example
    /// ```
    /// use balena_sync::ApplicationSnapshot;
    ///
    /// let body = r#"{"tst":{"appId":123,"appName":"tst","commit":"abc",
    ///     "services":{"ha":{"status":"Running","releaseId":1,"downloadProgress":null}}}}"#;
    /// let snap = ApplicationSnapshot::parse_state(body).unwrap();
    /// assert_eq!(snap.application_id, 123);
    /// assert!(snap.service("ha").unwrap().status.is_running());
    /// ```
    pub fn parse_state(body: &str) -> Result<Self, SyncError> {
        let WireEntries(apps) = serde_json::from_str(body)
            .map_err(|e| SyncError::protocol(format!("malformed state body: {e}")))?;

        if apps.len() != 1 {
            return Err(SyncError::protocol(format!(
                "expected exactly one application, got {}",
                apps.len()
            )));
        }

        let Some((key, value)) = apps.into_iter().next() else {
            return Err(SyncError::protocol("expected exactly one application, got 0"));
        };

        let wire: WireApplication = serde_json::from_value(value)
            .map_err(|e| SyncError::protocol(format!("malformed application '{key}': {e}")))?;

        Ok(Self {
            application_id: wire.app_id,
            application_name: wire.app_name.unwrap_or(key),
            commit: wire.commit,
            services: wire.services,
        })
    }

    /// Returns the state of `name`, if the application has such a service.
    pub fn service(&self, name: &str) -> Option<&ServiceState> {
        self.services.get(name)
    }

    /// Service names in sorted order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_APP: &str = r#"{"tst": {"appId":123,"appName":"tst","commit":"abc","services":{"ha":{"status":"Running","releaseId":1,"downloadProgress":null}}}}"#;

    #[test]
    fn parses_single_application() {
        let snap = ApplicationSnapshot::parse_state(ONE_APP).unwrap();
        assert_eq!(snap.application_id, 123);
        assert_eq!(snap.application_name, "tst");
        assert_eq!(snap.commit, "abc");

        let ha = snap.service("ha").unwrap();
        assert_eq!(ha.status.as_str(), "Running");
        assert_eq!(ha.release_id, 1);
        assert_eq!(ha.download_progress, None);
    }

    #[test]
    fn rejects_two_applications() {
        let body = r#"{
            "a": {"appId":1,"commit":"x","services":{}},
            "b": {"appId":2,"commit":"y","services":{}}
        }"#;
        let err = ApplicationSnapshot::parse_state(body).unwrap_err();
        assert!(matches!(err, SyncError::Protocol { .. }));
        assert!(err.to_string().contains("exactly one application"));
    }

    #[test]
    fn rejects_repeated_application_key() {
        let body = r#"{
            "tst": {"appId":1,"commit":"x","services":{}},
            "tst": {"appId":2,"commit":"y","services":{}}
        }"#;
        let err = ApplicationSnapshot::parse_state(body).unwrap_err();
        assert!(matches!(err, SyncError::Protocol { .. }));
        assert!(err.to_string().contains("got 2"), "{err}");
    }

    #[test]
    fn rejects_zero_applications() {
        let err = ApplicationSnapshot::parse_state("{}").unwrap_err();
        assert!(matches!(err, SyncError::Protocol { .. }));
    }

    #[test]
    fn rejects_malformed_body() {
        assert!(matches!(
            ApplicationSnapshot::parse_state("not json").unwrap_err(),
            SyncError::Protocol { .. }
        ));
        assert!(matches!(
            ApplicationSnapshot::parse_state(r#"["tst"]"#).unwrap_err(),
            SyncError::Protocol { .. }
        ));
        assert!(matches!(
            ApplicationSnapshot::parse_state(r#"{"tst": {"commit": "abc"}}"#).unwrap_err(),
            SyncError::Protocol { .. }
        ));
    }

    #[test]
    fn application_name_falls_back_to_key() {
        let body = r#"{"tst": {"appId":123,"commit":"f00","services":{}}}"#;
        let snap = ApplicationSnapshot::parse_state(body).unwrap();
        assert_eq!(snap.application_name, "tst");
    }

    #[test]
    fn keeps_unknown_status_and_progress_kinds() {
        let body = r#"{"tst": {"appId":1,"commit":"c","services":{
            "a":{"status":"Downloading","releaseId":2,"downloadProgress":42},
            "b":{"status":"Stopped","releaseId":2,"downloadProgress":"12%"},
            "c":{"status":"Exited","releaseId":2}
        }}}"#;
        let snap = ApplicationSnapshot::parse_state(body).unwrap();

        let a = snap.service("a").unwrap();
        assert_eq!(a.status.as_str(), "Downloading");
        assert!(!a.status.is_known());
        assert_eq!(a.download_progress, Some(DownloadProgress::Percent(42.0)));

        let b = snap.service("b").unwrap();
        assert_eq!(
            b.download_progress,
            Some(DownloadProgress::Text("12%".into()))
        );

        assert!(snap.service("c").unwrap().status.is_known());
        assert_eq!(snap.service_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
