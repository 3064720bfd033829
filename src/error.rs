//! Error types used by the supervisor client, the coordinator and entities.
//!
//! A single enum, [`SyncError`], covers every failure the crate reports:
//!
//! - refresh failures (`Transport`, `Protocol`) which the scheduler absorbs
//!   and records, but which are returned to explicit refresh callers;
//! - caller mistakes and policy rejections (`InvalidArgument`, `NotReady`,
//!   `PermissionDenied`, `UnknownEntity`) which never touch the network;
//! - `Closed`, returned once the coordinator has been torn down.
//!
//! The type is `Clone` because one in-flight refresh result is handed to
//! every caller that joined it.

use thiserror::Error;

/// # Errors produced by the supervisor client and the coordinator.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Supervisor unreachable (connection refused, DNS, timeout).
    #[error("transport error: {message}")]
    Transport {
        /// Underlying error message.
        message: String,
    },

    /// Response violated the expected shape, or a control command was not acknowledged.
    #[error("protocol error: {message}")]
    Protocol {
        /// What was wrong with the response.
        message: String,
    },

    /// Caller supplied an argument the supervisor API does not accept.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// A control command was requested before any snapshot was fetched.
    #[error("no application snapshot has been fetched yet")]
    NotReady,

    /// The caller is not allowed to control this service.
    #[error("permission denied: {service} can not be controlled")]
    PermissionDenied {
        /// Service the command targeted.
        service: String,
    },

    /// No entity is registered under this id.
    #[error("unknown entity: {entity_id}")]
    UnknownEntity {
        /// Requested entity id.
        entity_id: String,
    },

    /// Coordinator was shut down while (or before) the operation ran.
    #[error("coordinator closed")]
    Closed,
}

impl SyncError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        SyncError::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        SyncError::Protocol {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        SyncError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use balena_sync::SyncError;
    ///
    /// assert_eq!(SyncError::NotReady.as_label(), "not_ready");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncError::Transport { .. } => "transport_error",
            SyncError::Protocol { .. } => "protocol_error",
            SyncError::InvalidArgument { .. } => "invalid_argument",
            SyncError::NotReady => "not_ready",
            SyncError::PermissionDenied { .. } => "permission_denied",
            SyncError::UnknownEntity { .. } => "unknown_entity",
            SyncError::Closed => "closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SyncError::Transport { message } => format!("transport: {message}"),
            SyncError::Protocol { message } => format!("protocol: {message}"),
            SyncError::InvalidArgument { message } => format!("invalid argument: {message}"),
            SyncError::NotReady => "no snapshot yet".to_string(),
            SyncError::PermissionDenied { service } => format!("denied: {service}"),
            SyncError::UnknownEntity { entity_id } => format!("unknown entity: {entity_id}"),
            SyncError::Closed => "coordinator closed".to_string(),
        }
    }

    /// Indicates whether this is one of the two ways a refresh can fail.
    ///
    /// Returns `true` for [`SyncError::Transport`] and [`SyncError::Protocol`].
    pub fn is_refresh_failure(&self) -> bool {
        matches!(self, SyncError::Transport { .. } | SyncError::Protocol { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(SyncError::transport("x").as_label(), "transport_error");
        assert_eq!(SyncError::protocol("x").as_label(), "protocol_error");
        assert_eq!(SyncError::Closed.as_label(), "closed");
        assert_eq!(
            SyncError::PermissionDenied {
                service: "ha".into()
            }
            .as_label(),
            "permission_denied"
        );
    }

    #[test]
    fn only_transport_and_protocol_are_refresh_failures() {
        assert!(SyncError::transport("refused").is_refresh_failure());
        assert!(SyncError::protocol("two apps").is_refresh_failure());
        assert!(!SyncError::NotReady.is_refresh_failure());
        assert!(!SyncError::invalid_argument("reboot").is_refresh_failure());
    }

    #[test]
    fn display_includes_message() {
        let err = SyncError::protocol("expected exactly one application, got 2");
        assert_eq!(
            err.to_string(),
            "protocol error: expected exactly one application, got 2"
        );
    }
}
