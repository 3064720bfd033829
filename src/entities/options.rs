//! Entity-layer settings.

/// Environment variable naming the container this process runs in.
pub const ENV_SELF_SERVICE_NAME: &str = "BALENA_SERVICE_NAME";

/// Options applied when building entities for one connection.
///
/// ## Field semantics
/// - `disable_self_control`: deny control commands against `self_service_name`
/// - `self_service_name`: service hosting this process, if known
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityOptions {
    /// Refuse to start/stop/restart the service hosting this process.
    pub disable_self_control: bool,

    /// Name of the service hosting this process.
    pub self_service_name: Option<String>,
}

impl EntityOptions {
    /// Defaults, with `self_service_name` read from `BALENA_SERVICE_NAME`.
    pub fn from_env() -> Self {
        Self {
            self_service_name: std::env::var(ENV_SELF_SERVICE_NAME)
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Whether commands against `service_name` are allowed.
    pub fn allows_control(&self, service_name: &str) -> bool {
        !(self.disable_self_control && self.self_service_name.as_deref() == Some(service_name))
    }
}

impl Default for EntityOptions {
    /// - `disable_self_control = true`
    /// - `self_service_name = None`
    fn default() -> Self {
        Self {
            disable_self_control: true,
            self_service_name: None,
        }
    }
}
