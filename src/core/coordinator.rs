//! # Coordinator: cached application state, adaptive polling and change fan-out.
//!
//! The [`Coordinator`] is the single authority for "what is the current known
//! state" of one supervisor connection. It owns the last snapshot, the polling
//! task, the burst timer and the listener set.
//!
//! ## Architecture
//! ```text
//!   Coordinator::start(cfg, client)
//!       ├─► refresh()                 (eager, before start returns)
//!       ├─► start_burst_refresh()     (if cfg.burst_on_start)
//!       └─► spawn scheduler::run()
//!
//!   control_service(svc, action, auth)
//!       ├─► Denied?          ─► PermissionDenied     (no network)
//!       ├─► no snapshot yet? ─► NotReady             (no network)
//!       ├─► client.control_service(app_id, svc, action)
//!       ├─► start_burst_refresh()  ─► Normal/Burst ─► Burst, notify, reschedule
//!       └─► request_refresh()      ─► joins or starts the in-flight refresh
//!
//!   burst timer fires (generation still current)
//!       └─► Burst ─► Normal, notify, reschedule
//! ```
//!
//! ## Cadence
//! - `Normal`: refresh every `default_interval`.
//! - `Burst`: refresh every `burst_interval` until `burst_duration` after the
//!   **latest** `start_burst_refresh()`; re-arming replaces the pending timer.
//!
//! ## Teardown
//! [`Coordinator::shutdown`] (or dropping the coordinator) cancels the scheduler,
//! the burst timer and any in-flight refresh, and clears all listeners. A fetch
//! that completes afterwards is discarded.
//!
//! ## Example
//! ```no_run
//! use balena_sync::{Authorization, Coordinator, CoordinatorConfig, ServiceAction};
//!
//! # async fn demo() -> Result<(), balena_sync::SyncError> {
//! let coordinator = Coordinator::connect(CoordinatorConfig::from_env()).await?;
//! if !coordinator.last_update_succeeded() {
//!     return Err(coordinator.last_error().unwrap_or(balena_sync::SyncError::NotReady));
//! }
//!
//! let _sub = coordinator.subscribe(|| println!("state changed"));
//! coordinator
//!     .control_service("ha", ServiceAction::Restart, Authorization::Allowed)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    config::CoordinatorConfig,
    refresh::InFlight,
    scheduler,
    state::{Cadence, SyncState},
};
use crate::client::{HttpSupervisorClient, ServiceAction, SupervisorApi};
use crate::error::SyncError;
use crate::model::{ApplicationSnapshot, ServiceState};
use crate::subscribers::{ListenerSet, Subscription};

pub(super) const TARGET: &str = "balena_sync::coordinator";

/// Whether the caller may control the targeted service.
///
/// The policy lives with the caller (e.g. an entity mirroring its own
/// container); the coordinator only enforces the verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
}

impl From<bool> for Authorization {
    fn from(allowed: bool) -> Self {
        if allowed {
            Authorization::Allowed
        } else {
            Authorization::Denied
        }
    }
}

/// Shared internals, referenced by the scheduler, timers and in-flight refreshes.
pub(super) struct Inner {
    pub cfg: CoordinatorConfig,
    pub client: Arc<dyn SupervisorApi>,
    pub state: RwLock<SyncState>,
    pub listeners: Arc<ListenerSet>,
    pub inflight: Mutex<InFlight>,
    pub reschedule: Notify,
    pub token: CancellationToken,
}

impl Inner {
    pub fn refresh_interval(&self) -> Duration {
        self.state.read().cadence.interval(
            self.cfg.default_interval_clamped(),
            self.cfg.burst_interval_clamped(),
        )
    }

    fn start_burst(self: &Arc<Self>) {
        let duration = self.cfg.burst_duration;
        let (generation, timer_token, rearmed) = {
            let mut st = self.state.write();
            if self.token.is_cancelled() {
                return;
            }
            let rearmed = st.cadence.is_burst();
            let (generation, timer_token) = st.burst.arm(&self.token);
            st.cadence = Cadence::Burst {
                until: Instant::now() + duration,
            };
            (generation, timer_token, rearmed)
        };

        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = timer_token.cancelled() => {}
                _ = time::sleep(duration) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.end_burst(generation);
                    }
                }
            }
        });

        if rearmed {
            info!(target: TARGET, generation, ?duration, "burst refresh re-armed");
        } else {
            info!(target: TARGET, generation, ?duration, "burst refresh started");
        }
        self.listeners.notify();
        self.reschedule.notify_one();
    }

    fn end_burst(&self, generation: u64) {
        {
            let mut st = self.state.write();
            if self.token.is_cancelled() || !st.burst.take_if_current(generation) {
                return;
            }
            st.cadence = Cadence::Normal;
        }

        info!(target: TARGET, generation, "burst refresh expired");
        self.listeners.notify();
        self.reschedule.notify_one();
    }

    fn close(&self) {
        {
            let mut st = self.state.write();
            if self.token.is_cancelled() {
                return;
            }
            self.token.cancel();
            st.burst.cancel();
        }
        self.inflight.lock().reset();
        self.listeners.close();
        info!(target: TARGET, "coordinator shut down");
    }
}

/// Cached view of one supervisor application, kept fresh by polling.
///
/// Create one per connection with [`Coordinator::start`] or
/// [`Coordinator::connect`]; share it behind an `Arc` with consumers.
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Builds an HTTP client from `cfg` and starts a coordinator on it.
    pub async fn connect(cfg: CoordinatorConfig) -> Result<Self, SyncError> {
        let client = HttpSupervisorClient::from_config(&cfg)?;
        Ok(Self::start(cfg, Arc::new(client)).await)
    }

    /// Starts a coordinator on `client`.
    ///
    /// Performs the first refresh before returning; check
    /// [`last_update_succeeded`](Self::last_update_succeeded) to see whether it
    /// worked. Must be called within a tokio runtime.
    pub async fn start(cfg: CoordinatorConfig, client: Arc<dyn SupervisorApi>) -> Self {
        let inner = Arc::new(Inner {
            cfg,
            client,
            state: RwLock::new(SyncState::new()),
            listeners: Arc::new(ListenerSet::new()),
            inflight: Mutex::new(InFlight::default()),
            reschedule: Notify::new(),
            token: CancellationToken::new(),
        });

        // Failures are recorded in the state; the caller inspects them.
        let _ = inner.refresh().await;

        if inner.cfg.burst_on_start {
            inner.start_burst();
        }

        tokio::spawn(scheduler::run(Arc::clone(&inner)));
        Self { inner }
    }

    /// Registers `listener`, called after every refresh and cadence change.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or unsubscribed. On a closed coordinator the subscription is inert.
    ///
    /// Notification rounds never overlap across tasks or threads; they run one
    /// after another, in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.listeners.insert(Arc::new(listener));
        Subscription::new(Arc::downgrade(&self.inner.listeners), id)
    }

    /// Refreshes now (or joins a refresh already in flight) and reports the outcome.
    pub async fn request_refresh(&self) -> Result<(), SyncError> {
        self.inner.refresh().await
    }

    /// Switches to the burst interval for `burst_duration` from now.
    ///
    /// Calling it again while bursting restarts the countdown.
    pub fn start_burst_refresh(&self) {
        self.inner.start_burst();
    }

    /// Issues `action` for `service_name`, then bursts and refreshes.
    ///
    /// Returns `PermissionDenied` (for [`Authorization::Denied`]) or `NotReady`
    /// (no snapshot yet) without contacting the supervisor. When the command
    /// succeeds, the result of the follow-up refresh is returned.
    pub async fn control_service(
        &self,
        service_name: &str,
        action: ServiceAction,
        auth: Authorization,
    ) -> Result<(), SyncError> {
        if self.inner.token.is_cancelled() {
            return Err(SyncError::Closed);
        }
        if auth == Authorization::Denied {
            return Err(SyncError::PermissionDenied {
                service: service_name.to_string(),
            });
        }
        let app_id = self.application_id().ok_or(SyncError::NotReady)?;

        info!(
            target: TARGET,
            app_id,
            service = service_name,
            action = action.as_str(),
            "issuing control command"
        );
        let sent = tokio::select! {
            biased;
            _ = self.inner.token.cancelled() => Err(SyncError::Closed),
            res = self.inner.client.control_service(app_id, service_name, action) => res,
        };
        if let Err(e) = sent {
            warn!(
                target: TARGET,
                service = service_name,
                action = action.as_str(),
                error = e.as_label(),
                "control command failed: {}",
                e.as_message()
            );
            return Err(e);
        }

        self.inner.start_burst();
        self.inner.refresh().await
    }

    /// Latest successfully fetched snapshot.
    pub fn snapshot(&self) -> Option<Arc<ApplicationSnapshot>> {
        self.inner.state.read().snapshot.clone()
    }

    /// Whether the most recent refresh attempt succeeded.
    pub fn last_update_succeeded(&self) -> bool {
        self.inner.state.read().last_update_succeeded
    }

    /// Error of the most recent refresh attempt, `None` after a success.
    pub fn last_error(&self) -> Option<SyncError> {
        self.inner.state.read().last_error.clone()
    }

    /// Application id from the latest snapshot.
    pub fn application_id(&self) -> Option<u64> {
        self.inner.state.read().application_id()
    }

    /// Cached state of one service. Never blocks on the network.
    pub fn service(&self, name: &str) -> Option<ServiceState> {
        let st = self.inner.state.read();
        st.snapshot.as_ref()?.service(name).cloned()
    }

    /// True iff the last refresh succeeded and the snapshot has `name`.
    pub fn is_service_available(&self, name: &str) -> bool {
        let st = self.inner.state.read();
        st.last_update_succeeded
            && st
                .snapshot
                .as_ref()
                .is_some_and(|s| s.services.contains_key(name))
    }

    /// Service names of the latest snapshot, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.snapshot()
            .map(|s| s.services.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn cadence(&self) -> Cadence {
        self.inner.state.read().cadence
    }

    /// Current polling period.
    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval()
    }

    /// When the current burst ends, if bursting.
    pub fn burst_expiry(&self) -> Option<Instant> {
        self.cadence().burst_expiry()
    }

    /// Number of armed burst expiry timers (0 or 1).
    pub fn pending_burst_timers(&self) -> usize {
        self.inner.state.read().burst.outstanding()
    }

    /// True while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.inflight.lock().is_busy()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.cfg
    }

    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Stops polling, cancels timers and in-flight work, drops all listeners.
    ///
    /// Idempotent. Later operations return [`SyncError::Closed`] or do nothing.
    pub fn shutdown(&self) {
        self.inner.close();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.inner.state.read();
        f.debug_struct("Coordinator")
            .field("base_url", &self.inner.cfg.base_url)
            .field("app_id", &st.application_id())
            .field("last_update_succeeded", &st.last_update_succeeded)
            .field("cadence", &st.cadence)
            .field("listeners", &self.inner.listeners.len())
            .field("closed", &self.inner.token.is_cancelled())
            .finish()
    }
}
