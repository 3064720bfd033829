#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use balena_sync::{
    ApplicationSnapshot, Coordinator, CoordinatorConfig, ServiceAction, SupervisorApi, SyncError,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const SCENARIO: &str = r#"{"tst": {"appId":123,"appName":"tst","commit":"abc","services":{"ha":{"status":"Running","releaseId":1,"downloadProgress":null}}}}"#;

pub const TWO_APPS: &str = r#"{
    "a": {"appId":1,"commit":"x","services":{}},
    "b": {"appId":2,"commit":"y","services":{}}
}"#;

pub fn scenario() -> ApplicationSnapshot {
    ApplicationSnapshot::parse_state(SCENARIO).unwrap()
}

/// Snapshot of app 123 with the given commit and `(service, status)` pairs.
pub fn snapshot(commit: &str, services: &[(&str, &str)]) -> ApplicationSnapshot {
    let services = services
        .iter()
        .map(|(name, status)| {
            format!(r#""{name}":{{"status":"{status}","releaseId":1,"downloadProgress":null}}"#)
        })
        .collect::<Vec<_>>()
        .join(",");
    let body = format!(
        r#"{{"tst":{{"appId":123,"appName":"tst","commit":"{commit}","services":{{{services}}}}}}}"#
    );
    ApplicationSnapshot::parse_state(&body).unwrap()
}

pub fn refused() -> SyncError {
    SyncError::Transport {
        message: "connection refused".into(),
    }
}

/// In-memory supervisor with scripted fetch outcomes.
pub struct FakeSupervisor {
    fetches: AtomicUsize,
    controls: Mutex<Vec<(u64, String, ServiceAction)>>,
    script: Mutex<VecDeque<Result<ApplicationSnapshot, SyncError>>>,
    fallback: Mutex<Result<ApplicationSnapshot, SyncError>>,
    control_result: Mutex<Result<(), SyncError>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeSupervisor {
    /// Fetches answer with `fallback` once the script is exhausted.
    pub fn new(fallback: Result<ApplicationSnapshot, SyncError>) -> Arc<Self> {
        Arc::new(Self {
            fetches: AtomicUsize::new(0),
            controls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            control_result: Mutex::new(Ok(())),
            gate: Mutex::new(None),
        })
    }

    pub fn push(&self, outcome: Result<ApplicationSnapshot, SyncError>) {
        self.script.lock().push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: Result<ApplicationSnapshot, SyncError>) {
        *self.fallback.lock() = outcome;
    }

    pub fn set_control_result(&self, result: Result<(), SyncError>) {
        *self.control_result.lock() = result;
    }

    /// Makes subsequent fetches wait until [`FakeSupervisor::release`].
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn controls(&self) -> Vec<(u64, String, ServiceAction)> {
        self.controls.lock().clone()
    }
}

#[async_trait]
impl SupervisorApi for FakeSupervisor {
    async fn fetch_snapshot(&self) -> Result<ApplicationSnapshot, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        self.fallback.lock().clone()
    }

    async fn control_service(
        &self,
        app_id: u64,
        service_name: &str,
        action: ServiceAction,
    ) -> Result<(), SyncError> {
        self.controls
            .lock()
            .push((app_id, service_name.to_string(), action));
        self.control_result.lock().clone()
    }
}

/// Long normal interval, 10s bursts lasting 90s, no burst on start.
pub fn quiet_config() -> CoordinatorConfig {
    CoordinatorConfig {
        default_interval: Duration::from_secs(300),
        burst_interval: Duration::from_secs(10),
        burst_duration: Duration::from_secs(90),
        burst_on_start: false,
        ..CoordinatorConfig::default()
    }
}

pub async fn start(fake: &Arc<FakeSupervisor>, cfg: CoordinatorConfig) -> Arc<Coordinator> {
    let client: Arc<dyn SupervisorApi> = fake.clone();
    Arc::new(Coordinator::start(cfg, client).await)
}

/// Lets spawned tasks run without moving the paused clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Yields until `cond` holds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
