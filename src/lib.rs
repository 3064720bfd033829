//! # balena-sync
//!
//! **balena-sync** keeps a local, always-readable view of the services a balena
//! supervisor runs, refreshes it by polling, and tells interested consumers
//! when it changed. Consumers may also start, stop or restart services; the
//! coordinator then polls faster for a while so the effect shows up quickly.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────────────┐        GET  /v2/applications/state
//!     │ HttpSupervisorClient │ ◄────► POST /v2/applications/{id}/{action}
//!     │   (SupervisorApi)    │
//!     └──────────┬───────────┘
//!                │ fetch_snapshot / control_service
//!                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Coordinator (one per supervisor connection)                      │
//! │  - SyncState   (snapshot, last outcome, cadence, burst slot)      │
//! │  - InFlight    (one shared refresh future at a time)              │
//! │  - scheduler   (polls at the default or the burst interval)       │
//! │  - ListenerSet (callbacks fired after refreshes and transitions)  │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ notify()         │ notify()         │ notify()
//!        ▼                  ▼                  ▼
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │ServiceEntity │   │ServiceEntity │   │ DeviceEntity │
//!  │   ("ha")     │   │   ("db")     │   │ online/offl. │
//!  └──────┬───────┘   └──────────────┘   └──────────────┘
//!         │ control("restart-service")
//!         └──► Coordinator::control_service ──► burst ──► refresh
//! ```
//!
//! ### Cadence
//! ```text
//!            start_burst_refresh()            start_burst_refresh()
//!   Normal ───────────────────────► Burst ◄───────────────────────┐
//!     ▲                              │  └────── (re-arm: timer ───┘
//!     │    burst_duration elapsed    │          replaced, not stacked)
//!     └──────────────────────────────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Coordinator**   | Cached snapshot, adaptive polling, refresh de-duplication.    | [`Coordinator`], [`Cadence`]                |
//! | **Client**        | Supervisor HTTP API behind a mockable trait.                  | [`SupervisorApi`], [`HttpSupervisorClient`] |
//! | **Listeners**     | No-argument change callbacks with scoped unsubscription.      | [`Subscription`]                            |
//! | **Entities**      | Per-service and device consumers, id registry.                | [`ServiceEntity`], [`DeviceEntity`]         |
//! | **Errors**        | One cloneable error type for every failure.                   | [`SyncError`]                               |
//! | **Configuration** | Connection and cadence settings, env bootstrap.               | [`CoordinatorConfig`], [`EntityOptions`]    |
//!
//! ## Logging
//! The crate emits [`tracing`] events under the targets `balena_sync::client`,
//! `balena_sync::coordinator`, `balena_sync::listeners` and
//! `balena_sync::entities`. Install any subscriber to see them.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use balena_sync::{Authorization, Coordinator, CoordinatorConfig, ServiceAction};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Arc::new(Coordinator::connect(CoordinatorConfig::from_env()).await?);
//!     if !coordinator.last_update_succeeded() {
//!         eprintln!("supervisor unreachable: {:?}", coordinator.last_error());
//!     }
//!
//!     let c = Arc::clone(&coordinator);
//!     let _sub = coordinator.subscribe(move || {
//!         for name in c.service_names() {
//!             println!("{name}: {:?}", c.service(&name).map(|s| s.status));
//!         }
//!     });
//!
//!     coordinator
//!         .control_service("ha", ServiceAction::Restart, Authorization::Allowed)
//!         .await?;
//!
//!     coordinator.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! A listener that captures an `Arc<Coordinator>` keeps the coordinator alive;
//! call [`Coordinator::shutdown`] to release it.
mod client;
mod core;
mod entities;
mod error;
mod model;
mod subscribers;

// ---- Public re-exports ----

pub use client::{HttpSupervisorClient, ServiceAction, SupervisorApi};
pub use core::{
    Authorization, Cadence, Coordinator, CoordinatorConfig, ENV_SUPERVISOR_ADDRESS,
    ENV_SUPERVISOR_API_KEY, ENV_SUPERVISOR_PORT,
};
pub use entities::{
    DOMAIN, DeviceAttributes, DeviceEntity, ENV_SELF_SERVICE_NAME, Entities, EntityOptions,
    EntityRegistry, ServiceAttributes, ServiceEntity, build_entities,
};
pub use error::SyncError;
pub use model::{ApplicationSnapshot, DownloadProgress, ServiceState, ServiceStatus};
pub use subscribers::Subscription;
