//! Coordinator core: cached state, polling cadence and refresh de-duplication.
//!
//! The public API from this module is [`Coordinator`] with its
//! [`CoordinatorConfig`], [`Cadence`] and [`Authorization`].
//!
//! Internal modules:
//! - `coordinator`: public handle, control passthrough, burst transitions, teardown;
//! - `refresh`: one fetch shared by concurrent callers, outcome recording;
//! - `scheduler`: polling loop that follows the current cadence;
//! - `burst`: single-entry slot for the burst expiry timer;
//! - `state`: the state record guarded by the coordinator lock;
//! - `config`: connection and cadence settings.

mod burst;
mod config;
mod coordinator;
mod refresh;
mod scheduler;
mod state;

pub use config::{
    CoordinatorConfig, ENV_SUPERVISOR_ADDRESS, ENV_SUPERVISOR_API_KEY, ENV_SUPERVISOR_PORT,
};
pub use coordinator::{Authorization, Coordinator};
pub use state::Cadence;
