//! # Example: watch a supervisor
//!
//! Connects with the `BALENA_SUPERVISOR_*` environment, prints every service
//! whenever the coordinator reports a change, and restarts one service if
//! `WATCH_RESTART=<service>` is set.
//!
//! ```text
//! RUST_LOG=balena_sync=debug cargo run --example watch
//! ```

use std::sync::Arc;

use balena_sync::{Coordinator, CoordinatorConfig, EntityOptions, build_entities};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = CoordinatorConfig::from_env();
    println!("[watch] connecting to {}", cfg.base_url);
    let coordinator = Arc::new(Coordinator::connect(cfg).await?);
    if let Some(err) = coordinator.last_error() {
        println!("[watch] initial refresh failed: {err}");
    }

    let entities = build_entities(&coordinator, &EntityOptions::from_env());
    let registry = entities.registry();

    for svc in &entities.services {
        let entity = Arc::downgrade(svc);
        svc.attach(move || {
            if let Some(e) = entity.upgrade() {
                let value = e.native_value().map(|s| s.to_string());
                println!("[watch] {} = {}", e.entity_id(), value.as_deref().unwrap_or("unavailable"));
            }
        });
    }
    let device = Arc::downgrade(&entities.device);
    entities.device.attach(move || {
        if let Some(d) = device.upgrade() {
            println!("[watch] device {} {:?}", d.native_value(), d.attributes().map(|a| a.commit));
        }
    });

    if let Ok(service) = std::env::var("WATCH_RESTART") {
        let id = format!("{}.{service}", balena_sync::DOMAIN);
        match registry.control(&id, "restart-service").await {
            Ok(()) => println!("[watch] restarted {service}"),
            Err(e) => println!("[watch] restart of {service} failed: {e}"),
        }
    }

    tokio::signal::ctrl_c().await?;
    println!("[watch] shutting down");
    coordinator.shutdown();
    Ok(())
}
