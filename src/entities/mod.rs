//! # Entities: consumers of the coordinator cache.
//!
//! Entities are the downstream side of the subscriber contract. Each one holds
//! an `Arc<Coordinator>` and a key, reads cached state without blocking, and
//! owns its change subscription.
//!
//! - [`ServiceEntity`]: one per service in the application;
//! - [`DeviceEntity`]: supervisor reachability plus application metadata;
//! - [`EntityRegistry`]: id lookup for command handlers;
//! - [`build_entities`]: creates all of the above from the current snapshot.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use balena_sync::{build_entities, Coordinator, CoordinatorConfig, EntityOptions};
//!
//! # async fn demo() -> Result<(), balena_sync::SyncError> {
//! let coordinator = Arc::new(Coordinator::connect(CoordinatorConfig::from_env()).await?);
//! let entities = build_entities(&coordinator, &EntityOptions::from_env());
//! for svc in &entities.services {
//!     println!("{} = {:?}", svc.entity_id(), svc.native_value());
//! }
//! entities.registry().control("balena_docker.ha", "restart-service").await?;
//! # Ok(())
//! # }
//! ```

mod device;
mod options;
mod registry;
mod service;

use std::sync::Arc;

use crate::core::{Authorization, Coordinator};

pub use device::{DeviceAttributes, DeviceEntity};
pub use options::{ENV_SELF_SERVICE_NAME, EntityOptions};
pub use registry::EntityRegistry;
pub use service::{ServiceAttributes, ServiceEntity};

/// Prefix of every entity id.
pub const DOMAIN: &str = "balena_docker";

/// Entities created for one connection.
#[derive(Debug)]
pub struct Entities {
    pub services: Vec<Arc<ServiceEntity>>,
    pub device: Arc<DeviceEntity>,
}

impl Entities {
    /// Registry holding every service entity.
    pub fn registry(&self) -> EntityRegistry {
        let registry = EntityRegistry::new();
        registry.extend(self.services.iter().cloned());
        registry
    }
}

/// Creates one [`ServiceEntity`] per service in the current snapshot, plus the
/// [`DeviceEntity`].
///
/// Services are taken from the snapshot at call time; with no snapshot yet the
/// list is empty.
pub fn build_entities(coordinator: &Arc<Coordinator>, options: &EntityOptions) -> Entities {
    let services = coordinator
        .service_names()
        .into_iter()
        .map(|name| {
            let auth = Authorization::from(options.allows_control(&name));
            Arc::new(ServiceEntity::new(Arc::clone(coordinator), name, auth))
        })
        .collect();

    Entities {
        services,
        device: Arc::new(DeviceEntity::new(Arc::clone(coordinator))),
    }
}
