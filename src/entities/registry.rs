//! # Entity registry.
//!
//! Maps entity ids to [`ServiceEntity`] handles for one connection. Command
//! handlers resolve an id here and forward the action.
//!
//! ```text
//! control("balena_docker.ha", "restart-service")
//!     ├─► lookup id ── missing ─► UnknownEntity
//!     └─► ServiceEntity::control(action)
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::ServiceEntity;
use crate::error::SyncError;

/// Per-connection map from entity id to entity.
#[derive(Default)]
pub struct EntityRegistry {
    entities: RwLock<BTreeMap<String, Arc<ServiceEntity>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entity` under its entity id, replacing any previous entry.
    pub fn insert(&self, entity: Arc<ServiceEntity>) -> Option<Arc<ServiceEntity>> {
        self.entities.write().insert(entity.entity_id(), entity)
    }

    pub fn extend<I>(&self, entities: I)
    where
        I: IntoIterator<Item = Arc<ServiceEntity>>,
    {
        let mut map = self.entities.write();
        for e in entities {
            map.insert(e.entity_id(), e);
        }
    }

    pub fn remove(&self, entity_id: &str) -> Option<Arc<ServiceEntity>> {
        self.entities.write().remove(entity_id)
    }

    pub fn get(&self, entity_id: &str) -> Option<Arc<ServiceEntity>> {
        self.entities.read().get(entity_id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.entities.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Issues `action` against the entity registered as `entity_id`.
    pub async fn control(&self, entity_id: &str, action: &str) -> Result<(), SyncError> {
        let entity = self.get(entity_id).ok_or_else(|| SyncError::UnknownEntity {
            entity_id: entity_id.to_string(),
        })?;
        debug!(target: "balena_sync::entities", entity_id, action, "dispatching control command");
        entity.control(action).await
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
