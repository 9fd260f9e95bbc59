//! Singleton registry of repository instances.

use crate::error::{CoreError, CoreResult};
use crate::repository::{Repository, RepositoryType};
use docrepo_driver::Client;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type Instance = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<Instance>>;

/// Holds exactly one live instance per repository type.
///
/// Instances are built lazily on first request. Concurrent first requests
/// for the same type race on a per-type slot: one caller constructs, the
/// others block on that slot and then share the result. A failed
/// construction leaves the slot empty so a later call can retry.
pub struct RepositoryRegistry {
    client: Arc<dyn Client>,
    slots: RwLock<HashMap<TypeId, Slot>>,
}

impl RepositoryRegistry {
    /// Creates an empty registry building repositories on `client`.
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self {
            client,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the instance of `R`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns the construction error (invalid descriptor, unreachable
    /// store). The next call retries.
    pub fn get_or_create<R: RepositoryType>(&self) -> CoreResult<Arc<R>> {
        let slot = self.slot(TypeId::of::<R>());
        let instance = slot.get_or_try_init(|| {
            let repository = Repository::<R::Entity>::new(Arc::clone(&self.client))?;
            debug!(
                repository = std::any::type_name::<R>(),
                collection = repository.collection_name(),
                "constructed repository"
            );
            Ok::<Instance, CoreError>(Arc::new(R::from_repository(repository)))
        })?;

        Arc::clone(instance).downcast::<R>().map_err(|_| {
            CoreError::definition(
                std::any::type_name::<R>(),
                "registry slot holds an instance of another type",
            )
        })
    }

    /// Returns the instance of `R` if it was already constructed.
    pub fn get<R: RepositoryType>(&self) -> Option<Arc<R>> {
        let slot = self.slots.read().get(&TypeId::of::<R>()).cloned()?;
        let instance = slot.get()?;
        Arc::clone(instance).downcast::<R>().ok()
    }

    /// Returns true if an instance of `R` exists.
    pub fn contains<R: RepositoryType>(&self) -> bool {
        self.get::<R>().is_some()
    }

    /// Returns the number of constructed instances.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Returns true if no instance was constructed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: TypeId) -> Slot {
        if let Some(slot) = self.slots.read().get(&key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(key).or_default())
    }
}

impl std::fmt::Debug for RepositoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryRegistry")
            .field("instances", &self.len())
            .finish_non_exhaustive()
    }
}
