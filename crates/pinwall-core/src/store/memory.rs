//! In-memory object store.

use super::{BoxFuture, ChangeCallback, ObjectStore, StoreError, StoreResult, SubscriptionId};
use crate::object::{CanvasObject, ObjectId, ObjectPatch};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory store for tests, replays and offline use.
///
/// Subscribers are called synchronously after every successful change and
/// must not call back into the store.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectId, CanvasObject>>,
    subscribers: RwLock<Vec<(SubscriptionId, ChangeCallback)>>,
    next_subscription: AtomicU64,
    reject_with: RwLock<Option<String>>,
}

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Other(format!("Lock error: {}", e))
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `objects`.
    pub fn with_objects(objects: impl IntoIterator<Item = CanvasObject>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.objects.write() {
            map.extend(objects.into_iter().map(|o| (o.id, o)));
        }
        store
    }

    /// Add or replace an object and notify subscribers.
    pub fn insert(&self, object: CanvasObject) -> StoreResult<()> {
        self.objects
            .write()
            .map_err(lock_error)?
            .insert(object.id, object);
        self.notify()
    }

    pub fn get(&self, id: ObjectId) -> Option<CanvasObject> {
        self.objects.read().ok()?.get(&id).cloned()
    }

    /// All objects ordered by z-index.
    pub fn objects(&self) -> StoreResult<Vec<CanvasObject>> {
        let map = self.objects.read().map_err(lock_error)?;
        let mut objects: Vec<_> = map.values().cloned().collect();
        objects.sort_by_key(|o| (o.z_index, o.id));
        Ok(objects)
    }

    /// Make every following write fail with `reason`, or stop doing so.
    pub fn set_rejecting(&self, reason: Option<String>) {
        if let Ok(mut reject) = self.reject_with.write() {
            *reject = reason;
        }
    }

    fn check_rejecting(&self) -> StoreResult<()> {
        match self.reject_with.read().map_err(lock_error)?.as_ref() {
            Some(reason) => Err(StoreError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }

    fn notify(&self) -> StoreResult<()> {
        let snapshot = self.objects()?;
        let subscribers = self.subscribers.read().map_err(lock_error)?;
        for (_, callback) in subscribers.iter() {
            callback(&snapshot);
        }
        Ok(())
    }

    fn apply(&self, updates: &[(ObjectId, ObjectPatch)]) -> StoreResult<()> {
        self.check_rejecting()?;
        {
            let mut map = self.objects.write().map_err(lock_error)?;
            if let Some((missing, _)) = updates.iter().find(|(id, _)| !map.contains_key(id)) {
                return Err(StoreError::NotFound(*missing));
            }
            for (id, patch) in updates {
                if let Some(object) = map.get_mut(id) {
                    patch.apply(object);
                }
            }
        }
        self.notify()
    }
}

impl ObjectStore for MemoryStore {
    fn subscribe(&self, on_change: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        match self.subscribers.write() {
            Ok(mut subscribers) => subscribers.push((id, on_change)),
            Err(e) => log::error!("Failed to register subscriber: {}", e),
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.retain(|(sub, _)| *sub != id);
        }
    }

    fn update_object(&self, id: ObjectId, patch: ObjectPatch) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move { self.apply(&[(id, patch)]) })
    }

    fn batch_update(&self, updates: Vec<(ObjectId, ObjectPatch)>) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move { self.apply(&updates) })
    }

    fn delete_object(&self, id: ObjectId) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.check_rejecting()?;
            let removed = self.objects.write().map_err(lock_error)?.remove(&id);
            if removed.is_none() {
                return Err(StoreError::NotFound(id));
            }
            self.notify()
        })
    }
}
