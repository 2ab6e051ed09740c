//! Object store collaborator and the outbound command queue.
//!
//! The canvas never waits on the store. Geometry is applied to the local cache
//! first and queued as [`StoreCommand`]s; the host drains the queue and hands
//! it to [`flush_commands`]. Failures are reported back, local state is kept.

mod memory;

pub use memory::MemoryStore;

use crate::object::{CanvasObject, ObjectId, ObjectPatch};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),
    #[error("Store rejected update: {0}")]
    Rejected(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store error: {0}")]
    Other(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Callback receiving the full object list after every change.
#[cfg(not(target_arch = "wasm32"))]
pub type ChangeCallback = Box<dyn Fn(&[CanvasObject]) + Send + Sync>;
/// Callback receiving the full object list after every change.
#[cfg(target_arch = "wasm32")]
pub type ChangeCallback = Box<dyn Fn(&[CanvasObject])>;

/// Handle returned by [`ObjectStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Backing store for canvas objects.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait ObjectStore: Send + Sync {
    /// Register for object-list changes.
    fn subscribe(&self, on_change: ChangeCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Apply a partial update to one object.
    fn update_object(&self, id: ObjectId, patch: ObjectPatch) -> BoxFuture<'_, StoreResult<()>>;

    /// Apply several partial updates together.
    fn batch_update(&self, updates: Vec<(ObjectId, ObjectPatch)>) -> BoxFuture<'_, StoreResult<()>>;

    fn delete_object(&self, id: ObjectId) -> BoxFuture<'_, StoreResult<()>>;
}

/// Backing store for canvas objects (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait ObjectStore {
    /// Register for object-list changes.
    fn subscribe(&self, on_change: ChangeCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Apply a partial update to one object.
    fn update_object(&self, id: ObjectId, patch: ObjectPatch) -> BoxFuture<'_, StoreResult<()>>;

    /// Apply several partial updates together.
    fn batch_update(&self, updates: Vec<(ObjectId, ObjectPatch)>) -> BoxFuture<'_, StoreResult<()>>;

    fn delete_object(&self, id: ObjectId) -> BoxFuture<'_, StoreResult<()>>;
}

/// A change waiting to be sent to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreCommand {
    Update { id: ObjectId, patch: ObjectPatch },
    Batch { updates: Vec<(ObjectId, ObjectPatch)> },
    Delete { id: ObjectId },
}

impl StoreCommand {
    /// Ids touched by this command.
    pub fn ids(&self) -> Vec<ObjectId> {
        match self {
            StoreCommand::Update { id, .. } | StoreCommand::Delete { id } => vec![*id],
            StoreCommand::Batch { updates } => updates.iter().map(|(id, _)| *id).collect(),
        }
    }
}

/// A command the store refused.
#[derive(Debug)]
pub struct CommitFailure {
    pub command: StoreCommand,
    pub error: StoreError,
}

/// Send queued commands in order. Every command is attempted; failures are
/// logged and returned, nothing is retried or rolled back.
pub async fn flush_commands<S>(store: &S, commands: Vec<StoreCommand>) -> Vec<CommitFailure>
where
    S: ObjectStore + ?Sized,
{
    let mut failures = Vec::new();
    for command in commands {
        let result = match &command {
            StoreCommand::Update { id, patch } => store.update_object(*id, *patch).await,
            StoreCommand::Batch { updates } => store.batch_update(updates.clone()).await,
            StoreCommand::Delete { id } => store.delete_object(*id).await,
        };
        if let Err(error) = result {
            log::error!("Store rejected {:?}: {}", command.ids(), error);
            failures.push(CommitFailure { command, error });
        }
    }
    failures
}
