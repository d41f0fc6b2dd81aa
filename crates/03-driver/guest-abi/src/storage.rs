//! Persistence collaborator and detached task spawning.

use futures::executor::LocalSpawner;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use crate::error::StorageError;
use transport::Value;

/// Key under which the current level is stored, by both explicit saves and upload autosaves.
pub const LEVEL_KEY: &str = "level";

/// Future returned by [`LevelStore::store`].
pub type StoreFuture = LocalBoxFuture<'static, Result<(), StorageError>>;

/// Asynchronous key/value persistence for level data.
pub trait LevelStore {
    /// Starts writing `value` under `key`. The returned future reports the outcome.
    fn store(&self, key: &str, value: Value) -> StoreFuture;
}

/// Runs fire-and-forget tasks on the host's executor.
pub trait DetachedSpawner {
    /// Spawns `task` without waiting for it.
    fn spawn_detached(&self, task: LocalBoxFuture<'static, ()>);
}

impl DetachedSpawner for LocalSpawner {
    fn spawn_detached(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(err) = self.spawn_local(task) {
            tracing::debug!("dropping detached task: {err}");
        }
    }
}
