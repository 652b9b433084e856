// crates/voxeld-core/src/guard.rs
// ============================================================================
// Module: Scene Guard
// Description: Shared, RW-locked wrapper around a single SceneEngine.
// Purpose: Serialize Exclusive access and permit concurrent Shared access,
//          per the daemon core's concurrency model.
// Dependencies: tokio (sync), crate::engine
// ============================================================================

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::sync::RwLockReadGuard;
use tokio::sync::RwLockWriteGuard;

use crate::engine::SceneEngine;

/// A shared, clonable handle to the single process-wide `SceneEngine`,
/// guarded by a readers-writer lock.
///
/// `Exclusive` handlers call [`SharedScene::write`] and get the write side;
/// `Shared` handlers call [`SharedScene::read`] and get the read side.
/// `Free` handlers never touch this type at all. Two `Exclusive` handlers
/// never hold the write guard concurrently; any number of `Shared` handlers
/// may hold the read guard concurrently, but never alongside a writer.
#[derive(Clone)]
pub struct SharedScene {
    /// The guarded engine instance.
    inner: Arc<RwLock<dyn SceneEngine + Send + Sync>>,
}

impl SharedScene {
    /// Wraps a concrete `SceneEngine` implementation in a shared guard.
    #[must_use]
    pub fn new(engine: impl SceneEngine + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Acquires the write (`Exclusive`) side of the guard.
    pub async fn write(&self) -> RwLockWriteGuard<'_, dyn SceneEngine + Send + Sync> {
        self.inner.write().await
    }

    /// Acquires the read (`Shared`) side of the guard.
    pub async fn read(&self) -> RwLockReadGuard<'_, dyn SceneEngine + Send + Sync> {
        self.inner.read().await
    }
}
