//! Task spawning abstraction.
//!
//! Background services such as the room reaper spawn through [`TaskSpawner`]
//! instead of calling `tokio::spawn` directly, so embedders can route them
//! onto a runtime of their choosing.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// The spawned task runs independently of the caller; cancellation is the
/// task's own business (usually a `CancellationToken`).
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a detached background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner bound to a runtime handle.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a spawner for the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
