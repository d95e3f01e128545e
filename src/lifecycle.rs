use anyhow::Result;

use crate::watcher::DirWatcher;

/// Hooks a hosting runtime invokes around a managed worker's lifetime.
///
/// The process supervisor is an external collaborator; the only contract is
/// that it calls `on_create` once the worker exists and `on_exit` before the
/// worker goes away. Background resources (watchers, pools) belong inside the
/// implementor, not in the supervisor.
pub trait WorkerLifecycle {
    /// Spawn watchers and other background resources here.
    fn on_create(&mut self) -> Result<()>;

    /// Tear everything down. Must not assume `on_create` succeeded.
    fn on_exit(&mut self);
}

/// Owns any number of directory watchers and shuts them down in two phases.
#[derive(Default)]
pub struct WatcherPool {
    watchers: Vec<DirWatcher>,
}

impl WatcherPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, watcher: DirWatcher) {
        self.watchers.push(watcher);
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Watchers whose threads are still alive.
    pub fn running_count(&self) -> usize {
        self.watchers.iter().filter(|w| w.is_running()).count()
    }

    pub fn watchers(&self) -> &[DirWatcher] {
        &self.watchers
    }

    /// Stops every watcher before joining any of them. With many watchers the
    /// stop requests land while each loop is still inside its current poll,
    /// so total shutdown stays near one poll timeout instead of one per
    /// watcher.
    pub fn shutdown(mut self) {
        for watcher in &self.watchers {
            watcher.stop();
        }
        for watcher in self.watchers.drain(..) {
            watcher.join();
        }
    }
}
