use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};

use crate::config::LullwatchConfig;
use crate::ignore::IgnoreHandle;
use crate::watcher::DirWatcher;

/// A shared collection that can re-scan itself from its directory.
pub trait Reload {
    fn reload(&mut self) -> Result<()>;
}

/// Couples a reloadable store with the watcher that keeps it fresh.
///
/// One mutex serializes every access: the watcher's reload callback takes it,
/// and so does every thread mutating the store directly. Writers go through
/// `lock_for_write` and mark each filename they are about to touch, so the
/// watcher suppresses the events caused by the store's own writes instead of
/// reloading it over them.
pub struct StoreWatcher<S> {
    store: Arc<Mutex<S>>,
    watcher: DirWatcher,
    ignore: IgnoreHandle,
}

impl<S> StoreWatcher<S>
where
    S: Reload + Send + 'static,
{
    pub fn new<P: AsRef<Path>>(
        dir: P,
        config: &LullwatchConfig,
        store: Arc<Mutex<S>>,
    ) -> Result<Self> {
        let callback_store = Arc::clone(&store);
        let watcher = DirWatcher::with_config(dir, &config.watcher, move |changes| {
            tracing::debug!("Reloading store after changes: {:?}", changes);
            let mut store = callback_store.lock();
            if let Err(err) = store.reload() {
                tracing::error!("Store reload failed: {:#}", err);
            }
        })?;
        let ignore = watcher.ignore_handle(config.store.write_ignore());

        Ok(Self {
            store,
            watcher,
            ignore,
        })
    }

    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// Locks the store for reading.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.store.lock()
    }

    /// Locks the store for writing. Mark every filename the write will touch
    /// via the returned guard before actually touching it.
    pub fn lock_for_write(&self) -> StoreGuard<'_, S> {
        StoreGuard {
            guard: self.store.lock(),
            ignore: &self.ignore,
        }
    }

    pub fn watcher(&self) -> &DirWatcher {
        &self.watcher
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// See `DirWatcher::stop`. Split from `join` so many stores can be
    /// stopped before any of them is joined.
    pub fn stop(&self) {
        self.watcher.stop();
    }

    /// See `DirWatcher::join`.
    pub fn join(&self) {
        self.watcher.join();
    }
}

/// Write access to the store with the single-writer lock held.
///
/// `mark_write` registers the short-lived ignore while the lock is still
/// held; releasing the lock first would let the watcher observe the write
/// before the ignore lands.
pub struct StoreGuard<'a, S> {
    guard: MutexGuard<'a, S>,
    ignore: &'a IgnoreHandle,
}

impl<S> StoreGuard<'_, S> {
    pub fn mark_write(&self, name: &str) {
        self.ignore.ignore(name);
    }
}

impl<S> Deref for StoreGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.guard
    }
}

impl<S> DerefMut for StoreGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.guard
    }
}
