use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

/// A queued registration: filename plus the absolute expiry instant, computed
/// on the producer's thread at call time.
pub(crate) type IgnoreRequest = (String, Instant);

/// Filenames the watcher should not react to, mapped to when each ignore
/// expires. Owned by the watcher thread; other threads feed it through the
/// handoff channel and never touch the map directly.
#[derive(Debug)]
pub struct IgnoreList {
    entries: HashMap<String, Instant>,
    rx: Receiver<IgnoreRequest>,
}

impl IgnoreList {
    /// Builds the registry together with the sender side of its handoff
    /// channel. The sender is cheap to clone and safe to share across threads.
    pub(crate) fn channel() -> (Sender<IgnoreRequest>, IgnoreList) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (
            tx,
            IgnoreList {
                entries: HashMap::new(),
                rx,
            },
        )
    }

    /// Drains every queued registration without blocking and upserts it.
    /// Re-registering a filename overwrites the earlier expiry.
    pub fn apply_pending(&mut self) {
        while let Ok((name, expiry)) = self.rx.try_recv() {
            self.entries.insert(name, expiry);
        }
    }

    /// Removes every entry whose expiry is at or before `now`.
    pub fn prune_expired(&mut self, now: Instant) {
        self.entries.retain(|_, expiry| now < *expiry);
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Producer half of the ignore registry with a fixed timeout, handed to code
/// that writes watched files (stores mark each filename right before the
/// write). Cloneable and callable from any thread; after the watcher has shut
/// down, registrations degrade to a no-op.
#[derive(Debug, Clone)]
pub struct IgnoreHandle {
    tx: Sender<IgnoreRequest>,
    timeout: Duration,
}

impl IgnoreHandle {
    pub(crate) fn new(tx: Sender<IgnoreRequest>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    pub fn ignore(&self, name: &str) {
        send_ignore(&self.tx, name, self.timeout);
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Fire-and-forget registration. The expiry clock starts here, not when the
/// watcher thread gets around to applying the entry.
pub(crate) fn send_ignore(tx: &Sender<IgnoreRequest>, name: &str, timeout: Duration) {
    let expiry = Instant::now() + timeout;
    if tx.send((name.to_string(), expiry)).is_err() {
        tracing::debug!("Dropping ignore registration for {}: watcher is gone", name);
    }
}
