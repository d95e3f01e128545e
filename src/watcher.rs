use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::config::WatcherConfig;
use crate::events::FileChange;
use crate::ignore::{send_ignore, IgnoreHandle, IgnoreList, IgnoreRequest};
use crate::pending::PendingOps;
use crate::source::EventSource;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Callback invoked once per flush with the drained change set. Runs on the
/// watcher thread, never on the caller's.
pub type ChangeCallback = Box<dyn FnMut(Vec<FileChange>) + Send + 'static>;

/// Handle to one watched directory and its background thread.
///
/// The thread starts in the constructor and runs until `stop()` is observed,
/// the event source fails, or the callback panics. `is_running()` turning
/// false is the only signal for the latter two; nothing restarts the thread.
pub struct DirWatcher {
    dir: PathBuf,
    stop: Arc<AtomicBool>,
    ignore_tx: Sender<IgnoreRequest>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DirWatcher {
    /// Watches `dir` with the default poll timeout. Setup problems (missing
    /// directory, watch registration failure) fail here synchronously; no
    /// thread is started in that case.
    pub fn new<P, F>(dir: P, quiet_period: Duration, callback: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(Vec<FileChange>) + Send + 'static,
    {
        Self::spawn(
            dir.as_ref(),
            quiet_period,
            DEFAULT_POLL_TIMEOUT,
            Box::new(callback),
        )
    }

    /// Like `new`, with quiet period and poll timeout taken from config.
    pub fn with_config<P, F>(dir: P, config: &WatcherConfig, callback: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(Vec<FileChange>) + Send + 'static,
    {
        Self::spawn(
            dir.as_ref(),
            config.quiet_period(),
            config.poll_timeout(),
            Box::new(callback),
        )
    }

    /// Like `new`, with an explicit poll timeout. The poll timeout bounds both
    /// flush-check granularity and worst-case stop latency.
    pub fn with_timing<P, F>(
        dir: P,
        quiet_period: Duration,
        poll_timeout: Duration,
        callback: F,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(Vec<FileChange>) + Send + 'static,
    {
        Self::spawn(dir.as_ref(), quiet_period, poll_timeout, Box::new(callback))
    }

    fn spawn(
        dir: &Path,
        quiet_period: Duration,
        poll_timeout: Duration,
        callback: ChangeCallback,
    ) -> Result<Self> {
        if quiet_period.is_zero() {
            anyhow::bail!("Quiet period must be positive");
        }
        if poll_timeout.is_zero() {
            anyhow::bail!("Poll timeout must be positive");
        }

        let source = EventSource::new(dir)?;
        let dir = source.dir().to_path_buf();
        let (ignore_tx, ignores) = IgnoreList::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let loop_stop = Arc::clone(&stop);
        let loop_dir = dir.clone();
        let handle = thread::Builder::new()
            .name("lullwatch".to_string())
            .spawn(move || {
                tracing::debug!("Watching {}", loop_dir.display());
                match run_loop(source, ignores, quiet_period, poll_timeout, &loop_stop, callback) {
                    Ok(()) => tracing::debug!("Watcher for {} stopped", loop_dir.display()),
                    Err(err) => {
                        tracing::error!("Watcher for {} terminated: {:#}", loop_dir.display(), err)
                    }
                }
            })
            .context("Failed to spawn watcher thread")?;

        Ok(Self {
            dir,
            stop,
            ignore_tx,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// The watched directory, canonicalized.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Registers a short-lived ignore for `name`. Fire-and-forget, callable
    /// from any thread; the expiry clock starts now, not when the watcher
    /// thread applies the entry.
    pub fn add_ignore(&self, name: &str, timeout: Duration) {
        send_ignore(&self.ignore_tx, name, timeout);
    }

    /// A cloneable handle that registers ignores with a fixed timeout, for
    /// wiring into code that writes watched files.
    pub fn ignore_handle(&self, timeout: Duration) -> IgnoreHandle {
        IgnoreHandle::new(self.ignore_tx.clone(), timeout)
    }

    /// Requests shutdown and returns immediately. The loop re-checks the flag
    /// once per iteration, so worst-case latency is one poll timeout.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Blocks until the watcher thread has exited. Safe to call more than
    /// once; later calls return immediately.
    pub fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Watcher thread for {} panicked", self.dir.display());
            }
        }
    }

    /// False once the thread has exited for any reason: requested stop,
    /// event-source failure, or a panic in the callback.
    pub fn is_running(&self) -> bool {
        match self.thread.lock().as_ref() {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }
}

impl Drop for DirWatcher {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_loop(
    mut source: EventSource,
    mut ignores: IgnoreList,
    quiet_period: Duration,
    poll_timeout: Duration,
    stop: &AtomicBool,
    mut callback: ChangeCallback,
) -> Result<()> {
    let mut pending = PendingOps::new();

    loop {
        let event = source.next_timeout(poll_timeout)?;
        let now = Instant::now();

        // Housekeeping runs on events and ticks alike, so registry staleness
        // stays bounded by one poll interval.
        ignores.apply_pending();
        ignores.prune_expired(now);

        match event {
            None => {
                // Flushes happen only on quiet ticks. checked_sub covers the
                // first ticks of a young process where now < quiet_period.
                if let Some(threshold) = now.checked_sub(quiet_period) {
                    let changes = pending.take_ready(threshold);
                    if !changes.is_empty() {
                        tracing::debug!(
                            "Reporting {} change(s) in {}",
                            changes.len(),
                            source.dir().display()
                        );
                        callback(changes);
                    }
                }
            }
            Some(event) => {
                if !event.name.is_empty() && !ignores.is_ignored(&event.name) {
                    for kind in &event.kinds {
                        pending.record(*kind, &event.name, now);
                    }
                }
            }
        }

        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }
    }
}
