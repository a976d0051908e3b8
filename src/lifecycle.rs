//! Startup and shutdown coordination between the front-end and the sync loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::presence::{ActivityPayload, PresenceClient};
use crate::sync::{lock_client, SharedClient, StateSync};

/// How long shutdown waits for the sync thread to observe cancellation
/// before finalizing the client anyway.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const GRACE_POLL: Duration = Duration::from_millis(50);

/// Cancellation token shared between the controller and the sync loop.
///
/// Set at startup and cleared exactly once at shutdown. `SeqCst` gives the
/// cross-thread visibility the poll loop relies on.
#[derive(Clone)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the presence client handle and the cancellation token, spawns the
/// sync loop, and tears both down exactly once.
pub struct Lifecycle<C: PresenceClient + 'static> {
    client: SharedClient<C>,
    flag: ShutdownFlag,
    worker: Mutex<Option<JoinHandle<()>>>,
    finalized: AtomicBool,
    target: &'static str,
    payload: ActivityPayload,
    poll_interval: Duration,
}

impl<C: PresenceClient + 'static> Lifecycle<C> {
    pub fn new(
        client: Option<C>,
        target: &'static str,
        payload: ActivityPayload,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            flag: ShutdownFlag::new(),
            worker: Mutex::new(None),
            finalized: AtomicBool::new(false),
            target,
            payload,
            poll_interval,
        }
    }

    pub fn flag(&self) -> ShutdownFlag {
        self.flag.clone()
    }

    /// Spawn the sync loop on a background thread and return immediately.
    pub fn start(&self) {
        let sync = StateSync::new(
            Arc::clone(&self.client),
            self.flag.clone(),
            self.target,
            self.payload,
            self.poll_interval,
        );
        let handle = std::thread::spawn(move || sync.run());
        *self.lock_worker() = Some(handle);
    }

    /// Cancel the sync loop, wait briefly for it to stop, then clear and
    /// close the client.
    ///
    /// Idempotent: every trigger path (tray quit, interrupt signal, fatal
    /// startup error) funnels here and only the first call has any effect.
    /// Cleanup never raises; client failures are logged and swallowed.
    pub fn shutdown(&self) {
        if self.finalized.swap(true, Ordering::SeqCst) {
            debug!("shutdown already performed");
            return;
        }

        info!("shutting down");
        self.flag.clear();
        self.wait_for_worker();

        if let Some(mut client) = lock_client(&self.client).take() {
            if let Err(err) = client.clear() {
                warn!(error = %err, "presence clear during shutdown failed");
            }
            if let Err(err) = client.close() {
                warn!(error = %err, "presence close failed");
            }
        }
        info!("shutdown complete");
    }

    /// Best-effort wait: polls the worker up to the grace period and never
    /// hard-joins a thread still inside a client call.
    fn wait_for_worker(&self) {
        let Some(handle) = self.lock_worker().take() else {
            return;
        };

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(GRACE_POLL);
        }

        if handle.is_finished() {
            let _ = handle.join();
        } else {
            warn!("sync loop did not stop within the grace period, finalizing anyway");
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
