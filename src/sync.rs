//! Debounced synchronization between process state and the presence service.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::lifecycle::ShutdownFlag;
use crate::presence::{ActivityPayload, PresenceClient};
use crate::probe;

/// How often the process table is polled.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity at which the poll sleep re-checks the shutdown flag.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared slot for the presence client handle. The lifecycle controller owns
/// connect and finalization; the sync loop drives update/clear in between.
/// `None` once finalized, so a late call from the loop is a no-op.
pub type SharedClient<C> = Arc<Mutex<Option<C>>>;

/// A poisoned lock still yields a usable guard; shutdown and retry paths
/// must keep working after a panicked holder.
pub(crate) fn lock_client<C>(client: &SharedClient<C>) -> MutexGuard<'_, Option<C>> {
    match client.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Polls the process table on a fixed interval and mirrors edges in the
/// observed state to the presence client.
pub struct StateSync<C: PresenceClient> {
    client: SharedClient<C>,
    running: ShutdownFlag,
    target: &'static str,
    payload: ActivityPayload,
    poll_interval: Duration,
    /// Last acted-upon observation. Starts false: the first cycle is a
    /// baseline, and only a real rising edge triggers an update.
    is_target_running: bool,
}

impl<C: PresenceClient> StateSync<C> {
    pub fn new(
        client: SharedClient<C>,
        running: ShutdownFlag,
        target: &'static str,
        payload: ActivityPayload,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            running,
            target,
            payload,
            poll_interval,
            is_target_running: false,
        }
    }

    /// Poll until the shutdown flag clears. Nothing that happens inside a
    /// cycle terminates the loop.
    pub fn run(mut self) {
        info!(process = self.target, "presence sync loop started");
        while self.running.is_running() {
            let observed = probe::is_target_running(self.target);
            self.tick(observed);
            self.sleep_interruptibly();
        }
        debug!("presence sync loop observed shutdown");
    }

    /// One debounce cycle: act only when the fresh observation differs from
    /// the recorded state. A failed client call leaves the recorded state
    /// unchanged so the same transition is retried next cycle.
    fn tick(&mut self, observed: bool) {
        if observed == self.is_target_running {
            return;
        }

        let mut slot = lock_client(&self.client);
        let Some(client) = slot.as_mut() else {
            // Finalization already took the handle; the cleared flag stops
            // the loop on its next check.
            return;
        };

        if observed {
            match client.update(&self.payload) {
                Ok(()) => {
                    info!(process = self.target, "target detected, presence set");
                    self.is_target_running = true;
                }
                Err(err) => warn!(error = %err, "presence update failed, will retry"),
            }
        } else {
            match client.clear() {
                Ok(()) => {
                    info!(process = self.target, "target gone, presence cleared");
                    self.is_target_running = false;
                }
                Err(err) => warn!(error = %err, "presence clear failed, will retry"),
            }
        }
    }

    /// Sleep one poll interval in short slices, waking early once the
    /// shutdown flag clears.
    fn sleep_interruptibly(&self) {
        let mut remaining = self.poll_interval;
        while !remaining.is_zero() && self.running.is_running() {
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining -= slice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::testing::{Call, RecordingClient};
    use crate::presence::DOUYIN_ACTIVITY;

    fn sync_for(client: RecordingClient) -> StateSync<RecordingClient> {
        StateSync::new(
            Arc::new(Mutex::new(Some(client))),
            ShutdownFlag::new(),
            "douyin",
            DOUYIN_ACTIVITY,
            Duration::from_millis(10),
        )
    }

    fn drive(sync: &mut StateSync<RecordingClient>, observations: &[bool]) {
        for &observed in observations {
            sync.tick(observed);
        }
    }

    #[test]
    fn test_single_rising_and_falling_edge() {
        let client = RecordingClient::new();
        let mut sync = sync_for(client.clone());
        drive(&mut sync, &[false, false, true, true, false]);
        assert_eq!(client.calls(), vec![Call::Update, Call::Clear]);
    }

    #[test]
    fn test_stable_run_updates_once() {
        let client = RecordingClient::new();
        let mut sync = sync_for(client.clone());
        drive(&mut sync, &[true, true, true]);
        assert_eq!(client.calls(), vec![Call::Update]);
    }

    #[test]
    fn test_no_update_before_first_true() {
        let client = RecordingClient::new();
        let mut sync = sync_for(client.clone());
        drive(&mut sync, &[false, false, false, false]);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_failed_update_is_retried_next_cycle() {
        let client = RecordingClient::new();
        let mut sync = sync_for(client.clone());
        client.fail_next_calls(1);

        sync.tick(true);
        assert!(!sync.is_target_running);

        sync.tick(true);
        assert!(sync.is_target_running);
        assert_eq!(client.calls(), vec![Call::Update, Call::Update]);
    }

    #[test]
    fn test_failed_clear_is_retried_next_cycle() {
        let client = RecordingClient::new();
        let mut sync = sync_for(client.clone());
        drive(&mut sync, &[true]);
        client.fail_next_calls(1);

        sync.tick(false);
        assert!(sync.is_target_running);

        sync.tick(false);
        assert!(!sync.is_target_running);
        assert_eq!(client.calls(), vec![Call::Update, Call::Clear, Call::Clear]);
    }

    #[test]
    fn test_long_sequence_debounces_every_run() {
        let client = RecordingClient::new();
        let mut sync = sync_for(client.clone());
        drive(
            &mut sync,
            &[false, true, true, false, false, true, false, true, true],
        );
        assert_eq!(
            client.calls(),
            vec![
                Call::Update,
                Call::Clear,
                Call::Update,
                Call::Clear,
                Call::Update,
            ]
        );
    }

    #[test]
    fn test_finalized_handle_is_a_noop() {
        let mut sync: StateSync<RecordingClient> = StateSync::new(
            Arc::new(Mutex::new(None)),
            ShutdownFlag::new(),
            "douyin",
            DOUYIN_ACTIVITY,
            Duration::from_millis(10),
        );
        sync.tick(true);
        assert!(!sync.is_target_running);
    }

    #[test]
    fn test_run_exits_when_flag_already_cleared() {
        let client = RecordingClient::new();
        let flag = ShutdownFlag::new();
        flag.clear();
        let sync = StateSync::new(
            Arc::new(Mutex::new(Some(client.clone()))),
            flag,
            "douyin",
            DOUYIN_ACTIVITY,
            Duration::from_millis(10),
        );
        sync.run();
        assert!(client.calls().is_empty());
    }
}
