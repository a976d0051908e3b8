//! Discord Rich Presence client, consumed as a black-box IPC capability.

use anyhow::{anyhow, Result};
use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use tracing::info;

/// Discord application id registered for the Douyin presence app.
pub const DISCORD_CLIENT_ID: &str = "1392452318464573582";

/// Static descriptor of "Douyin is in use", sent verbatim on every rising
/// edge. There is no per-instance variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityPayload {
    pub details: &'static str,
    pub state: &'static str,
    pub large_image: &'static str,
    pub large_text: &'static str,
}

pub const DOUYIN_ACTIVITY: ActivityPayload = ActivityPayload {
    details: "Using Douyin",
    state: "Browsing videos",
    large_image: "douyin",
    large_text: "Douyin Desktop",
};

/// Connected handle to a presence service.
///
/// All three operations are fallible and safe to call repeatedly; callers
/// log failures and retry or swallow them, never propagate.
pub trait PresenceClient: Send {
    fn update(&mut self, payload: &ActivityPayload) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Production client backed by the Discord IPC socket.
pub struct DiscordPresence {
    ipc: DiscordIpcClient,
}

impl DiscordPresence {
    /// Establish the IPC connection. This is the only fatal error path in
    /// the program: there is no useful degraded mode without a client.
    pub fn connect(client_id: &str) -> Result<Self> {
        let mut ipc = DiscordIpcClient::new(client_id).map_err(|err| anyhow!("{err}"))?;
        ipc.connect().map_err(|err| anyhow!("{err}"))?;
        info!(client_id, "Discord RPC connected");
        Ok(Self { ipc })
    }
}

impl PresenceClient for DiscordPresence {
    fn update(&mut self, payload: &ActivityPayload) -> Result<()> {
        let activity = activity::Activity::new()
            .details(payload.details)
            .state(payload.state)
            .assets(
                activity::Assets::new()
                    .large_image(payload.large_image)
                    .large_text(payload.large_text),
            );
        self.ipc
            .set_activity(activity)
            .map_err(|err| anyhow!("{err}"))
    }

    fn clear(&mut self) -> Result<()> {
        self.ipc.clear_activity().map_err(|err| anyhow!("{err}"))
    }

    fn close(&mut self) -> Result<()> {
        self.ipc.close().map_err(|err| anyhow!("{err}"))
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};

    use super::{ActivityPayload, PresenceClient};

    /// One observed client call, in order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Update,
        Clear,
        Close,
    }

    #[derive(Default)]
    struct Inner {
        calls: Vec<Call>,
        failures_remaining: usize,
    }

    /// Call-recording presence double with scriptable failures. Clones share
    /// the same record, so tests keep one handle while the loop owns another.
    #[derive(Clone, Default)]
    pub struct RecordingClient {
        inner: Arc<Mutex<Inner>>,
    }

    impl RecordingClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `count` calls fail after being recorded.
        pub fn fail_next_calls(&self, count: usize) {
            self.inner.lock().unwrap().failures_remaining = count;
        }

        pub fn calls(&self) -> Vec<Call> {
            self.inner.lock().unwrap().calls.clone()
        }

        fn record(&self, call: Call) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(call);
            if inner.failures_remaining > 0 {
                inner.failures_remaining -= 1;
                bail!("scripted {call:?} failure");
            }
            Ok(())
        }
    }

    impl PresenceClient for RecordingClient {
        fn update(&mut self, _payload: &ActivityPayload) -> Result<()> {
            self.record(Call::Update)
        }

        fn clear(&mut self) -> Result<()> {
            self.record(Call::Clear)
        }

        fn close(&mut self) -> Result<()> {
            self.record(Call::Close)
        }
    }
}
