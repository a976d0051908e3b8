//! Front-end selection and the headless variant.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::lifecycle::Lifecycle;
use crate::presence::PresenceClient;

const IDLE_TICK: Duration = Duration::from_secs(1);

/// Which shell hosts the sync loop. Decided once at startup; the two are
/// functionally identical from the sync loop's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontend {
    Tray,
    Headless,
}

/// Capability probe: a tray is only offered on the desktop platforms Douyin
/// ships on. Anywhere else the headless variant hosts the loop.
pub fn detect() -> Frontend {
    if tray_capable() {
        Frontend::Tray
    } else {
        Frontend::Headless
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn tray_capable() -> bool {
    true
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn tray_capable() -> bool {
    false
}

/// Park the main thread until the running flag clears, then run the shutdown
/// path. The interrupt handler installed at startup normally exits the
/// process first; this covers any other path that clears the flag.
pub fn run_headless<C: PresenceClient + 'static>(controller: Arc<Lifecycle<C>>) -> Result<()> {
    info!("running headless, send an interrupt to quit");
    let flag = controller.flag();
    while flag.is_running() {
        std::thread::sleep(IDLE_TICK);
    }
    controller.shutdown();
    Ok(())
}
