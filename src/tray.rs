//! System-tray shell: an icon with a single Quit action.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::info;
use tray_icon::{
    menu::{Menu, MenuEvent, MenuItem},
    TrayIconBuilder,
};

use crate::lifecycle::Lifecycle;
use crate::presence::PresenceClient;

const ICON_SIZE: u32 = 64;
const ICON_INSET: u32 = 10;

/// Run the tray event loop on the main thread. Returns an error only while
/// initializing; the caller falls back to the headless variant on failure.
pub fn run<C: PresenceClient + 'static>(controller: Arc<Lifecycle<C>>) -> Result<()> {
    let event_loop = build_event_loop();

    let menu = Menu::new();
    let quit_item = MenuItem::new("Quit", true, None);
    menu.append(&quit_item).context("failed to build tray menu")?;

    let _tray = TrayIconBuilder::new()
        .with_menu(Box::new(menu))
        .with_icon(tray_icon_image()?)
        .with_tooltip("Douyin Presence")
        .build()
        .context("failed to build tray icon")?;

    let menu_channel = MenuEvent::receiver();
    let quit_id = quit_item.id().clone();

    info!("system tray started");

    event_loop.run(move |_event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + Duration::from_millis(500));

        if let Ok(event) = menu_channel.try_recv() {
            if event.id == quit_id {
                info!("quit selected from tray menu");
                controller.shutdown();
                *control_flow = ControlFlow::Exit;
            }
        }
    });
}

#[cfg(target_os = "macos")]
fn build_event_loop() -> EventLoop<()> {
    use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};

    let mut event_loop = EventLoopBuilder::new().build();
    event_loop.set_activation_policy(ActivationPolicy::Accessory);
    event_loop
}

#[cfg(not(target_os = "macos"))]
fn build_event_loop() -> EventLoop<()> {
    EventLoopBuilder::new().build()
}

/// No bundled asset: a solid red field with an inset white rectangle, drawn
/// directly into an RGBA buffer.
fn tray_icon_image() -> Result<tray_icon::Icon> {
    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            let inset = (ICON_INSET..ICON_SIZE - ICON_INSET).contains(&x)
                && (ICON_INSET..ICON_SIZE - ICON_INSET).contains(&y);
            if inset {
                rgba.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                rgba.extend_from_slice(&[255, 0, 0, 255]);
            }
        }
    }
    tray_icon::Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE)
        .context("failed to create tray icon image")
}
