//! Mirror Douyin desktop activity to Discord Rich Presence.
//!
//! Polls the OS process table for the Douyin desktop app and mirrors the
//! observation to Discord as a debounced presence transition, hosted by a
//! system-tray icon where available and a headless signal wait otherwise.

mod frontend;
mod lifecycle;
mod presence;
mod probe;
mod sync;
#[cfg(any(target_os = "macos", target_os = "windows"))]
mod tray;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use frontend::Frontend;
use lifecycle::Lifecycle;
use presence::{DiscordPresence, DISCORD_CLIENT_ID, DOUYIN_ACTIVITY};

/// Process-name fragment identifying the Douyin desktop app. Matches both
/// `Douyin.exe` and the suffix-less executable.
const TARGET_PROCESS: &str = "douyin";

#[derive(Parser)]
#[command(name = "douyin-presence")]
#[command(about = "Mirror Douyin desktop activity to Discord Rich Presence")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run with a tray icon, falling back to headless if unavailable
    Tray,
    /// Run without a tray icon, quitting on an interrupt signal
    Headless,
    /// Show whether the target process is currently running
    Status,
    /// Debug: list processes matching the target name
    Debug,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Tray) {
        Commands::Tray => cmd_run(false),
        Commands::Headless => cmd_run(true),
        Commands::Status => cmd_status(),
        Commands::Debug => cmd_debug(),
    }
}

fn cmd_run(force_headless: bool) -> Result<()> {
    init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "douyin-presence starting");

    let client = match DiscordPresence::connect(DISCORD_CLIENT_ID) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "could not connect to Discord RPC");
            return Err(err.context("could not connect to Discord RPC"));
        }
    };

    let controller = Arc::new(Lifecycle::new(
        Some(client),
        TARGET_PROCESS,
        DOUYIN_ACTIVITY,
        sync::POLL_INTERVAL,
    ));
    controller.start();

    // The tray Quit action and an OS interrupt funnel into the same
    // idempotent shutdown.
    let interrupt_controller = Arc::clone(&controller);
    ctrlc::set_handler(move || {
        info!("interrupt received");
        interrupt_controller.shutdown();
        std::process::exit(0);
    })
    .context("failed to install interrupt handler")?;

    let selected = if force_headless {
        Frontend::Headless
    } else {
        frontend::detect()
    };

    match selected {
        Frontend::Tray => run_tray(controller),
        Frontend::Headless => frontend::run_headless(controller),
    }
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn run_tray(controller: Arc<Lifecycle<DiscordPresence>>) -> Result<()> {
    if let Err(err) = tray::run(Arc::clone(&controller)) {
        warn!(error = %err, "tray unavailable, falling back to headless");
        return frontend::run_headless(controller);
    }
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn run_tray(controller: Arc<Lifecycle<DiscordPresence>>) -> Result<()> {
    frontend::run_headless(controller)
}

fn cmd_status() -> Result<()> {
    let running = probe::is_target_running(TARGET_PROCESS);
    println!("douyin-presence v{}", env!("CARGO_PKG_VERSION"));
    println!("Target process: {}", TARGET_PROCESS);
    println!("Currently running: {}", if running { "Yes" } else { "No" });
    Ok(())
}

fn cmd_debug() -> Result<()> {
    println!("Processes matching {:?}:", TARGET_PROCESS);
    for (pid, name) in probe::matching_processes(TARGET_PROCESS) {
        println!("  PID {}: name={:?}", pid, name);
    }
    Ok(())
}

/// Log to a file under the local data dir, falling back to stderr when the
/// directory cannot be created. `DOUYIN_PRESENCE_LOG` or `RUST_LOG` override
/// the `info` default.
fn init_logging() {
    let filter = std::env::var("DOUYIN_PRESENCE_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        });

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("DouyinPresence");

    match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            // Front-ends may exit the process directly, so the writer must
            // not buffer.
            let appender = tracing_appender::rolling::never(&log_dir, "douyin-presence.log");
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(appender)
                .with_ansi(false)
                .init();
        }
        Err(err) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            warn!(error = %err, path = %log_dir.display(), "could not create log directory, logging to stderr");
        }
    }
}
