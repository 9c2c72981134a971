//! Audio Link Daemon
//!
//! Runs the audio link against a virtual peripheral and serves its property
//! and control surfaces on a line-oriented console (stdin/stdout).

mod console;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use audio_link::{
    link_channels, run_notification_pump, AudioLink, NullAmpDriver, NullChimePlayer,
    StartupWorker,
};
use audio_sim::{run_virtual_peripheral_task, FlakyTransport, VirtualPeripheral};
use console::{Console, ConsoleCommand, Reply};
use settings::Settings;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting audiolinkd");
    match Settings::settings_path() {
        Some(path) if path.exists() => info!("Settings: {}", path.display()),
        Some(path) => match settings.save() {
            Ok(()) => info!("Wrote default settings to {}", path.display()),
            Err(e) => warn!("{}", e),
        },
        None => warn!("Could not determine settings path, using defaults"),
    }

    let shutdown = CancellationToken::new();

    // Link and virtual peripheral
    let (transport, notification_rx, ends) = link_channels(settings.link.channel_capacity);
    let transport = FlakyTransport::new(transport, settings.peripheral.boot_failures as usize);
    let link = Arc::new(AudioLink::with_config(
        transport,
        Arc::new(NullChimePlayer),
        settings.link.clone(),
    ));

    let (peripheral_tx, peripheral_rx) = mpsc::channel(8);
    let peripheral = tokio::spawn(run_virtual_peripheral_task(
        VirtualPeripheral::new(settings.peripheral.initial.clone()),
        ends,
        peripheral_rx,
        Duration::from_millis(settings.peripheral.reply_delay_ms),
        shutdown.clone(),
    ));
    let pump = tokio::spawn(run_notification_pump(
        link.clone(),
        notification_rx,
        shutdown.clone(),
    ));

    let worker = Arc::new(StartupWorker::new(link.clone(), Arc::new(NullAmpDriver)));
    let worker_task = worker.spawn(shutdown.clone());

    let console = Console::new(link, peripheral_tx);
    let result = run_console(&console).await;

    shutdown.cancel();
    for (name, task) in [("peripheral", peripheral), ("pump", pump), ("worker", worker_task)] {
        if let Err(e) = task.await {
            error!("{} task failed: {}", name, e);
        }
    }

    info!("Shutdown complete");
    result
}

/// Read commands from stdin until `quit`, end of input or Ctrl-C
async fn run_console(console: &Console) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(e) => {
                stdout.write_all(format!("error: {}\n", e).as_bytes()).await?;
                continue;
            }
        };

        // Ctrl-C while a command runs interrupts it instead of exiting
        let interrupt = CancellationToken::new();
        let execution = console.execute(command, &interrupt);
        tokio::pin!(execution);
        let result = loop {
            tokio::select! {
                result = &mut execution => break result,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupting in-flight command");
                    interrupt.cancel();
                }
            }
        };

        match result {
            Ok(Reply::Output(text)) => stdout.write_all(text.as_bytes()).await?,
            Ok(Reply::Quit) => return Ok(()),
            Err(e) => {
                stdout.write_all(format!("error: {}\n", e).as_bytes()).await?;
            }
        }
    }
}
