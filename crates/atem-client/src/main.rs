//! ATEM client application entry point.
//!
//! Wires together the config file, the UDP transport and the protocol
//! engine, then runs a Tokio loop that ticks the engine and reads operator
//! commands from stdin.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()             -- config.toml or defaults
//!  └─ UdpTransport::connect()   -- socket connected to switcher:9910
//!  └─ AtemConnection::connect() -- send hello
//!  └─ select! loop
//!       ├─ interval tick  -> engine.tick(), then log queued events
//!       ├─ stdin line     -> parse_command() -> execute()
//!       └─ ctrl-c         -> engine.disconnect(), exit
//! ```
//!
//! # Usage
//!
//! ```text
//! atem-client [--config <path>] [--switcher <ip>] [--model <name>]
//! ```

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use atem_client::application::console::{execute, parse_command, ConsoleOutcome};
use atem_client::infrastructure::models::detect_model;
use atem_client::infrastructure::network::{SystemClock, UdpTransport};
use atem_client::infrastructure::storage::config::{default_config_path, load_config};
use atem_core::domain::inputs;
use atem_core::{AtemConnection, AtemEvent, ConnectionState};

struct Args {
    config: Option<PathBuf>,
    switcher: Option<String>,
    model: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config: None,
        switcher: None,
        model: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(iter.next().context("--config needs a path")?.into());
            }
            "--switcher" | "-s" => {
                args.switcher = Some(iter.next().context("--switcher needs an address")?);
            }
            "--model" | "-m" => {
                args.model = Some(iter.next().context("--model needs a name")?);
            }
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(args)
}

fn log_event(event: AtemEvent) {
    match event {
        AtemEvent::ConnectionStateChanged(ConnectionState::Error) => {
            error!("connection lost; type 'reconnect' to retry")
        }
        AtemEvent::ConnectionStateChanged(state) => info!("connection {state}"),
        AtemEvent::ProgramInputChanged(source) => info!("PROGRAM: {}", inputs::label(source)),
        AtemEvent::PreviewInputChanged(source) => info!("PREVIEW: {}", inputs::label(source)),
        AtemEvent::StateChanged => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(address) = args.switcher {
        config.switcher.address = address;
    }
    if let Some(model) = args.model {
        config.switcher.model = Some(model);
    }

    // Initialise structured logging.  RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    info!("ATEM client {} starting", atem_core::VERSION);

    // ── Transport and engine ──────────────────────────────────────────────────
    let switcher = config.switcher_addr()?;
    let transport = UdpTransport::connect(switcher, config.client.local_port).await?;

    let (events_tx, events_rx) = mpsc::channel();
    let mut engine = AtemConnection::new(transport, SystemClock::new(), config.engine)
        .with_event_sink(events_tx);

    if let Some(name) = config.switcher.model.as_deref() {
        match detect_model(name) {
            Some(model) => {
                info!("validating sources against {model}");
                engine = engine.with_source_validator(model.capabilities());
            }
            None => warn!("unknown switcher model {name:?}; source validation disabled"),
        }
    }

    engine.connect()?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(());
        }
    });

    // ── Main loop ─────────────────────────────────────────────────────────────
    let tick = Duration::from_millis(config.client.tick_interval_ms.max(1));
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!("connecting to {switcher}; type 'help' for commands");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.tick();
                for event in events_rx.try_iter() {
                    log_event(event);
                }
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        stdin_open = false;
                        continue;
                    }
                    Err(e) => {
                        warn!("stdin read failed: {e}");
                        stdin_open = false;
                        continue;
                    }
                };
                let command = match parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                match execute(&mut engine, command) {
                    Ok(ConsoleOutcome::Sent(packet_id)) => info!(packet_id, "command sent"),
                    Ok(ConsoleOutcome::Print(text)) => println!("{text}"),
                    Ok(ConsoleOutcome::Reconnecting) => info!("reconnecting"),
                    Ok(ConsoleOutcome::Quit) => break,
                    Err(e) => error!("{e}"),
                }
            }
            _ = &mut shutdown_rx => break,
        }
    }

    engine.disconnect();
    for event in events_rx.try_iter() {
        log_event(event);
    }
    info!("ATEM client stopped");
    Ok(())
}
