//! `kocom` - run the wallpad gateway from the command line.

use clap::{Parser, Subcommand};
use kocom_common::{DeviceKey, DeviceType, Value};
use kocom_gateway::{Gateway, GatewayConfig, GatewayEvent};
use kocom_protocol::ActionArgs;
use kocom_runner::{parse_arg, RunnerError, RunnerResult, Snapshot};
use kocom_transport::{Endpoint, DEFAULT_BAUD_RATE, DEFAULT_TCP_PORT};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kocom", version, about = "Kocom RS-485 wallpad bus gateway")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RS-485 bridge host (overrides the configured endpoint)
    #[arg(long, conflicts_with = "serial")]
    host: Option<String>,

    /// RS-485 bridge port
    #[arg(long, requires = "host")]
    port: Option<u16>,

    /// Serial device path (overrides the configured endpoint)
    #[arg(long)]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, requires = "serial")]
    baud: Option<u32>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Snapshot file loaded at start and saved on exit
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log device events until Ctrl-C
    Monitor,
    /// Send one action and wait for confirmation
    Send {
        /// Device type, e.g. light, thermostat, airconditioner
        device_type: DeviceType,
        room: u8,
        /// Channel within the room (0 for single devices)
        index: u8,
        /// Action, e.g. turn_on, set_temperature, query
        action: String,
        /// Action argument as key=value (repeatable)
        #[arg(long = "arg", value_parser = parse_cli_arg)]
        args: Vec<(String, Value)>,
    },
    /// Query the discovery targets and list what answered
    Sweep,
}

fn parse_cli_arg(text: &str) -> Result<(String, Value), String> {
    parse_arg(text).map_err(|e| e.to_string())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> RunnerResult<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.endpoint = Endpoint::Tcp {
            host: host.clone(),
            port: cli.port.unwrap_or(DEFAULT_TCP_PORT),
        };
    } else if let Some(path) = &cli.serial {
        config.endpoint = Endpoint::Serial {
            path: path.clone(),
            baud: cli.baud.unwrap_or(DEFAULT_BAUD_RATE),
        };
    }
    config.validate()?;
    Ok(config)
}

async fn monitor(gateway: &Gateway) {
    let mut events = gateway.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(GatewayEvent::NewDevice(state)) => {
                    info!(key = %state.key, platform = %state.platform, value = %state.value, "new device");
                }
                Ok(GatewayEvent::DeviceUpdated(state)) => {
                    info!(key = %state.key, value = %state.value, "updated");
                }
                Err(RecvError::Lagged(missed)) => warn!(missed, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

async fn sweep(gateway: &Gateway) {
    let answered = gateway.sweep().await;
    println!("{} of {} targets answered", answered, gateway.config().discovery.targets().len());
    for state in gateway.all_states() {
        println!(
            "{:<12} {:<14} {:<8} {}",
            state.key.unique_id(),
            state.key.format_key(),
            state.platform,
            state.value
        );
    }
}

async fn run(cli: Cli) -> RunnerResult<()> {
    let config = load_config(&cli)?;
    let snapshot = match &cli.snapshot {
        Some(path) => Snapshot::load(path)?,
        None => Snapshot::default(),
    };

    kocom_metrics::describe_metrics();
    let gateway = Gateway::from_config(config).await?;
    if !snapshot.is_empty() {
        snapshot.restore(&gateway);
    }

    let result = match cli.command {
        Command::Monitor => {
            monitor(&gateway).await;
            Ok(())
        }
        Command::Send {
            device_type,
            room,
            index,
            action,
            args,
        } => {
            let key = DeviceKey::primary(device_type, room, index);
            let args: ActionArgs = args.into_iter().collect();
            if gateway.submit_action(key, &action, args).await {
                println!("{} {}: confirmed", key, action);
                Ok(())
            } else {
                Err(RunnerError::NotConfirmed)
            }
        }
        Command::Sweep => {
            sweep(&gateway).await;
            Ok(())
        }
    };

    if let Some(path) = &cli.snapshot {
        Snapshot::capture(&gateway).save(path)?;
        info!(path = %path.display(), "snapshot saved");
    }
    gateway.stop().await;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "kocom failed");
            ExitCode::FAILURE
        }
    }
}
