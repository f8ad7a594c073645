use std::time::Duration;

use clap::{Args, Subcommand};
use heatlink_transport::SerialConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod monitor;
pub mod ports;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Send one command batch to a device.
    Send(SendArgs),
    /// Drain and print device reports until stopped.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, serial: SerialConfig) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Send(args) => send::run(args, format, serial),
        Command::Monitor(args) => monitor::run(args, format, serial),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

/// Command understood by the controller.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Reset the controller.
    Reset,
    /// Start temperature control.
    Start,
    /// Stop temperature control.
    Stop,
    /// Set the target temperature in degrees Celsius.
    #[command(allow_negative_numbers = true)]
    Setpoint { celsius: f32 },
    /// Set the PID gains.
    #[command(allow_negative_numbers = true)]
    Pid { p: f32, i: f32, d: f32 },
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial port to open (e.g. /dev/ttyACM0, COM5).
    pub port: String,
    #[command(subcommand)]
    pub command: DeviceCommand,
    /// Wait for the device's Ack/Nack and print it.
    #[arg(long, global = true)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s", global = true)]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Serial port to open.
    pub port: String,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Poll interval (e.g. 50ms, 1s).
    #[arg(long, default_value = "50ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
