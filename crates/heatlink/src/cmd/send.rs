use std::thread;
use std::time::{Duration, Instant};

use heatlink_frame::Kind;
use heatlink_session::{open_serial_with_config, Message, Session, SessionConfig, SessionError};
use heatlink_transport::{SerialConfig, Transport};
use tracing::{debug, info};

use crate::cmd::{parse_duration, DeviceCommand, SendArgs};
use crate::exit::{session_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

const REPLY_POLL: Duration = Duration::from_millis(10);

pub fn run(args: SendArgs, format: OutputFormat, serial: SerialConfig) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let mut session = open_serial_with_config(&args.port, serial, SessionConfig::default())
        .map_err(|err| session_error("connect failed", err))?;

    queue_command(&mut session, &args.command)
        .map_err(|err| session_error("encode failed", err))?;
    let written = session
        .flush()
        .map_err(|err| session_error("send failed", err))?;
    info!(port = %args.port, bytes = written, command = ?args.command, "command sent");

    if !args.wait {
        return Ok(SUCCESS);
    }

    let reply = wait_for_reply(&mut session, args.command.kind(), wait_timeout)
        .map_err(|err| session_error("receive failed", err))?;
    match reply {
        Some(message) => {
            print_message(&message, format);
            match message.reply {
                Some(reply) if reply.accepted => Ok(SUCCESS),
                _ => Err(CliError::new(FAILURE, "device rejected the command")),
            }
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no reply within {wait_timeout:?}"),
        )),
    }
}

impl DeviceCommand {
    /// Kind the device names when it acknowledges this command.
    pub fn kind(&self) -> Kind {
        match self {
            DeviceCommand::Reset => Kind::Reset,
            DeviceCommand::Start => Kind::Start,
            DeviceCommand::Stop => Kind::Stop,
            DeviceCommand::Setpoint { .. } => Kind::SetpointTemp,
            DeviceCommand::Pid { .. } => Kind::PidP,
        }
    }
}

pub(crate) fn queue_command<T: Transport>(
    session: &mut Session<T>,
    command: &DeviceCommand,
) -> Result<(), SessionError> {
    match *command {
        DeviceCommand::Reset => session.append_flag(Kind::Reset),
        DeviceCommand::Start => session.append_flag(Kind::Start),
        DeviceCommand::Stop => session.append_flag(Kind::Stop),
        DeviceCommand::Setpoint { celsius } => session.append_variable(Kind::SetpointTemp, celsius),
        DeviceCommand::Pid { p, i, d } => {
            session.append_variable(Kind::PidP, p)?;
            session.append_variable(Kind::PidI, i)?;
            session.append_variable(Kind::PidD, d)
        }
    }
}

/// Drain until a reply for `expected` (or one naming no command) arrives.
///
/// Every drain sends the watchdog Ack, so the device stays in its
/// host-alive state while we wait.
pub(crate) fn wait_for_reply<T: Transport>(
    session: &mut Session<T>,
    expected: Kind,
    timeout: Duration,
) -> Result<Option<Message>, SessionError> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut found = None;
        session.drain(|message| {
            if found.is_some() {
                return;
            }
            match message.reply {
                Some(reply) if reply.command.is_none_or(|kind| kind == expected) => {
                    found = Some(message.clone());
                }
                _ => debug!(kind = message.descriptor.kind_name(), "skipping report"),
            }
        })?;

        if found.is_some() {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(REPLY_POLL);
    }
}
