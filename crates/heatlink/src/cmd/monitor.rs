use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use heatlink_frame::StatusWord;
use heatlink_session::{open_serial_with_config, Message, Session, SessionConfig, SessionError};
use heatlink_transport::{SerialConfig, Transport};
use tracing::{info, warn};

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat, serial: SerialConfig) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let mut session = open_serial_with_config(&args.port, serial, SessionConfig::default())
        .map_err(|err| session_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let printed = monitor_loop(&mut session, args.count, interval, &running, |message| {
        print_message(message, format)
    })
    .map_err(|err| session_error("monitor failed", err))?;

    info!(port = %args.port, printed, "monitor stopped");
    session.disconnect();
    Ok(SUCCESS)
}

/// Drain the session every `interval` until `running` clears or `limit`
/// messages were emitted. Returns the number emitted.
pub(crate) fn monitor_loop<T, F>(
    session: &mut Session<T>,
    limit: Option<usize>,
    interval: Duration,
    running: &AtomicBool,
    mut emit: F,
) -> Result<usize, SessionError>
where
    T: Transport,
    F: FnMut(&Message),
{
    let mut printed = 0usize;
    let mut last_status: Option<StatusWord> = None;

    while running.load(Ordering::SeqCst) {
        if !session.is_connected() {
            return Err(SessionError::NotConnected);
        }
        session.drain(|message| {
            if let Some(status) = message.status() {
                track_status(&mut last_status, status);
            }
            if limit.is_none_or(|n| printed < n) {
                emit(message);
                printed += 1;
            }
        })?;

        if limit.is_some_and(|n| printed >= n) {
            break;
        }
        thread::sleep(interval);
    }

    Ok(printed)
}

fn track_status(last: &mut Option<StatusWord>, status: StatusWord) {
    let previous = last.unwrap_or_default();
    let changed = status.changed(previous);
    if last.is_none() || !changed.is_empty() {
        if status.has_fault() {
            warn!(status = ?status, "device reports a fault");
        } else {
            info!(status = ?status, changed = ?changed, "device status changed");
        }
    }
    *last = Some(status);
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
