#[cfg(feature = "serial")]
use heatlink_transport::{EndpointInfo, SerialConfig, SerialTransport, Transport};

#[cfg(feature = "serial")]
use crate::config::SessionConfig;
#[cfg(feature = "serial")]
use crate::error::{Result, SessionError};
#[cfg(feature = "serial")]
use crate::session::Session;

/// Open a serial port and return a connected session with default settings.
#[cfg(feature = "serial")]
pub fn open_serial(endpoint: &str) -> Result<Session<SerialTransport>> {
    open_serial_with_config(endpoint, SerialConfig::default(), SessionConfig::default())
}

/// Open a serial port with explicit link and session settings.
#[cfg(feature = "serial")]
pub fn open_serial_with_config(
    endpoint: &str,
    serial: SerialConfig,
    config: SessionConfig,
) -> Result<Session<SerialTransport>> {
    let mut session = Session::with_config(SerialTransport::with_config(serial), config);
    session.connect(endpoint)?;
    Ok(session)
}

/// Serial ports present on this machine.
#[cfg(feature = "serial")]
pub fn list_serial_ports() -> Result<Vec<EndpointInfo>> {
    SerialTransport::new()
        .endpoints()
        .map_err(SessionError::from)
}
