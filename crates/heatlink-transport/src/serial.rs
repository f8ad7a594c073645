use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{EndpointInfo, Transport};

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line rate in baud. Default: 115200.
    pub baud_rate: u32,
    /// Upper bound for a blocking port operation. Default: 1 s.
    ///
    /// Reads never wait on it in practice: the decoder only asks for bytes
    /// the port already reported as waiting.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Serial port transport backed by the `serialport` crate.
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
    endpoint: Option<String>,
}

impl SerialTransport {
    /// Create a closed serial transport with default settings.
    pub fn new() -> Self {
        Self::with_config(SerialConfig::default())
    }

    /// Create a closed serial transport with explicit settings.
    pub fn with_config(config: SerialConfig) -> Self {
        Self {
            config,
            port: None,
            endpoint: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Endpoint the port is open on.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, endpoint: &str) -> Result<()> {
        self.close();

        let port = serialport::new(endpoint, self.config.baud_rate)
            .timeout(self.config.timeout)
            .open()
            .map_err(|e| TransportError::Open {
                endpoint: endpoint.to_string(),
                source: e.into(),
            })?;

        info!(endpoint, baud = self.config.baud_rate, "serial port opened");
        self.port = Some(port);
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(endpoint = ?self.endpoint, "serial port closed");
        }
        self.endpoint = None;
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn bytes_waiting(&mut self) -> Result<usize> {
        let waiting = self.port()?.bytes_to_read().map_err(std::io::Error::from)?;
        Ok(waiting as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port()?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port()?
            .clear(ClearBuffer::Input)
            .map_err(std::io::Error::from)?;
        Ok(())
    }

    fn clear_output(&mut self) -> Result<()> {
        self.port()?
            .clear(ClearBuffer::Output)
            .map_err(std::io::Error::from)?;
        Ok(())
    }

    fn endpoints(&self) -> Result<Vec<EndpointInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| TransportError::Enumerate(e.into()))?;
        Ok(ports
            .into_iter()
            .map(|port| {
                let (description, hardware_id) = describe(&port.port_type);
                EndpointInfo {
                    name: port.port_name,
                    description,
                    hardware_id,
                }
            })
            .collect())
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn describe(port_type: &SerialPortType) -> (String, String) {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let description = usb
                .product
                .clone()
                .or_else(|| usb.manufacturer.clone())
                .unwrap_or_else(|| "USB serial".to_string());
            let mut hardware_id = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
            if let Some(serial) = &usb.serial_number {
                hardware_id.push_str(" SER=");
                hardware_id.push_str(serial);
            }
            (description, hardware_id)
        }
        SerialPortType::PciPort => ("PCI serial".to_string(), "PCI".to_string()),
        SerialPortType::BluetoothPort => ("Bluetooth serial".to_string(), "BT".to_string()),
        SerialPortType::Unknown => (String::new(), String::new()),
    }
}
