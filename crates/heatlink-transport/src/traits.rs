use crate::error::Result;

/// A discoverable endpoint (e.g. a serial device node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Identifier passed to [`Transport::open`] (`/dev/ttyACM0`, `COM5`, ...).
    pub name: String,
    /// Human-readable description, empty when the platform reports none.
    pub description: String,
    /// Hardware identifier (USB VID:PID and serial, bus type), empty if unknown.
    pub hardware_id: String,
}

impl EndpointInfo {
    /// Create endpoint info with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            hardware_id: String::new(),
        }
    }
}

/// A duplex byte link to a remote device.
///
/// Every call must return promptly: `read` hands back whatever is available
/// now (possibly nothing) and callers treat every read as potentially short.
/// `write` either delivers the whole buffer or fails.
pub trait Transport {
    /// Open the link on `endpoint`. Opening an already open link reopens it.
    fn open(&mut self, endpoint: &str) -> Result<()>;

    /// Close the link. Closing a closed link is a no-op.
    fn close(&mut self);

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;

    /// Number of received bytes that can be read without waiting.
    fn bytes_waiting(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` bytes that are available now.
    ///
    /// Returns `Ok(0)` when nothing is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `data` as a single unit.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Discard everything received but not yet read.
    fn clear_input(&mut self) -> Result<()>;

    /// Discard everything queued for sending but not yet sent.
    fn clear_output(&mut self) -> Result<()>;

    /// List the endpoints this transport can open.
    fn endpoints(&self) -> Result<Vec<EndpointInfo>>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, endpoint: &str) -> Result<()> {
        (**self).open(endpoint)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn bytes_waiting(&mut self) -> Result<usize> {
        (**self).bytes_waiting()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }

    fn clear_output(&mut self) -> Result<()> {
        (**self).clear_output()
    }

    fn endpoints(&self) -> Result<Vec<EndpointInfo>> {
        (**self).endpoints()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}
