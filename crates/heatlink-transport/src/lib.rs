//! Byte-stream transport abstraction for heatlink.
//!
//! The protocol layers above only ever see the [`Transport`] trait: a duplex
//! byte link that can report how many bytes are waiting, read whatever is
//! available right now, and write a complete buffer. Implementations:
//! - [`MemoryTransport`]: in-process loopback pair (tests, demos, simulators)
//! - [`SerialTransport`]: serial port backed by `serialport` (behind `serial` feature)
//!
//! This is the lowest layer of heatlink. Nothing here knows about tokens.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::{EndpointInfo, Transport};

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialTransport};
