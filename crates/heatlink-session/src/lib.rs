//! Device session management for heatlink.
//!
//! A [`Session`] owns one transport and drives the host side of the link:
//! connect, queue commands, flush them as one batch, and drain whatever the
//! device has reported. After each drain the session sends an Ack so the
//! device's watchdog knows the host is alive.
//!
//! The session never blocks waiting for the device. The caller's loop
//! decides when to poll.

pub mod config;
pub mod connector;
pub mod error;
pub mod message;
pub mod session;

pub use config::{SessionConfig, DEFAULT_MAX_BATCH};
#[cfg(feature = "serial")]
pub use connector::{list_serial_ports, open_serial, open_serial_with_config};
pub use error::{Result, SessionError};
pub use message::{Message, Reply};
pub use session::{Session, SessionState};
