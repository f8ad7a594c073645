//! Host-side link to a serial-attached heater controller.
//!
//! heatlink frames commands and telemetry as one-byte-tagged tokens, batches
//! them per flush, and drains device reports from a poll loop.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transport abstraction (serial port, in-memory pair)
//! - [`frame`]: token encoder, incremental decoder, kind table, status word
//! - [`session`]: connection lifecycle and drain loop (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use heatlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use heatlink_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use heatlink_session::*;
}
