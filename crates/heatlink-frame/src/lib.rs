//! One-byte-tagged token framing for host/microcontroller serial links.
//!
//! Every message is a token introduced by a prefix byte:
//! - bits 7-6: payload class (`Flag`, `Variable`, `Custom`)
//! - bits 5-0: kind code
//!
//! The encoder batches tokens into a bounded transmit buffer and sends the
//! batch with a trailing end marker in one write. The decoder reassembles
//! tokens from whatever the link delivers, one header per call.

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod kind;
pub mod status;

pub use codec::{
    prefix, split_prefix, Expect, Payload, Value, ValueType, MAX_CUSTOM_SIZE, VARIABLE_SIZE,
};
pub use decoder::{Descriptor, FrameDecoder, Lookahead, DEFAULT_STALL_LIMIT};
pub use encoder::{ClearPolicy, EncoderConfig, FrameEncoder, DEFAULT_CAPACITY};
pub use error::{FrameError, Result};
pub use kind::{kind_name, Class, Kind, END_MARKER, MAX_KIND_CODE, RESERVED_KIND_CODE};
pub use status::StatusWord;
