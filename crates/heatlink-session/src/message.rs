use heatlink_frame::{Descriptor, Kind, Payload, StatusWord};

/// Device answer to a command: Ack or Nack followed by the command's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Ack (`true`) or Nack (`false`).
    pub accepted: bool,
    /// The acknowledged command, `None` if the device did not name one.
    pub command: Option<Kind>,
}

/// One message handed out by [`crate::Session::drain`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub descriptor: Descriptor,
    /// Payload decoded with the kind's table type, if the token carries one.
    pub payload: Option<Payload>,
    /// Set for Ack/Nack messages.
    pub reply: Option<Reply>,
}

impl Message {
    pub fn kind(&self) -> Option<Kind> {
        self.descriptor.kind()
    }

    /// Numeric payload as `f32`.
    pub fn value(&self) -> Option<f32> {
        self.payload.as_ref().and_then(Payload::as_f32)
    }

    /// Status word, for `Status` messages.
    pub fn status(&self) -> Option<StatusWord> {
        if self.kind() != Some(Kind::Status) {
            return None;
        }
        self.payload
            .as_ref()
            .and_then(Payload::as_i32)
            .map(StatusWord::from_payload)
    }
}
