//! Message kinds and payload classes.
//!
//! Kind codes are a numbering contract shared with the device firmware and
//! must never be renumbered. Codes 0-62 are usable; 63 is reserved.

use crate::codec::ValueType;

/// Highest kind code a token may carry.
pub const MAX_KIND_CODE: u8 = 62;

/// Kind code that never appears in a token.
pub const RESERVED_KIND_CODE: u8 = 63;

/// Byte sent bare at the end of every flush.
pub const END_MARKER: u8 = Kind::End as u8;

/// Semantic identifier of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    /// Reset the controller (device to host: reset button pressed).
    Reset = 0,
    /// Start temperature control. Answered with Ack/Nack.
    Start = 1,
    /// Stop temperature control. Answered with Ack/Nack.
    Stop = 2,
    Ack = 3,
    Nack = 4,
    /// Temperature setpoint (float). Answered with Ack/Nack.
    SetpointTemp = 5,
    /// Measured temperature (float).
    ActualTemp = 6,
    /// Heater current (float).
    Current = 7,
    PidP = 8,
    PidI = 9,
    PidD = 10,
    /// Status word (int), see [`crate::StatusWord`].
    Status = 11,
    /// End of a batch. Only ever sent as the bare [`END_MARKER`] byte.
    End = 12,
}

impl Kind {
    /// All kinds in code order.
    pub const ALL: [Kind; 13] = [
        Kind::Reset,
        Kind::Start,
        Kind::Stop,
        Kind::Ack,
        Kind::Nack,
        Kind::SetpointTemp,
        Kind::ActualTemp,
        Kind::Current,
        Kind::PidP,
        Kind::PidI,
        Kind::PidD,
        Kind::Status,
        Kind::End,
    ];

    /// Look up a kind by its wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Wire code of this kind.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Reset => "RESET",
            Kind::Start => "START",
            Kind::Stop => "STOP",
            Kind::Ack => "ACK",
            Kind::Nack => "NACK",
            Kind::SetpointTemp => "T_SETPOINT",
            Kind::ActualTemp => "T_ACTUAL",
            Kind::Current => "CURRENT",
            Kind::PidP => "PID_P",
            Kind::PidI => "PID_I",
            Kind::PidD => "PID_D",
            Kind::Status => "STATUS",
            Kind::End => "END",
        }
    }

    /// Payload type the firmware uses for this kind.
    ///
    /// The wire format does not say whether 4 payload bytes are an integer or
    /// a float; this table is the contract. `None` means the kind is a flag.
    pub fn value_type(self) -> Option<ValueType> {
        match self {
            Kind::SetpointTemp
            | Kind::ActualTemp
            | Kind::Current
            | Kind::PidP
            | Kind::PidI
            | Kind::PidD => Some(ValueType::Float),
            Kind::Status => Some(ValueType::Int),
            Kind::Reset | Kind::Start | Kind::Stop | Kind::Ack | Kind::Nack | Kind::End => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload shape declared by a token prefix (bits 7-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Class {
    /// No payload.
    Flag = 0,
    /// Exactly 4 payload bytes.
    Variable = 1,
    /// One length byte followed by that many payload bytes.
    Custom = 2,
}

impl Class {
    /// Look up a class by its 2-bit code. Code 3 is invalid.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Class::Flag),
            1 => Some(Class::Variable),
            2 => Some(Class::Custom),
            _ => None,
        }
    }

    /// 2-bit wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Class::Flag => "flag",
            Class::Variable => "variable",
            Class::Custom => "custom",
        }
    }
}

/// Returns a display name for a raw kind code.
pub fn kind_name(code: u8) -> &'static str {
    match Kind::from_code(code) {
        Some(kind) => kind.name(),
        None if code <= MAX_KIND_CODE => "UNASSIGNED",
        None => "RESERVED",
    }
}
