use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::{Class, MAX_KIND_CODE};

/// Payload size of a `Variable` token.
pub const VARIABLE_SIZE: usize = 4;

/// Largest payload a `Custom` token can declare.
pub const MAX_CUSTOM_SIZE: usize = u8::MAX as usize;

const KIND_MASK: u8 = 0b0011_1111;
const CLASS_SHIFT: u8 = 6;

/// Build a prefix byte from a class and a kind code.
///
/// ```text
/// ┌─────────┬──────────────┐
/// │ bit 7-6 │ bit 5-0      │
/// │ class   │ kind code    │
/// └─────────┴──────────────┘
/// ```
pub fn prefix(class: Class, code: u8) -> u8 {
    (class.code() << CLASS_SHIFT) | (code & KIND_MASK)
}

/// Split a prefix byte into its raw class code and kind code.
pub fn split_prefix(prefix: u8) -> (u8, u8) {
    (prefix >> CLASS_SHIFT, prefix & KIND_MASK)
}

/// Whether `byte` can start a token.
pub fn is_plausible_prefix(byte: u8) -> bool {
    let (class, code) = split_prefix(byte);
    Class::from_code(class).is_some() && code <= MAX_KIND_CODE
}

/// Numeric interpretation of 4 payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Little-endian two's-complement `i32`.
    Int,
    /// Little-endian IEEE-754 binary32.
    Float,
}

impl ValueType {
    /// Interpret 4 little-endian bytes.
    pub fn decode(self, raw: [u8; 4]) -> Value {
        match self {
            ValueType::Int => Value::Int(i32::from_le_bytes(raw)),
            ValueType::Float => Value::Float(f32::from_le_bytes(raw)),
        }
    }
}

/// A 32-bit value carried by a `Variable` token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
}

impl Value {
    /// Wire bytes of this value.
    pub fn to_le_bytes(self) -> [u8; 4] {
        match self {
            Value::Int(v) => v.to_le_bytes(),
            Value::Float(v) => v.to_le_bytes(),
        }
    }

    /// Which encoding this value uses.
    pub fn value_type(self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

/// Narrowed to binary32 on the wire.
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v as f32)
    }
}

/// How the caller wants a payload interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// Float for `Variable` payloads, raw bytes for `Custom` payloads.
    #[default]
    Default,
    Int,
    Float,
    /// UTF-8 text, falling back to raw bytes if the payload is not valid UTF-8.
    Text,
    Raw,
}

impl From<ValueType> for Expect {
    fn from(ty: ValueType) -> Self {
        match ty {
            ValueType::Int => Expect::Int,
            ValueType::Float => Expect::Float,
        }
    }
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Int(i32),
    Float(f32),
    Text(String),
    Bytes(Bytes),
}

impl Payload {
    /// Numeric payload as `f32` (integers are converted).
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Payload::Float(v) => Some(*v),
            Payload::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Integer payload.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Payload::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(v) => Payload::Int(v),
            Value::Float(v) => Payload::Float(v),
        }
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Int(v) => write!(f, "{v}"),
            Payload::Float(v) => write!(f, "{v}"),
            Payload::Text(s) => f.write_str(s),
            Payload::Bytes(b) => {
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Wire size of a `Custom` token declaring `declared_size` payload bytes.
pub fn custom_token_len(declared_size: usize) -> usize {
    2 + declared_size
}

fn check_code(code: u8) -> Result<()> {
    if code > MAX_KIND_CODE {
        return Err(FrameError::InvalidKind(code));
    }
    Ok(())
}

/// Encode a `Flag` token.
pub fn encode_flag(code: u8, dst: &mut BytesMut) -> Result<()> {
    check_code(code)?;
    dst.put_u8(prefix(Class::Flag, code));
    Ok(())
}

/// Encode a `Variable` token.
pub fn encode_variable(code: u8, value: Value, dst: &mut BytesMut) -> Result<()> {
    check_code(code)?;
    dst.reserve(1 + VARIABLE_SIZE);
    dst.put_u8(prefix(Class::Variable, code));
    dst.put_slice(&value.to_le_bytes());
    Ok(())
}

/// Encode a `Custom` token.
///
/// `data` is truncated or zero-padded on the right to exactly
/// `declared_size` bytes:
///
/// ```text
/// encode_custom(k, b"AB", 5) => [prefix][05][41][42][00][00][00]
/// ```
pub fn encode_custom(
    code: u8,
    data: &[u8],
    declared_size: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    check_code(code)?;
    if declared_size > MAX_CUSTOM_SIZE {
        return Err(FrameError::CustomTooLarge {
            size: declared_size,
            max: MAX_CUSTOM_SIZE,
        });
    }
    let copied = data.len().min(declared_size);
    dst.reserve(custom_token_len(declared_size));
    dst.put_u8(prefix(Class::Custom, code));
    dst.put_u8(declared_size as u8);
    dst.put_slice(&data[..copied]);
    dst.put_bytes(0, declared_size - copied);
    Ok(())
}

/// Pack a homogeneous list of values into little-endian bytes.
pub fn pack_values(values: &[Value]) -> Result<Vec<u8>> {
    if let Some(first) = values.first() {
        let ty = first.value_type();
        if values.iter().any(|v| v.value_type() != ty) {
            return Err(FrameError::MixedValues);
        }
    }
    Ok(values.iter().flat_map(|v| v.to_le_bytes()).collect())
}
