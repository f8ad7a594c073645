use bytes::{BufMut, BytesMut};
use heatlink_transport::Transport;
use tracing::{debug, warn};

use crate::codec::{
    custom_token_len, encode_custom, encode_flag, encode_variable, pack_values, Value,
    MAX_CUSTOM_SIZE, VARIABLE_SIZE,
};
use crate::error::{FrameError, Result};
use crate::kind::{Kind, END_MARKER};

/// Default transmit buffer capacity, matching the device's receive buffer.
pub const DEFAULT_CAPACITY: usize = 128;

/// When a flush empties the transmit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearPolicy {
    /// Clear whether or not the write succeeds. A failed batch is dropped.
    #[default]
    BeforeWrite,
    /// Clear only after the transport accepted the batch. A failed batch
    /// stays queued and the next flush retries it.
    AfterWrite,
}

/// Configuration for the frame encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Total buffer size in bytes, including the byte reserved for the end
    /// marker. Default: 128.
    pub capacity: usize,
    /// Flush clearing policy. Default: [`ClearPolicy::BeforeWrite`].
    pub clear_policy: ClearPolicy,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            clear_policy: ClearPolicy::default(),
        }
    }
}

/// Accumulates tokens into a bounded transmit buffer and sends them as one batch.
///
/// A token is appended completely or not at all: one byte of capacity is
/// always held back for the end marker that [`FrameEncoder::flush`] adds.
#[derive(Debug)]
pub struct FrameEncoder {
    buf: BytesMut,
    config: EncoderConfig,
}

impl FrameEncoder {
    /// Create an encoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(EncoderConfig::default())
    }

    /// Create an encoder with explicit configuration.
    pub fn with_config(config: EncoderConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.capacity),
            config,
        }
    }

    /// Append a `Flag` token (1 byte).
    pub fn append_flag(&mut self, kind: Kind) -> Result<()> {
        check_not_end(kind)?;
        self.append(1, |dst| encode_flag(kind.code(), dst))
    }

    /// Append a `Variable` token (5 bytes).
    ///
    /// Integers are sent as `i32`, floats as `f32`.
    pub fn append_variable(&mut self, kind: Kind, value: impl Into<Value>) -> Result<()> {
        check_not_end(kind)?;
        let value = value.into();
        self.append(1 + VARIABLE_SIZE, |dst| {
            encode_variable(kind.code(), value, dst)
        })
    }

    /// Append a `Custom` token (`2 + declared_size` bytes).
    ///
    /// `data` is truncated or zero-padded to exactly `declared_size` bytes.
    pub fn append_custom(&mut self, kind: Kind, data: &[u8], declared_size: usize) -> Result<()> {
        check_not_end(kind)?;
        if declared_size > MAX_CUSTOM_SIZE {
            return Err(FrameError::CustomTooLarge {
                size: declared_size,
                max: MAX_CUSTOM_SIZE,
            });
        }
        self.append(custom_token_len(declared_size), |dst| {
            encode_custom(kind.code(), data, declared_size, dst)
        })
    }

    /// Append UTF-8 text as a `Custom` token sized to the text.
    pub fn append_custom_text(&mut self, kind: Kind, text: &str) -> Result<()> {
        self.append_custom(kind, text.as_bytes(), text.len())
    }

    /// Append a list of ints or a list of floats as a packed `Custom` token.
    pub fn append_custom_values(&mut self, kind: Kind, values: &[Value]) -> Result<()> {
        let packed = pack_values(values)?;
        self.append_custom(kind, &packed, packed.len())
    }

    fn append(
        &mut self,
        needed: usize,
        encode: impl FnOnce(&mut BytesMut) -> Result<()>,
    ) -> Result<()> {
        let available = self.available();
        if needed > available {
            debug!(needed, available, "token rejected, transmit buffer full");
            return Err(FrameError::BufferFull { needed, available });
        }
        encode(&mut self.buf)
    }

    /// Send all queued tokens followed by the end marker in one write.
    ///
    /// Returns the number of bytes written; an empty buffer writes nothing
    /// and returns 0.
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize> {
        if self.buf.is_empty() {
            return Ok(0);
        }

        self.buf.put_u8(END_MARKER);
        let len = self.buf.len();
        let result = transport.write(&self.buf);

        match (result, self.config.clear_policy) {
            (Ok(()), _) => {
                debug!(bytes = len, "transmit buffer flushed");
                self.buf.clear();
                Ok(len)
            }
            (Err(err), ClearPolicy::BeforeWrite) => {
                warn!(bytes = len, error = %err, "flush failed, batch dropped");
                self.buf.clear();
                Err(err.into())
            }
            (Err(err), ClearPolicy::AfterWrite) => {
                warn!(bytes = len, error = %err, "flush failed, batch kept");
                self.buf.truncate(len - 1);
                Err(err.into())
            }
        }
    }

    /// Bytes a new token may still use.
    pub fn available(&self) -> usize {
        self.config.capacity.saturating_sub(self.buf.len() + 1)
    }

    /// Bytes queued (without the end marker).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no token is queued.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Queued token bytes.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Drop all queued tokens.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Current encoder configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Change the flush clearing policy for subsequent flushes.
    pub fn set_clear_policy(&mut self, policy: ClearPolicy) {
        self.config.clear_policy = policy;
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_not_end(kind: Kind) -> Result<()> {
    if kind == Kind::End {
        return Err(FrameError::ReservedKind(kind.code()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use heatlink_transport::{EndpointInfo, MemoryTransport, TransportError};

    use super::*;

    fn open_pair() -> (MemoryTransport, MemoryTransport) {
        let (mut host, mut device) = MemoryTransport::pair();
        host.open("mem").unwrap();
        device.open("mem").unwrap();
        (host, device)
    }

    fn drain(device: &mut MemoryTransport) -> Vec<u8> {
        let mut buf = vec![0u8; 512];
        let n = device.read(&mut buf).unwrap();
        buf.truncate(n);
        buf
    }

    #[test]
    fn start_and_pid_batch_is_nine_bytes() {
        let (mut host, mut device) = open_pair();
        let mut encoder = FrameEncoder::new();

        encoder.append_flag(Kind::Start).unwrap();
        encoder.append_variable(Kind::PidP, 0.1).unwrap();
        let written = encoder.flush(&mut host).unwrap();

        let mut expected = vec![0x01, 0x48];
        expected.extend_from_slice(&0.1f32.to_le_bytes());
        expected.push(END_MARKER);

        assert_eq!(written, 9);
        assert_eq!(drain(&mut device), expected);
        assert_eq!(host.write_count(), 1);
        assert!(encoder.is_empty());
    }

    #[test]
    fn flush_empty_is_noop() {
        let (mut host, _device) = open_pair();
        let mut encoder = FrameEncoder::new();

        assert_eq!(encoder.flush(&mut host).unwrap(), 0);
        assert_eq!(host.write_count(), 0);
    }

    #[test]
    fn fill_to_capacity_minus_one_then_reject() {
        let mut encoder = FrameEncoder::new();
        for _ in 0..DEFAULT_CAPACITY - 1 {
            encoder.append_flag(Kind::Reset).unwrap();
        }
        assert_eq!(encoder.len(), DEFAULT_CAPACITY - 1);
        let before = encoder.pending().to_vec();

        let err = encoder.append_custom(Kind::Status, &[], 0).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferFull {
                needed: 2,
                available: 0
            }
        ));
        assert!(err.is_capacity());
        assert_eq!(encoder.pending(), before.as_slice());
    }

    #[test]
    fn oversize_token_leaves_buffer_unchanged() {
        let mut encoder = FrameEncoder::with_config(EncoderConfig {
            capacity: 8,
            ..EncoderConfig::default()
        });
        encoder.append_variable(Kind::PidI, 1.5f32).unwrap();
        assert_eq!(encoder.available(), 2);

        let err = encoder.append_variable(Kind::PidD, 2.5f32).unwrap_err();
        assert!(matches!(err, FrameError::BufferFull { needed: 5, available: 2 }));
        assert_eq!(encoder.len(), 5);

        encoder.append_flag(Kind::Stop).unwrap();
        encoder.append_flag(Kind::Stop).unwrap();
        assert_eq!(encoder.available(), 0);
    }

    #[test]
    fn custom_padding_and_limits() {
        let mut encoder = FrameEncoder::new();
        encoder.append_custom(Kind::Status, b"AB", 5).unwrap();
        assert_eq!(encoder.pending(), &[0x8B, 5, b'A', b'B', 0, 0, 0]);

        let err = encoder.append_custom(Kind::Status, b"", 300).unwrap_err();
        assert!(matches!(err, FrameError::CustomTooLarge { .. }));
        assert_eq!(encoder.len(), 7);
    }

    #[test]
    fn custom_text_and_values() {
        let mut encoder = FrameEncoder::new();
        encoder.append_custom_text(Kind::Reset, "hi").unwrap();
        encoder
            .append_custom_values(Kind::PidP, &[Value::Int(1), Value::Int(-1)])
            .unwrap();
        assert_eq!(
            encoder.pending(),
            &[0x80, 2, b'h', b'i', 0x88, 8, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]
        );

        let err = encoder
            .append_custom_values(Kind::PidP, &[Value::Int(1), Value::Float(1.0)])
            .unwrap_err();
        assert!(matches!(err, FrameError::MixedValues));
    }

    #[test]
    fn end_kind_is_reserved() {
        let mut encoder = FrameEncoder::new();
        assert!(matches!(
            encoder.append_flag(Kind::End),
            Err(FrameError::ReservedKind(12))
        ));
        assert!(matches!(
            encoder.append_variable(Kind::End, 1),
            Err(FrameError::ReservedKind(12))
        ));
        assert!(encoder.is_empty());
    }

    #[test]
    fn tokens_keep_append_order() {
        let (mut host, mut device) = open_pair();
        let mut encoder = FrameEncoder::new();
        encoder.append_flag(Kind::Stop).unwrap();
        encoder.append_flag(Kind::Reset).unwrap();
        encoder.append_flag(Kind::Ack).unwrap();
        encoder.flush(&mut host).unwrap();
        assert_eq!(drain(&mut device), vec![0x02, 0x00, 0x03, END_MARKER]);
    }

    #[test]
    fn failed_flush_clears_by_default() {
        let mut encoder = FrameEncoder::new();
        encoder.append_flag(Kind::Start).unwrap();

        let err = encoder.flush(&mut FailingTransport).unwrap_err();
        assert!(matches!(err, FrameError::Transport(_)));
        assert!(encoder.is_empty());
    }

    #[test]
    fn failed_flush_keeps_batch_with_after_write_policy() {
        let mut encoder = FrameEncoder::with_config(EncoderConfig {
            clear_policy: ClearPolicy::AfterWrite,
            ..EncoderConfig::default()
        });
        encoder.append_flag(Kind::Start).unwrap();

        assert!(encoder.flush(&mut FailingTransport).is_err());
        assert_eq!(encoder.pending(), &[0x01]);

        let (mut host, mut device) = open_pair();
        encoder.flush(&mut host).unwrap();
        assert_eq!(drain(&mut device), vec![0x01, END_MARKER]);
        assert!(encoder.is_empty());
    }

    struct FailingTransport;

    impl Transport for FailingTransport {
        fn open(&mut self, _endpoint: &str) -> heatlink_transport::Result<()> {
            Ok(())
        }

        fn close(&mut self) {}

        fn is_open(&self) -> bool {
            true
        }

        fn bytes_waiting(&mut self) -> heatlink_transport::Result<usize> {
            Ok(0)
        }

        fn read(&mut self, _buf: &mut [u8]) -> heatlink_transport::Result<usize> {
            Ok(0)
        }

        fn write(&mut self, _data: &[u8]) -> heatlink_transport::Result<()> {
            Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )))
        }

        fn clear_input(&mut self) -> heatlink_transport::Result<()> {
            Ok(())
        }

        fn clear_output(&mut self) -> heatlink_transport::Result<()> {
            Ok(())
        }

        fn endpoints(&self) -> heatlink_transport::Result<Vec<EndpointInfo>> {
            Ok(Vec::new())
        }

        fn transport_name(&self) -> &'static str {
            "failing"
        }
    }
}
