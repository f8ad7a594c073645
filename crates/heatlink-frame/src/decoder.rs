use bytes::{Buf, BytesMut};
use heatlink_transport::Transport;
use tracing::{debug, trace, warn};

use crate::codec::{is_plausible_prefix, split_prefix, Expect, Payload, ValueType, VARIABLE_SIZE};
use crate::error::Result;
use crate::kind::{kind_name, Class, Kind, END_MARKER};

const INITIAL_BUFFER_CAPACITY: usize = 512;
const READ_CHUNK_SIZE: usize = 256;

/// Polls a partial token may stall before it is given up on.
pub const DEFAULT_STALL_LIMIT: u32 = 4;

/// Kind, class and payload size of the most recently decoded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Raw 6-bit kind code.
    pub code: u8,
    pub class: Class,
    /// Payload bytes following the token header.
    pub declared_size: usize,
}

impl Descriptor {
    /// The end descriptor: batch terminator, or nothing decodable yet.
    pub const END: Self = Self {
        code: END_MARKER,
        class: Class::Flag,
        declared_size: 0,
    };

    /// Known kind, or `None` for a code this build does not assign.
    pub fn kind(&self) -> Option<Kind> {
        Kind::from_code(self.code)
    }

    /// Display name of the kind code.
    pub fn kind_name(&self) -> &'static str {
        kind_name(self.code)
    }

    /// True for the end descriptor; a drain loop stops here.
    pub fn is_end(&self) -> bool {
        *self == Self::END
    }

    /// Wire size of the token, header included.
    pub fn wire_len(&self) -> usize {
        match self.class {
            Class::Flag => 1,
            Class::Variable => 1 + VARIABLE_SIZE,
            Class::Custom => 2 + self.declared_size,
        }
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::END
    }
}

enum Scan {
    /// More bytes needed before anything can be decided.
    Incomplete,
    /// Leading bytes that cannot start a token.
    Garbage(usize),
    /// Bare end marker.
    End,
    /// Complete token; `header` bytes precede the payload.
    Token {
        class: Class,
        code: u8,
        header: usize,
        size: usize,
    },
}

/// What the buffered bytes hold next, without consuming anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
    /// The next token has not fully arrived.
    Incomplete,
    /// An end marker is next.
    End,
    /// A complete token is next.
    Token(Descriptor),
}

fn scan(buf: &[u8]) -> Scan {
    let Some(&first) = buf.first() else {
        return Scan::Incomplete;
    };
    if first == END_MARKER {
        return Scan::End;
    }
    if !is_plausible_prefix(first) {
        let run = buf.iter().take_while(|b| !is_plausible_prefix(**b)).count();
        return Scan::Garbage(run);
    }

    let (class, code) = split_prefix(first);
    let (class, header, size) = match Class::from_code(class) {
        Some(Class::Flag) => (Class::Flag, 1, 0),
        Some(Class::Variable) => (Class::Variable, 1, VARIABLE_SIZE),
        Some(Class::Custom) => match buf.get(1) {
            Some(&len) => (Class::Custom, 2, usize::from(len)),
            None => return Scan::Incomplete,
        },
        None => return Scan::Garbage(1),
    };

    if buf.len() < header + size {
        return Scan::Incomplete;
    }
    Scan::Token {
        class,
        code,
        header,
        size,
    }
}

/// Incremental token decoder.
///
/// Bytes pulled from the transport are kept until a whole token (header and
/// payload) has arrived, so a token split across several polls is decoded
/// once its last byte shows up. Until then [`FrameDecoder::decode_next`]
/// returns [`Descriptor::END`] and consumes nothing from the logical stream.
///
/// A partial token that stops making progress is dropped after
/// `stall_limit` polls. A poll stalls when nothing new arrives, or when the
/// new bytes end in an end marker while the token is still short: the
/// device finished a batch, so the length it promised was never coming.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    current: Descriptor,
    unread_payload: usize,
    resync_events: u64,
    stalled_polls: u32,
    stall_limit: u32,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_stall_limit(DEFAULT_STALL_LIMIT)
    }

    /// Decoder that gives up on a partial token after `limit` stalled polls.
    /// A limit of 0 waits forever.
    pub fn with_stall_limit(limit: u32) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            current: Descriptor::END,
            unread_payload: 0,
            resync_events: 0,
            stalled_polls: 0,
            stall_limit: limit,
        }
    }

    /// Pull available bytes from `transport` and decode the next token header.
    ///
    /// Never waits: when the transport has nothing ready and no complete
    /// token is buffered, the end descriptor is returned.
    pub fn decode_next<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Descriptor> {
        self.skip_unfetched_payload();
        self.pull(transport)?;
        Ok(self.decode_buffered())
    }

    /// Move whatever the transport has ready into the receive buffer.
    ///
    /// Returns the number of bytes read. Feeds stall detection.
    pub fn pull<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize> {
        let read = self.fill(transport)?;
        self.track_stall(read);
        Ok(read)
    }

    /// Record a poll that found nothing new on the transport.
    ///
    /// Returns whether a complete token is buffered afterwards, which is the
    /// case when a stalled partial token was just dropped.
    pub fn note_idle_poll(&mut self) -> bool {
        self.track_stall(0);
        self.has_buffered_token()
    }

    /// Decode the next token header from bytes already buffered.
    pub fn decode_buffered(&mut self) -> Descriptor {
        self.skip_unfetched_payload();
        loop {
            match scan(&self.buf) {
                Scan::Incomplete => {
                    if !self.buf.is_empty() {
                        trace!(buffered = self.buf.len(), "partial token, waiting for more bytes");
                    }
                    self.current = Descriptor::END;
                    return self.current;
                }
                Scan::Garbage(run) => {
                    self.buf.advance(run);
                    self.resync_events += 1;
                    warn!(
                        discarded = run,
                        events = self.resync_events,
                        "discarded bytes that cannot start a token, resynchronizing"
                    );
                }
                Scan::End => {
                    self.buf.advance(1);
                    self.current = Descriptor::END;
                    return self.current;
                }
                Scan::Token {
                    class,
                    code,
                    header,
                    size,
                } => {
                    self.buf.advance(header);
                    self.unread_payload = size;
                    self.current = Descriptor {
                        code,
                        class,
                        declared_size: size,
                    };
                    trace!(kind = kind_name(code), class = class.name(), size, "token decoded");
                    return self.current;
                }
            }
        }
    }

    /// Take the payload of the current token.
    ///
    /// Returns `None` for flags, empty payloads, and payloads already taken.
    ///
    /// - `Variable`: `Expect::Int` gives an `i32`; anything else an `f32`.
    /// - `Custom`: `Expect::Int`/`Expect::Float` decode a 4-byte payload as a
    ///   number; `Expect::Text` gives UTF-8 text or, if invalid, raw bytes;
    ///   everything else gives raw bytes.
    pub fn fetch_payload(&mut self, expect: Expect) -> Option<Payload> {
        let size = self.current.declared_size;
        if self.current.class == Class::Flag || size == 0 || self.unread_payload == 0 {
            return None;
        }

        let data = self.buf.split_to(size).freeze();
        self.unread_payload = 0;

        match (self.current.class, expect) {
            (Class::Variable, Expect::Int) => number(&data, ValueType::Int),
            (Class::Variable, _) => number(&data, ValueType::Float),
            (Class::Custom, Expect::Int) if size == VARIABLE_SIZE => number(&data, ValueType::Int),
            (Class::Custom, Expect::Float) if size == VARIABLE_SIZE => {
                number(&data, ValueType::Float)
            }
            (Class::Custom, Expect::Text) => match String::from_utf8(data.to_vec()) {
                Ok(text) => Some(Payload::Text(text)),
                Err(_) => Some(Payload::Bytes(data)),
            },
            _ => Some(Payload::Bytes(data)),
        }
    }

    /// Take the payload using the type the kind table assigns to the current kind.
    pub fn fetch_expected(&mut self) -> Option<Payload> {
        let expect = self
            .current
            .kind()
            .and_then(Kind::value_type)
            .map(Expect::from)
            .unwrap_or_default();
        self.fetch_payload(expect)
    }

    /// Append raw bytes as if they had been read from the transport.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Whether a complete token or end marker is already buffered.
    pub fn has_buffered_token(&self) -> bool {
        !matches!(self.peek(), Lookahead::Incomplete)
    }

    /// The next buffered token, skipping the current token's unread payload
    /// and any undecodable bytes. Nothing is consumed.
    pub fn peek(&self) -> Lookahead {
        let start = self.unread_payload.min(self.buf.len());
        let mut rest = &self.buf[start..];
        loop {
            match scan(rest) {
                Scan::Incomplete => return Lookahead::Incomplete,
                Scan::Garbage(run) => rest = &rest[run..],
                Scan::End => return Lookahead::End,
                Scan::Token { class, code, size, .. } => {
                    return Lookahead::Token(Descriptor {
                        code,
                        class,
                        declared_size: size,
                    });
                }
            }
        }
    }

    /// The most recently decoded descriptor.
    pub fn current(&self) -> Descriptor {
        self.current
    }

    /// Bytes held in the receive buffer.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Runs of undecodable bytes discarded so far.
    pub fn resync_events(&self) -> u64 {
        self.resync_events
    }

    /// Drop buffered bytes and decode state.
    pub fn reset(&mut self) {
        if !self.buf.is_empty() {
            debug!(discarded = self.buf.len(), "decoder reset with buffered bytes");
        }
        self.buf.clear();
        self.current = Descriptor::END;
        self.unread_payload = 0;
        self.stalled_polls = 0;
    }

    /// Whether the buffer holds the start of a token that has not fully arrived.
    fn holds_partial_token(&self) -> bool {
        let start = self.unread_payload.min(self.buf.len());
        let mut rest = &self.buf[start..];
        loop {
            match scan(rest) {
                Scan::Incomplete => return !rest.is_empty(),
                Scan::Garbage(run) => rest = &rest[run..],
                Scan::End | Scan::Token { .. } => return false,
            }
        }
    }

    fn track_stall(&mut self, read: usize) {
        if self.unread_payload > 0 || !self.holds_partial_token() {
            self.stalled_polls = 0;
            return;
        }

        let batch_ended = self.buf.last() == Some(&END_MARKER);
        if read > 0 && !batch_ended {
            self.stalled_polls = 0;
            return;
        }

        self.stalled_polls += 1;
        trace!(polls = self.stalled_polls, "partial token stalled");
        if self.stall_limit > 0 && self.stalled_polls >= self.stall_limit {
            self.abandon_partial_token();
        }
    }

    /// Drop a stalled partial token up to the first offset from which the
    /// buffer parses as whole tokens ending in an end marker. Without such an
    /// offset only the prefix byte goes.
    fn abandon_partial_token(&mut self) {
        let start = skip_garbage(&self.buf);
        self.buf.advance(start);
        let discarded = (1..self.buf.len())
            .find(|&offset| completes_batch(&self.buf[offset..]))
            .unwrap_or(1)
            .min(self.buf.len());
        self.buf.advance(discarded);
        self.stalled_polls = 0;
        self.resync_events += 1;
        warn!(
            discarded = start + discarded,
            events = self.resync_events,
            "partial token never completed, resynchronizing"
        );
    }

    fn skip_unfetched_payload(&mut self) {
        if self.unread_payload > 0 {
            debug!(
                kind = self.current.kind_name(),
                bytes = self.unread_payload,
                "skipping unfetched payload"
            );
            self.buf.advance(self.unread_payload);
            self.unread_payload = 0;
        }
    }

    fn fill<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<usize> {
        let mut remaining = transport.bytes_waiting()?;
        let mut total = 0usize;
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while remaining > 0 {
            let want = remaining.min(READ_CHUNK_SIZE);
            let read = transport.read(&mut chunk[..want])?;
            if read == 0 {
                // Reported ready but delivered nothing; pick it up next poll.
                break;
            }
            self.buf.extend_from_slice(&chunk[..read]);
            remaining = remaining.saturating_sub(read);
            total += read;
        }

        Ok(total)
    }
}

fn skip_garbage(buf: &[u8]) -> usize {
    let mut skipped = 0;
    while let Scan::Garbage(run) = scan(&buf[skipped..]) {
        skipped += run;
    }
    skipped
}

/// Whether `buf` starts with whole tokens followed by an end marker.
fn completes_batch(mut buf: &[u8]) -> bool {
    loop {
        match scan(buf) {
            Scan::End => return true,
            Scan::Token { header, size, .. } => buf = &buf[header + size..],
            Scan::Incomplete | Scan::Garbage(_) => return false,
        }
    }
}

fn number(data: &[u8], ty: ValueType) -> Option<Payload> {
    let raw: [u8; 4] = data.get(..VARIABLE_SIZE)?.try_into().ok()?;
    Some(Payload::from(ty.decode(raw)))
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use heatlink_transport::MemoryTransport;

    use super::*;
    use crate::codec::{encode_custom, encode_flag, encode_variable, Value};
    use crate::encoder::FrameEncoder;

    fn open_pair() -> (MemoryTransport, MemoryTransport) {
        let (mut host, mut device) = MemoryTransport::pair();
        host.open("mem").unwrap();
        device.open("mem").unwrap();
        (host, device)
    }

    #[test]
    fn variable_float_roundtrip() {
        let (mut host, mut device) = open_pair();
        let mut encoder = FrameEncoder::new();
        encoder.append_variable(Kind::PidP, 0.045).unwrap();
        encoder.flush(&mut device).unwrap();

        let mut decoder = FrameDecoder::new();
        let desc = decoder.decode_next(&mut host).unwrap();
        assert_eq!(desc.kind(), Some(Kind::PidP));
        assert_eq!(desc.class, Class::Variable);
        assert_eq!(desc.declared_size, 4);
        assert_eq!(desc.wire_len(), 5);

        let before = decoder.buffered();
        let value = decoder.fetch_payload(Expect::Float).unwrap();
        assert_eq!(before - decoder.buffered(), 4);
        assert!((value.as_f32().unwrap() - 0.045).abs() < 1e-7);

        assert!(decoder.decode_next(&mut host).unwrap().is_end());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn variable_defaults_to_float_and_honors_int() {
        let mut wire = BytesMut::new();
        encode_variable(Kind::Status.code(), Value::Int(0b1011), &mut wire).unwrap();
        encode_variable(Kind::Current.code(), Value::Float(1.25), &mut wire).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.push(&wire);

        decoder.decode_buffered();
        assert_eq!(decoder.fetch_payload(Expect::Int), Some(Payload::Int(0b1011)));

        decoder.decode_buffered();
        assert_eq!(decoder.fetch_payload(Expect::Default), Some(Payload::Float(1.25)));
    }

    #[test]
    fn fetch_expected_uses_kind_table() {
        let mut wire = BytesMut::new();
        encode_variable(Kind::Status.code(), Value::Int(3), &mut wire).unwrap();
        encode_variable(Kind::ActualTemp.code(), Value::Float(21.5), &mut wire).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.push(&wire);

        decoder.decode_buffered();
        assert_eq!(decoder.fetch_expected(), Some(Payload::Int(3)));
        decoder.decode_buffered();
        assert_eq!(decoder.fetch_expected(), Some(Payload::Float(21.5)));
    }

    #[test]
    fn flag_has_no_payload() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x01]);
        let desc = decoder.decode_buffered();
        assert_eq!(desc.kind(), Some(Kind::Start));
        assert_eq!(desc.class, Class::Flag);
        assert_eq!(decoder.fetch_payload(Expect::Raw), None);
    }

    #[test]
    fn custom_payload_interpretations() {
        let mut wire = BytesMut::new();
        encode_custom(20, "grüß".as_bytes(), 6, &mut wire).unwrap();
        encode_custom(21, &[0xFF, 0xFE], 2, &mut wire).unwrap();
        encode_custom(22, &7i32.to_le_bytes(), 4, &mut wire).unwrap();
        encode_custom(23, &[1, 2, 3], 3, &mut wire).unwrap();
        encode_custom(24, &[], 0, &mut wire).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.push(&wire);

        let desc = decoder.decode_buffered();
        assert_eq!(desc.kind(), None);
        assert_eq!(desc.code, 20);
        assert_eq!(
            decoder.fetch_payload(Expect::Text),
            Some(Payload::Text("grüß".to_string()))
        );

        decoder.decode_buffered();
        assert_eq!(
            decoder.fetch_payload(Expect::Text),
            Some(Payload::Bytes(bytes::Bytes::from_static(&[0xFF, 0xFE])))
        );

        decoder.decode_buffered();
        assert_eq!(decoder.fetch_payload(Expect::Int), Some(Payload::Int(7)));

        decoder.decode_buffered();
        assert_eq!(
            decoder.fetch_payload(Expect::Int),
            Some(Payload::Bytes(bytes::Bytes::from_static(&[1, 2, 3])))
        );

        let desc = decoder.decode_buffered();
        assert_eq!(desc.declared_size, 0);
        assert_eq!(decoder.fetch_payload(Expect::Raw), None);
    }

    #[test]
    fn payload_is_taken_once() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x46, 0, 0, 0x80, 0x3F]);
        decoder.decode_buffered();
        assert_eq!(decoder.fetch_payload(Expect::Float), Some(Payload::Float(1.0)));
        assert_eq!(decoder.fetch_payload(Expect::Float), None);
    }

    #[test]
    fn unfetched_payload_is_skipped() {
        let mut wire = BytesMut::new();
        encode_variable(Kind::ActualTemp.code(), Value::Float(20.0), &mut wire).unwrap();
        encode_flag(Kind::Stop.code(), &mut wire).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.push(&wire);

        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::ActualTemp));
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Stop));
    }

    #[test]
    fn partial_token_resumes_on_next_poll() {
        let (mut host, mut device) = open_pair();
        let mut decoder = FrameDecoder::new();
        let mut wire = BytesMut::new();
        encode_custom(Kind::Status.code(), b"hello", 5, &mut wire).unwrap();

        device.write(&wire[..1]).unwrap();
        assert!(decoder.decode_next(&mut host).unwrap().is_end());
        assert!(!decoder.has_buffered_token());

        device.write(&wire[1..4]).unwrap();
        assert!(decoder.decode_next(&mut host).unwrap().is_end());

        device.write(&wire[4..]).unwrap();
        assert!(decoder.has_buffered_token());
        let desc = decoder.decode_next(&mut host).unwrap();
        assert_eq!(desc.declared_size, 5);
        assert_eq!(
            decoder.fetch_payload(Expect::Text),
            Some(Payload::Text("hello".to_string()))
        );
    }

    #[test]
    fn truncated_custom_token_is_abandoned() {
        let (mut host, mut device) = open_pair();
        let mut decoder = FrameDecoder::new();

        // Custom header promising 40 bytes, cut off after one.
        device.write(&[0x94, 40, b'x']).unwrap();

        let mut temps = 0;
        let mut poll = |decoder: &mut FrameDecoder, host: &mut MemoryTransport| loop {
            let desc = decoder.decode_next(host).unwrap();
            if desc.is_end() {
                break;
            }
            assert_eq!(desc.kind(), Some(Kind::ActualTemp));
            assert_eq!(decoder.fetch_expected(), Some(Payload::Float(50.0)));
            temps += 1;
        };

        let mut encoder = FrameEncoder::new();
        for _ in 0..8 {
            encoder.append_variable(Kind::ActualTemp, 50.0f32).unwrap();
            encoder.flush(&mut device).unwrap();
            poll(&mut decoder, &mut host);
        }
        for _ in 0..8 {
            poll(&mut decoder, &mut host);
        }

        assert_eq!(temps, 8);
        assert_eq!(decoder.resync_events(), 1);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn stall_counts_only_polls_without_progress() {
        let (mut host, mut device) = open_pair();
        let mut decoder = FrameDecoder::with_stall_limit(2);
        let mut wire = BytesMut::new();
        encode_custom(Kind::Status.code(), b"slowly", 6, &mut wire).unwrap();

        device.write(&wire[..2]).unwrap();
        assert!(decoder.decode_next(&mut host).unwrap().is_end());
        assert!(!decoder.note_idle_poll());

        // New bytes reset the count.
        device.write(&wire[2..5]).unwrap();
        assert!(decoder.decode_next(&mut host).unwrap().is_end());
        assert!(!decoder.note_idle_poll());

        device.write(&wire[5..]).unwrap();
        let desc = decoder.decode_next(&mut host).unwrap();
        assert_eq!(desc.declared_size, 6);
        assert_eq!(decoder.resync_events(), 0);
    }

    #[test]
    fn idle_polls_abandon_partial_token() {
        let mut decoder = FrameDecoder::with_stall_limit(3);
        decoder.push(&[0x48, 0x00, 0x01]);
        assert!(decoder.decode_buffered().is_end());

        assert!(!decoder.note_idle_poll());
        assert!(!decoder.note_idle_poll());
        // 0x00 0x01 are Reset and Start flags once the prefix is gone.
        assert!(decoder.note_idle_poll());
        assert_eq!(decoder.resync_events(), 1);
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Reset));
    }

    #[test]
    fn zero_stall_limit_waits_forever() {
        let mut decoder = FrameDecoder::with_stall_limit(0);
        decoder.push(&[0x48, 0x00]);
        for _ in 0..100 {
            assert!(!decoder.note_idle_poll());
        }
        assert_eq!(decoder.resync_events(), 0);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.peek(), Lookahead::Incomplete);

        decoder.push(&[0x03, 0x01, END_MARKER]);
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Ack));
        match decoder.peek() {
            Lookahead::Token(next) => assert_eq!(next.kind(), Some(Kind::Start)),
            other => panic!("unexpected lookahead: {other:?}"),
        }
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Start));
        assert_eq!(decoder.peek(), Lookahead::End);
    }

    #[test]
    fn fragmented_reads_are_reassembled() {
        let (mut host, mut device) = open_pair();
        host.set_read_chunk(Some(1));

        let mut encoder = FrameEncoder::new();
        encoder.append_variable(Kind::Current, 3.5f32).unwrap();
        encoder.append_flag(Kind::Reset).unwrap();
        encoder.flush(&mut device).unwrap();

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode_next(&mut host).unwrap().kind(), Some(Kind::Current));
        assert_eq!(decoder.fetch_payload(Expect::Float), Some(Payload::Float(3.5)));
        assert_eq!(decoder.decode_next(&mut host).unwrap().kind(), Some(Kind::Reset));
        assert!(decoder.decode_next(&mut host).unwrap().is_end());
    }

    #[test]
    fn garbage_is_discarded_and_counted() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0xFF, 0xC3, 0x3F, 0x02]);

        let desc = decoder.decode_buffered();
        assert_eq!(desc.kind(), Some(Kind::Stop));
        assert_eq!(decoder.resync_events(), 1);
    }

    #[test]
    fn idle_transport_yields_end() {
        let (mut host, _device) = open_pair();
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode_next(&mut host).unwrap(), Descriptor::END);
    }

    #[test]
    fn closed_transport_fails() {
        let (mut host, _device) = MemoryTransport::pair();
        let mut decoder = FrameDecoder::new();
        assert!(decoder.decode_next(&mut host).is_err());
    }

    #[test]
    fn reset_drops_partial_state() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x48, 0x00]);
        assert!(decoder.decode_buffered().is_end());
        decoder.reset();
        assert_eq!(decoder.buffered(), 0);

        decoder.push(&[0x03]);
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Ack));
    }

    #[test]
    fn end_marker_separates_batches() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x03, END_MARKER, 0x02, END_MARKER]);
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Ack));
        assert!(decoder.decode_buffered().is_end());
        assert!(decoder.has_buffered_token());
        assert_eq!(decoder.decode_buffered().kind(), Some(Kind::Stop));
        assert!(decoder.decode_buffered().is_end());
        assert!(!decoder.has_buffered_token());
    }
}
