use heatlink_frame::{
    Class, Descriptor, Expect, FrameDecoder, FrameEncoder, FrameError, Kind, Lookahead, Payload,
    Value,
};
use heatlink_transport::{EndpointInfo, Transport};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::message::{Message, Reply};

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
}

/// A link to one device: transport, transmit buffer and decoder state.
///
/// The session is driven by its owner's loop. No call waits for the device:
/// reads return what has arrived, and a flush is a single write.
pub struct Session<T: Transport> {
    transport: T,
    encoder: FrameEncoder,
    decoder: FrameDecoder,
    state: SessionState,
    endpoint: Option<String>,
    config: SessionConfig,
    /// Ack/Nack whose command token has not arrived yet.
    pending_reply: Option<Descriptor>,
}

/// What follows an Ack/Nack in the receive buffer.
enum FollowUp {
    /// A command flag, consumed and folded into the reply.
    Command(Kind),
    /// End of batch or an unrelated token, left for normal dispatch.
    Bare,
    /// Not enough bytes to tell yet.
    Pending,
}

impl<T: Transport> Session<T> {
    /// Create a disconnected session with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create a disconnected session with explicit configuration.
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            encoder: FrameEncoder::with_config(config.encoder.clone()),
            decoder: FrameDecoder::with_stall_limit(config.stall_limit),
            state: SessionState::Disconnected,
            endpoint: None,
            config,
            pending_reply: None,
        }
    }

    /// Open `endpoint` and clear both transport queues.
    ///
    /// An open connection is closed first. On failure the session stays
    /// disconnected.
    pub fn connect(&mut self, endpoint: &str) -> Result<()> {
        if self.state == SessionState::Connected || self.transport.is_open() {
            self.disconnect();
        }

        let connect_error = |source| SessionError::Connect {
            endpoint: endpoint.to_string(),
            source,
        };

        self.transport.open(endpoint).map_err(connect_error)?;
        let cleared = self
            .transport
            .clear_input()
            .and_then(|()| self.transport.clear_output());
        if let Err(source) = cleared {
            self.transport.close();
            return Err(connect_error(source));
        }

        self.decoder.reset();
        self.encoder.clear();
        self.pending_reply = None;
        self.state = SessionState::Connected;
        self.endpoint = Some(endpoint.to_string());
        info!(
            endpoint,
            transport = self.transport.transport_name(),
            "session connected"
        );
        Ok(())
    }

    /// Close the transport. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.decoder.reset();
        self.pending_reply = None;
        if self.state == SessionState::Connected {
            info!(endpoint = ?self.endpoint, "session disconnected");
        }
        self.state = SessionState::Disconnected;
        self.endpoint = None;
    }

    /// Endpoints the transport can open.
    pub fn enumerate_endpoints(&self) -> Result<Vec<EndpointInfo>> {
        Ok(self.transport.endpoints()?)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Endpoint of the current connection.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Queue a `Flag` token.
    pub fn append_flag(&mut self, kind: Kind) -> Result<()> {
        Ok(self.encoder.append_flag(kind)?)
    }

    /// Queue a `Variable` token.
    pub fn append_variable(&mut self, kind: Kind, value: impl Into<Value>) -> Result<()> {
        Ok(self.encoder.append_variable(kind, value)?)
    }

    /// Queue a `Custom` token, truncating or zero-padding `data` to `declared_size`.
    pub fn append_custom(&mut self, kind: Kind, data: &[u8], declared_size: usize) -> Result<()> {
        Ok(self.encoder.append_custom(kind, data, declared_size)?)
    }

    /// Queue UTF-8 text as a `Custom` token.
    pub fn append_custom_text(&mut self, kind: Kind, text: &str) -> Result<()> {
        Ok(self.encoder.append_custom_text(kind, text)?)
    }

    /// Queue a packed list of ints or floats as a `Custom` token.
    pub fn append_custom_values(&mut self, kind: Kind, values: &[Value]) -> Result<()> {
        Ok(self.encoder.append_custom_values(kind, values)?)
    }

    /// Send the queued tokens and the end marker in one write.
    ///
    /// Returns the bytes written (0 when nothing was queued). A transport
    /// failure disconnects the session.
    pub fn flush(&mut self) -> Result<usize> {
        self.ensure_connected()?;
        let result = self.encoder.flush(&mut self.transport);
        self.check(result)
    }

    /// Whether a drain would find input.
    ///
    /// False when disconnected. A transport failure disconnects the session.
    /// A poll that finds nothing counts toward dropping a stalled partial token.
    pub fn poll_has_input(&mut self) -> Result<bool> {
        if !self.is_connected() {
            return Ok(false);
        }
        if self.decoder.has_buffered_token() {
            return Ok(true);
        }
        let waiting = self.transport.bytes_waiting().map_err(FrameError::from);
        if self.check(waiting)? > 0 {
            return Ok(true);
        }
        Ok(self.decoder.note_idle_poll())
    }

    /// Decode the next token header. [`Descriptor::END`] ends a drain loop.
    pub fn decode_next(&mut self) -> Result<Descriptor> {
        self.ensure_connected()?;
        let result = self.decoder.decode_next(&mut self.transport);
        self.check(result)
    }

    /// Take the current token's payload, interpreted as `expect`.
    pub fn fetch_payload(&mut self, expect: Expect) -> Option<Payload> {
        self.decoder.fetch_payload(expect)
    }

    /// Take the current token's payload using the kind table.
    pub fn fetch_expected(&mut self) -> Option<Payload> {
        self.decoder.fetch_expected()
    }

    /// Queue an Ack and flush: tells the device the host is alive.
    ///
    /// When the transmit buffer is too full for the Ack, the queued tokens
    /// are flushed first.
    pub fn acknowledge(&mut self) -> Result<usize> {
        let mut written = 0;
        match self.append_flag(Kind::Ack) {
            Ok(()) => {}
            Err(err) if err.is_capacity() => {
                written += self.flush()?;
                self.append_flag(Kind::Ack)?;
            }
            Err(err) => return Err(err),
        }
        written += self.flush()?;
        Ok(written)
    }

    /// Decode every available message, pass each to `handler`, then send the
    /// watchdog Ack.
    ///
    /// Returns the number of messages handled. When there is no input,
    /// nothing is decoded and no Ack is sent.
    pub fn drain<F: FnMut(&Message)>(&mut self, mut handler: F) -> Result<usize> {
        if !self.poll_has_input()? {
            return Ok(0);
        }

        let mut handled = 0usize;
        while handled < self.config.max_batch {
            let descriptor = match self.pending_reply.take() {
                Some(reply) => {
                    let result = self.decoder.pull(&mut self.transport);
                    self.check(result)?;
                    reply
                }
                None => {
                    let descriptor = self.decode_next()?;
                    if descriptor.is_end() {
                        break;
                    }
                    descriptor
                }
            };

            let message = match descriptor.kind() {
                Some(kind @ (Kind::Ack | Kind::Nack)) => {
                    let command = match self.reply_follow_up()? {
                        FollowUp::Command(command) => Some(command),
                        FollowUp::Bare => None,
                        FollowUp::Pending => {
                            debug!(kind = kind.name(), "reply command not yet received");
                            self.pending_reply = Some(descriptor);
                            break;
                        }
                    };
                    Message {
                        descriptor,
                        payload: None,
                        reply: Some(Reply {
                            accepted: kind == Kind::Ack,
                            command,
                        }),
                    }
                }
                _ => Message {
                    descriptor,
                    payload: self.fetch_expected(),
                    reply: None,
                },
            };

            handler(&message);
            handled += 1;
        }

        if handled == self.config.max_batch {
            debug!(handled, "drain stopped at batch limit");
        }

        if self.config.ack_after_drain {
            self.acknowledge()?;
        }
        Ok(handled)
    }

    /// Inspect the token after an Ack/Nack. Only a command flag is consumed;
    /// telemetry and unknown kinds stay queued as messages of their own.
    fn reply_follow_up(&mut self) -> Result<FollowUp> {
        let next = match self.decoder.peek() {
            Lookahead::Incomplete => return Ok(FollowUp::Pending),
            Lookahead::End => return Ok(FollowUp::Bare),
            Lookahead::Token(next) => next,
        };
        match next.kind() {
            Some(command)
                if next.class == Class::Flag && !matches!(command, Kind::Ack | Kind::Nack) =>
            {
                self.decode_next()?;
                Ok(FollowUp::Command(command))
            }
            _ => Ok(FollowUp::Bare),
        }
    }

    /// Drop unread input on the transport and in the decoder.
    pub fn resync(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.decoder.reset();
        self.pending_reply = None;
        let result = self.transport.clear_input().map_err(FrameError::from);
        self.check(result)
    }

    /// Runs of undecodable bytes the decoder discarded.
    pub fn resync_events(&self) -> u64 {
        self.decoder.resync_events()
    }

    /// Transmit buffer.
    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// Mutable transmit buffer, e.g. to change the clear policy.
    pub fn encoder_mut(&mut self) -> &mut FrameEncoder {
        &mut self.encoder
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the session and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn check<V>(&mut self, result: heatlink_frame::Result<V>) -> Result<V> {
        result.map_err(|err| {
            if matches!(err, FrameError::Transport(_)) {
                warn!(endpoint = ?self.endpoint, error = %err, "transport failed, disconnecting");
                self.disconnect();
            }
            err.into()
        })
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.transport_name())
            .field("state", &self.state)
            .field("endpoint", &self.endpoint)
            .field("queued", &self.encoder.len())
            .field("buffered", &self.decoder.buffered())
            .finish()
    }
}
