use heatlink_frame::{EncoderConfig, DEFAULT_STALL_LIMIT};

/// Default cap on messages handled by one [`crate::Session::drain`] call.
pub const DEFAULT_MAX_BATCH: usize = 256;

/// Session behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Transmit buffer settings.
    pub encoder: EncoderConfig,
    /// Send the watchdog Ack after every drained batch. Default: true.
    pub ack_after_drain: bool,
    /// Maximum messages handled per drain; the rest waits for the next poll.
    pub max_batch: usize,
    /// Stalled polls after which a partial token is dropped; 0 never drops.
    pub stall_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            ack_after_drain: true,
            max_batch: DEFAULT_MAX_BATCH,
            stall_limit: DEFAULT_STALL_LIMIT,
        }
    }
}
