use heatlink_transport::TransportError;

/// Errors that can occur during token encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The token does not fit in the transmit buffer. The buffer is unchanged.
    #[error("transmit buffer full (token needs {needed} bytes, {available} available)")]
    BufferFull { needed: usize, available: usize },

    /// A custom token declared more payload than its length byte can carry.
    #[error("custom payload too large ({size} bytes, max {max})")]
    CustomTooLarge { size: usize, max: usize },

    /// The kind code does not fit in the 6-bit kind field.
    #[error("invalid kind code {0} (max 62)")]
    InvalidKind(u8),

    /// The kind is reserved for the end-of-batch marker.
    #[error("kind {0} is reserved for the end-of-batch marker")]
    ReservedKind(u8),

    /// A packed value list mixed integers and floats.
    #[error("value list must contain only ints or only floats")]
    MixedValues,

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// Whether this is a capacity error the caller may ignore.
    pub fn is_capacity(&self) -> bool {
        matches!(self, FrameError::BufferFull { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
