use heatlink_frame::FrameError;
use heatlink_transport::TransportError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Opening or preparing the endpoint failed. The session is disconnected.
    #[error("could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: TransportError,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The operation needs a connected session.
    #[error("session is not connected")]
    NotConnected,
}

impl SessionError {
    /// Whether this is a transmit-buffer capacity error the caller may ignore.
    pub fn is_capacity(&self) -> bool {
        matches!(self, SessionError::Frame(err) if err.is_capacity())
    }

    /// Whether the error came from the link itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SessionError::Connect { .. }
                | SessionError::Transport(_)
                | SessionError::Frame(FrameError::Transport(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
