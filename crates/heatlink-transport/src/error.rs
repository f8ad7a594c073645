/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified endpoint.
    #[error("failed to open {endpoint}: {source}")]
    Open {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to list the available endpoints.
    #[error("failed to enumerate endpoints: {0}")]
    Enumerate(std::io::Error),

    /// An I/O error occurred on an open link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation requires an open link.
    #[error("transport is not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let open = TransportError::Open {
            endpoint: "/dev/ttyACM0".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(open.to_string().starts_with("failed to open /dev/ttyACM0: "));

        let cases = [
            open,
            TransportError::Enumerate(io::Error::other("no sysfs")),
            TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)),
            TransportError::NotOpen,
        ];
        for err in cases {
            let expected = match &err {
                TransportError::Open { .. } => "failed to open",
                TransportError::Enumerate(_) => "failed to enumerate",
                TransportError::Io(_) => "transport I/O error",
                TransportError::NotOpen => "transport is not open",
            };
            assert!(err.to_string().starts_with(expected), "{err}");
        }
    }
}
