use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{EndpointInfo, Transport};

type Queue = Arc<Mutex<VecDeque<u8>>>;

/// In-process byte link.
///
/// [`MemoryTransport::pair`] returns two ends wired back to back: bytes written
/// on one end become readable on the other. Both ends start closed. An end
/// opens on any endpoint unless an endpoint list was configured with
/// [`MemoryTransport::with_endpoints`].
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: Queue,
    outbound: Queue,
    endpoints: Vec<String>,
    endpoint: Option<String>,
    read_chunk: Option<usize>,
    writes: usize,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Queue = Arc::default();
        let b_to_a: Queue = Arc::default();
        let a = Self::from_queues(Arc::clone(&b_to_a), Arc::clone(&a_to_b));
        let b = Self::from_queues(a_to_b, b_to_a);
        (a, b)
    }

    fn from_queues(inbound: Queue, outbound: Queue) -> Self {
        Self {
            inbound,
            outbound,
            endpoints: Vec::new(),
            endpoint: None,
            read_chunk: None,
            writes: 0,
        }
    }

    /// Restrict `open` to the given endpoint names and report them from `endpoints`.
    pub fn with_endpoints<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = names.into_iter().map(Into::into).collect();
        self
    }

    /// Cap how many bytes a single `read` may return, to simulate a link
    /// that delivers data in fragments. `None` removes the cap.
    pub fn set_read_chunk(&mut self, chunk: Option<usize>) {
        self.read_chunk = chunk;
    }

    /// Number of successful `write` calls since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Endpoint this end is currently open on.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.endpoint.is_some() {
            Ok(())
        } else {
            Err(TransportError::NotOpen)
        }
    }
}

fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<u8>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Transport for MemoryTransport {
    fn open(&mut self, endpoint: &str) -> Result<()> {
        if !self.endpoints.is_empty() && !self.endpoints.iter().any(|name| name == endpoint) {
            return Err(TransportError::Open {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such in-memory endpoint",
                ),
            });
        }
        debug!(endpoint, "memory link opened");
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    fn close(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            debug!(%endpoint, "memory link closed");
        }
    }

    fn is_open(&self) -> bool {
        self.endpoint.is_some()
    }

    fn bytes_waiting(&mut self) -> Result<usize> {
        self.ensure_open()?;
        Ok(lock(&self.inbound).len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let mut inbound = lock(&self.inbound);
        let limit = self.read_chunk.map_or(buf.len(), |chunk| chunk.min(buf.len()));
        let n = limit.min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        lock(&self.outbound).extend(data.iter().copied());
        self.writes += 1;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.ensure_open()?;
        lock(&self.inbound).clear();
        Ok(())
    }

    fn clear_output(&mut self) -> Result<()> {
        // Writes are delivered immediately; nothing is ever pending.
        self.ensure_open()
    }

    fn endpoints(&self) -> Result<Vec<EndpointInfo>> {
        Ok(self
            .endpoints
            .iter()
            .map(|name| EndpointInfo {
                name: name.clone(),
                description: "in-memory link".to_string(),
                hardware_id: String::new(),
            })
            .collect())
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_pair() -> (MemoryTransport, MemoryTransport) {
        let (mut host, mut device) = MemoryTransport::pair();
        host.open("mem0").unwrap();
        device.open("mem0").unwrap();
        (host, device)
    }

    #[test]
    fn bytes_cross_the_link() {
        let (mut host, mut device) = open_pair();

        host.write(b"hello").unwrap();
        assert_eq!(device.bytes_waiting().unwrap(), 5);

        let mut buf = [0u8; 8];
        let n = device.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(device.bytes_waiting().unwrap(), 0);
        assert_eq!(host.bytes_waiting().unwrap(), 0);
    }

    #[test]
    fn read_returns_zero_when_idle() {
        let (mut host, _device) = open_pair();
        let mut buf = [0u8; 4];
        assert_eq!(host.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_chunk_fragments_delivery() {
        let (mut host, mut device) = open_pair();
        device.set_read_chunk(Some(2));
        host.write(&[1, 2, 3, 4, 5]).unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(device.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn closed_end_rejects_io() {
        let (mut host, _device) = MemoryTransport::pair();
        assert!(matches!(host.write(b"x"), Err(TransportError::NotOpen)));
        assert!(matches!(host.bytes_waiting(), Err(TransportError::NotOpen)));

        host.open("mem0").unwrap();
        host.close();
        host.close();
        assert!(!host.is_open());
        assert!(matches!(host.read(&mut [0u8; 1]), Err(TransportError::NotOpen)));
    }

    #[test]
    fn endpoint_list_restricts_open() {
        let (host, _device) = MemoryTransport::pair();
        let mut host = host.with_endpoints(["ttyMEM0", "ttyMEM1"]);

        let err = host.open("ttyUSB9").unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(!host.is_open());

        host.open("ttyMEM1").unwrap();
        assert_eq!(host.endpoint(), Some("ttyMEM1"));

        let names: Vec<String> = host.endpoints().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["ttyMEM0", "ttyMEM1"]);
    }

    #[test]
    fn clear_input_discards_pending_bytes() {
        let (mut host, mut device) = open_pair();
        device.write(b"stale").unwrap();
        assert_eq!(host.bytes_waiting().unwrap(), 5);

        host.clear_input().unwrap();
        assert_eq!(host.bytes_waiting().unwrap(), 0);
    }

    #[test]
    fn write_count_tracks_successful_writes() {
        let (mut host, _device) = open_pair();
        host.write(b"a").unwrap();
        host.write(b"bc").unwrap();
        assert_eq!(host.write_count(), 2);
    }
}
