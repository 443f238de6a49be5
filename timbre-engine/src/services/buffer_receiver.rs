//! UDP buffer receiver
//!
//! Reassembles one raw audio buffer per transaction from a sequence of
//! bounded datagrams sent by the host plugin. The wire protocol is a header
//! datagram declaring the sample count followed by payload datagrams of raw
//! little-endian f32 samples. Exactly one transfer may be in flight per
//! receiver; the caller enforces this by taking `&mut self` through a mutex.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use timbre_common::{Error, Result};

/// Header datagram: magic + u32 little-endian sample count.
const HEADER_MAGIC: &[u8; 4] = b"TBUF";

/// Header datagram size in bytes.
const HEADER_LEN: usize = 8;

/// Largest payload datagram the sender may emit. Fits a standard Ethernet
/// MTU after IP/UDP headers and is a multiple of the 4-byte sample size.
pub const MAX_CHUNK_BYTES: usize = 1464;

/// Receives chunked audio buffers over a dedicated UDP socket.
#[derive(Debug)]
pub struct BufferReceiver {
    socket: UdpSocket,
    receive_window: Duration,
}

impl BufferReceiver {
    /// Bind the receiver to `addr` (e.g. `127.0.0.1:5742`).
    pub async fn bind(addr: &str, receive_window: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        tracing::info!("Buffer receiver listening on udp://{}", socket.local_addr()?);
        Ok(Self {
            socket,
            receive_window,
        })
    }

    /// Local address the receiver is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive one complete buffer.
    ///
    /// Blocks until the declared number of samples has arrived. Fails with
    /// `Error::Protocol` when no datagram arrives within the receive window,
    /// when the first datagram is not a valid header, or when the payload
    /// byte count does not match the declared length. On failure any
    /// queued datagrams of the aborted transfer are discarded so the next
    /// transaction starts from a clean socket.
    pub async fn receive(&mut self) -> Result<Vec<f32>> {
        match self.receive_transfer().await {
            Ok(samples) => Ok(samples),
            Err(e) => {
                self.discard_pending();
                Err(e)
            }
        }
    }

    async fn receive_transfer(&mut self) -> Result<Vec<f32>> {
        let mut datagram = [0u8; 2048];

        // Header: declared sample count
        let len = self.next_datagram(&mut datagram).await?;
        let declared_samples = parse_header(&datagram[..len])?;
        let declared_bytes = declared_samples * 4;

        let mut payload: Vec<u8> = Vec::with_capacity(declared_bytes);
        while payload.len() < declared_bytes {
            let len = self.next_datagram(&mut datagram).await?;
            if payload.len() + len > declared_bytes {
                return Err(Error::Protocol(format!(
                    "transfer overran declared length: {} + {} > {} bytes",
                    payload.len(),
                    len,
                    declared_bytes
                )));
            }
            payload.extend_from_slice(&datagram[..len]);
        }

        tracing::debug!(
            samples = declared_samples,
            "Buffer transfer complete"
        );
        Ok(decode_samples(&payload))
    }

    /// Drop whatever is still queued on the socket. Leftover chunks of an
    /// aborted transfer would otherwise be misparsed as the next
    /// transaction's header.
    fn discard_pending(&self) {
        let mut scratch = [0u8; 2048];
        while self.socket.try_recv_from(&mut scratch).is_ok() {}
    }

    async fn next_datagram(&self, buf: &mut [u8]) -> Result<usize> {
        match timeout(self.receive_window, self.socket.recv_from(buf)).await {
            Ok(result) => Ok(result?.0),
            Err(_) => Err(Error::Protocol(format!(
                "no datagram within {:?}",
                self.receive_window
            ))),
        }
    }
}

/// Validate a header datagram and extract the declared sample count.
fn parse_header(datagram: &[u8]) -> Result<usize> {
    if datagram.len() != HEADER_LEN || &datagram[..4] != HEADER_MAGIC {
        return Err(Error::Protocol(format!(
            "expected {}-byte header datagram, got {} bytes",
            HEADER_LEN,
            datagram.len()
        )));
    }
    let count = u32::from_le_bytes([datagram[4], datagram[5], datagram[6], datagram[7]]);
    Ok(count as usize)
}

/// Decode accumulated payload bytes into f32 samples. The receive loop
/// guarantees the byte count is an exact multiple of 4.
fn decode_samples(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Encode a header datagram for a buffer of `samples` samples.
///
/// Used by senders (and tests) to open a transfer.
pub fn encode_header(samples: usize) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(HEADER_MAGIC);
    header[4..].copy_from_slice(&(samples as u32).to_le_bytes());
    header
}

/// Encode a sample slice into payload bytes ready for chunked sending.
pub fn encode_payload(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
