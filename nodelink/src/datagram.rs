//! Best-effort datagram channel.
//!
//! Each payload travels as one UDP datagram with its CRC32 appended:
//!
//! ```text
//! ┌──────────────────────────┬──────────────────┐
//! │ Payload (variable)       │ CRC32 (4 bytes)  │
//! │                          │ Big-endian u32   │
//! └──────────────────────────┴──────────────────┘
//! ```
//!
//! There is no connection, retry, ordering or de-duplication. A datagram that
//! fails verification is dropped and reported as [`Datagram::Corrupt`].

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::core::Crc32;
use crate::error::{ConfigError, Result};
use crate::io::is_wait_expired;
use crate::stats::ChannelStats;

/// Outcome of a datagram receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    /// A verified payload and its sender.
    Received {
        /// Payload with the checksum stripped.
        payload: Vec<u8>,
        /// Sender address.
        from: SocketAddr,
    },
    /// Nothing arrived within the receive timeout.
    TimedOut,
    /// A datagram arrived but failed verification and was dropped.
    Corrupt {
        /// Sender address.
        from: SocketAddr,
    },
}

/// UDP endpoint that appends and verifies checksums.
#[derive(Debug)]
pub struct DatagramChannel {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    recv_buf: Vec<u8>,
    stats: ChannelStats,
}

impl DatagramChannel {
    /// Binds `bind` immediately.
    ///
    /// `timeout` bounds every send and receive; `send_buffer` sets
    /// `SO_SNDBUF`.
    pub fn bind(
        bind: SocketAddr,
        peer: Option<SocketAddr>,
        timeout: Duration,
        send_buffer: usize,
    ) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(bind), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_send_buffer_size(send_buffer)?;
        socket.bind(&bind.into())?;

        let socket: UdpSocket = socket.into();
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;

        log::debug!("Datagram channel bound to {:?}", socket.local_addr()?);

        Ok(Self {
            socket,
            peer,
            recv_buf: Vec::new(),
            stats: ChannelStats::default(),
        })
    }

    /// Returns the address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Returns the default destination.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Returns the channel statistics.
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Sends `payload` to the configured peer.
    pub fn send_datagram(&mut self, payload: &[u8]) -> Result<()> {
        let dest = self.peer.ok_or(ConfigError::NoDatagramPeer)?;
        self.send_datagram_to(payload, dest)
    }

    /// Sends `payload` to `dest`, with one `send_to` call.
    pub fn send_datagram_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<()> {
        let frame = Crc32::append(payload);
        self.socket.send_to(&frame, dest)?;
        self.stats.record_sent(payload.len());

        log::trace!("Sent datagram to {}: {} bytes", dest, payload.len());
        Ok(())
    }

    /// Receives one datagram of at most `max_size` bytes, checksum included.
    ///
    /// Blocks up to the receive timeout. A datagram larger than `max_size` is
    /// truncated by the platform and then fails verification.
    pub fn receive_datagram(&mut self, max_size: usize) -> Result<Datagram> {
        self.recv_buf.resize(max_size, 0);

        let (len, from) = match self.socket.recv_from(&mut self.recv_buf) {
            Ok(r) => r,
            Err(e) if is_wait_expired(&e) => {
                self.stats.timeouts += 1;
                return Ok(Datagram::TimedOut);
            }
            Err(e) => return Err(e.into()),
        };

        match Crc32::verify_and_strip(&self.recv_buf[..len]) {
            Some(payload) => {
                self.stats.record_received(payload.len());
                log::trace!("Received datagram from {}: {} bytes", from, payload.len());
                Ok(Datagram::Received {
                    payload: payload.to_vec(),
                    from,
                })
            }
            None => {
                self.stats.corrupt_dropped += 1;
                log::warn!("Dropped corrupt datagram from {} ({} bytes)", from, len);
                Ok(Datagram::Corrupt { from })
            }
        }
    }
}
