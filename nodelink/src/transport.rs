//! The `Transport` facade: one datagram channel plus one stream channel.

use std::net::SocketAddr;

use crate::config::{StreamRole, TransportConfig};
use crate::datagram::{Datagram, DatagramChannel};
use crate::error::{Error, Result};
use crate::stats::ChannelStats;
use crate::stream::{StreamChannel, StreamMessage, StreamState};

/// Owns both channels of a link and forwards calls to them.
///
/// Every call blocks for at most its configured timeout. The type is meant to
/// be driven by one thread; all operations take `&mut self`.
///
/// # Example
///
/// ```rust,no_run
/// use nodelink::{StreamRole, Transport, TransportConfig};
///
/// let config = TransportConfig::builder(StreamRole::client("10.42.0.86:5006".parse()?))
///     .with_datagram_peer("10.42.0.86:5005".parse()?)
///     .build()?;
/// let mut link = Transport::new(config)?;
///
/// link.send_datagram(b"throttle:0.4")?;
/// link.connect()?;
/// link.send(b"cmd:stop")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Transport {
    config: TransportConfig,
    datagram: Option<DatagramChannel>,
    stream: StreamChannel,
}

impl Transport {
    /// Binds the datagram socket and prepares the stream channel. In the
    /// server role the stream listener is opened right away.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let datagram = DatagramChannel::bind(
            config.datagram_bind(),
            config.datagram_peer(),
            config.datagram_timeout(),
            config.send_buffer(),
        )?;

        let mut stream = StreamChannel::from_config(&config);
        if let StreamRole::Server { .. } = config.role() {
            stream.listen()?;
        }

        Ok(Self {
            config,
            datagram: Some(datagram),
            stream,
        })
    }

    /// Returns the configuration this transport was built from.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the local datagram address.
    pub fn datagram_addr(&self) -> Result<SocketAddr> {
        self.datagram()?.local_addr()
    }

    /// Returns the local stream address.
    pub fn stream_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Sends a datagram to the configured peer.
    pub fn send_datagram(&mut self, payload: &[u8]) -> Result<()> {
        self.datagram_mut()?.send_datagram(payload)
    }

    /// Sends a datagram to `dest`.
    pub fn send_datagram_to(&mut self, payload: &[u8], dest: SocketAddr) -> Result<()> {
        self.datagram_mut()?.send_datagram_to(payload, dest)
    }

    /// Receives one datagram using the configured maximum size.
    pub fn receive_datagram(&mut self) -> Result<Datagram> {
        let max_size = self.config.max_datagram_size();
        self.receive_datagram_with(max_size)
    }

    /// Receives one datagram of at most `max_size` bytes, checksum included.
    pub fn receive_datagram_with(&mut self, max_size: usize) -> Result<Datagram> {
        self.datagram_mut()?.receive_datagram(max_size)
    }

    /// Opens the stream listener if it is not open yet (server role).
    ///
    /// Fails with [`Error::Closed`] once the transport has been closed.
    pub fn listen(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stream.listen()
    }

    /// Accepts one stream client if one arrives within the timeout.
    pub fn accept_once(&mut self) -> Result<Option<SocketAddr>> {
        self.stream.accept_once()
    }

    /// Connects the stream channel to its peer.
    ///
    /// Fails with [`Error::Closed`] once the transport has been closed.
    pub fn connect(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.stream.connect()
    }

    /// Sends one stream message.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.stream.send(payload)
    }

    /// Receives one stream message.
    pub fn receive(&mut self) -> Result<StreamMessage> {
        self.stream.receive()
    }

    /// Returns true if a stream connection is held.
    pub fn is_connected(&self) -> bool {
        self.stream.is_connected()
    }

    /// Returns the stream lifecycle state.
    pub fn stream_state(&self) -> StreamState {
        self.stream.state()
    }

    /// Returns the connected stream peer.
    pub fn stream_peer(&self) -> Option<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Returns datagram channel statistics, or `None` once closed.
    pub fn datagram_stats(&self) -> Option<&ChannelStats> {
        self.datagram.as_ref().map(DatagramChannel::stats)
    }

    /// Returns stream channel statistics.
    pub fn stream_stats(&self) -> &ChannelStats {
        self.stream.stats()
    }

    /// Releases both channels. Safe to call more than once.
    pub fn close(&mut self) {
        if self.datagram.take().is_some() {
            log::debug!("Datagram channel closed");
        }
        self.stream.close();
    }

    fn ensure_open(&self) -> Result<()> {
        self.datagram().map(|_| ())
    }

    fn datagram(&self) -> Result<&DatagramChannel> {
        self.datagram.as_ref().ok_or(Error::Closed)
    }

    fn datagram_mut(&mut self) -> Result<&mut DatagramChannel> {
        self.datagram.as_mut().ok_or(Error::Closed)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}
