//! Reliable message channel over a single TCP connection.
//!
//! Messages are length-prefixed frames carrying a CRC32 (see
//! [`crate::core::encode`]). The channel plays exactly one role, fixed at
//! construction:
//!
//! ```text
//!            listen()              accept_once()
//! Unbound ───────────► Listening ───────────────► Connected ──┐
//!                          ▲                          │       │ close()
//!                          └──────── disconnect ──────┘       ▼
//!                                                           Closed
//!                          connect()
//! AwaitingConnect ─────────────────────────────────► Connected
//!        ▲                                              │
//!        └─────────────────── disconnect ───────────────┘
//! ```
//!
//! Reconnection is always driven by the caller: a server accepts again, a
//! client calls [`StreamChannel::connect`] again. Only one connection is held
//! at a time; accepting or connecting replaces the previous one.

use std::io::{self, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::{StreamRole, TransportConfig};
use crate::core::{CorruptFrame, Decoded, FrameReader, encode};
use crate::error::{Error, Result, RoleKind};
use crate::io::{is_disconnect, is_wait_expired};
use crate::stats::ChannelStats;

/// Outcome of a stream receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// A complete, verified payload.
    Message(Vec<u8>),
    /// No complete message within the timeout. The connection stays open and
    /// any partial frame is kept for the next call.
    TimedOut,
    /// The peer closed the connection; the local side has been torn down.
    Disconnected,
    /// A frame failed verification and was discarded.
    Corrupt(CorruptFrame),
}

/// Observable lifecycle state of a [`StreamChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Server role before `listen()`.
    Unbound,
    /// Server role, ready to accept.
    Listening,
    /// Client role, ready to connect.
    AwaitingConnect,
    /// A peer connection is held.
    Connected,
    /// Explicitly closed.
    Closed,
}

/// The live connection and its partially decoded input.
#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    reader: FrameReader,
}

impl Connection {
    fn open(stream: TcpStream, peer: SocketAddr, timeout: Duration, max_frame_size: usize) -> io::Result<Self> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(Self {
            stream,
            peer,
            reader: FrameReader::new(max_frame_size),
        })
    }

    fn close(self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("Shutdown of connection to {} failed: {}", self.peer, e);
        }
    }
}

/// Everything the channel currently holds, replaced as a whole on every
/// transition.
#[derive(Debug)]
enum Endpoint {
    Unbound,
    Listening(Socket),
    AwaitingConnect,
    Connected {
        listener: Option<Socket>,
        conn: Connection,
    },
    Closed,
}

/// One TCP endpoint in either the server or the client role.
#[derive(Debug)]
pub struct StreamChannel {
    role: StreamRole,
    timeout: Duration,
    close_on_bad_checksum: bool,
    max_frame_size: usize,
    endpoint: Endpoint,
    stats: ChannelStats,
}

impl StreamChannel {
    /// Creates a channel. No socket is opened until [`listen`](Self::listen)
    /// or [`connect`](Self::connect).
    pub fn new(
        role: StreamRole,
        timeout: Duration,
        close_on_bad_checksum: bool,
        max_frame_size: usize,
    ) -> Self {
        let endpoint = match role {
            StreamRole::Server { .. } => Endpoint::Unbound,
            StreamRole::Client { .. } => Endpoint::AwaitingConnect,
        };
        Self {
            role,
            timeout,
            close_on_bad_checksum,
            max_frame_size,
            endpoint,
            stats: ChannelStats::default(),
        }
    }

    /// Creates a channel from the stream part of `config`.
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config.role(),
            config.stream_timeout(),
            config.close_on_bad_checksum(),
            config.max_frame_size(),
        )
    }

    /// Returns the configured role.
    pub fn role(&self) -> StreamRole {
        self.role
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> StreamState {
        match self.endpoint {
            Endpoint::Unbound => StreamState::Unbound,
            Endpoint::Listening(_) => StreamState::Listening,
            Endpoint::AwaitingConnect => StreamState::AwaitingConnect,
            Endpoint::Connected { .. } => StreamState::Connected,
            Endpoint::Closed => StreamState::Closed,
        }
    }

    /// Returns true if a connection is currently held.
    pub fn is_connected(&self) -> bool {
        matches!(self.endpoint, Endpoint::Connected { .. })
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.endpoint {
            Endpoint::Connected { conn, .. } => Some(conn.peer),
            _ => None,
        }
    }

    /// Returns the local address: the listener's in the server role, the
    /// connection's in the client role.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        if let Some(listener) = self.listener() {
            return listener
                .local_addr()?
                .as_socket()
                .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "listener has no inet address").into());
        }
        match &self.endpoint {
            Endpoint::Connected { conn, .. } => Ok(conn.stream.local_addr()?),
            _ => Err(Error::NotConnected),
        }
    }

    /// Returns the channel statistics.
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Binds and listens (server role). Listening twice is a no-op.
    pub fn listen(&mut self) -> Result<()> {
        let StreamRole::Server { listen, backlog } = self.role else {
            return Err(Error::WrongRole {
                expected: RoleKind::Server,
            });
        };
        if self.listener().is_some() {
            return Ok(());
        }

        let socket = Socket::new(Domain::for_address(listen), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&listen.into())?;
        socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
        // SO_RCVTIMEO bounds accept() as well as reads.
        socket.set_read_timeout(Some(self.timeout))?;

        log::info!("Stream server listening on {}", listen);
        self.endpoint = Endpoint::Listening(socket);
        Ok(())
    }

    /// Waits up to the timeout for one client (server role).
    ///
    /// Returns `None` if nobody connected in time, leaving any current
    /// connection untouched. On success the new connection replaces the
    /// previous one.
    pub fn accept_once(&mut self) -> Result<Option<SocketAddr>> {
        if self.role.kind() != RoleKind::Server {
            return Err(Error::WrongRole {
                expected: RoleKind::Server,
            });
        }
        let accepted = match self.listener() {
            Some(listener) => listener.accept(),
            None => return Err(Error::NotListening),
        };

        let (socket, addr) = match accepted {
            Ok(pair) => pair,
            Err(e) if is_wait_expired(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stream: TcpStream = socket.into();
        let peer = match addr.as_socket() {
            Some(peer) => peer,
            None => stream.peer_addr()?,
        };
        let conn = Connection::open(stream, peer, self.timeout, self.max_frame_size)?;

        let listener = match std::mem::replace(&mut self.endpoint, Endpoint::Closed) {
            Endpoint::Listening(listener) => listener,
            Endpoint::Connected {
                listener: Some(listener),
                conn: prior,
            } => {
                log::info!("Replacing connection to {} with {}", prior.peer, peer);
                prior.close();
                listener
            }
            other => {
                self.endpoint = other;
                return Err(Error::NotListening);
            }
        };

        log::info!("Accepted stream connection from {}", peer);
        self.endpoint = Endpoint::Connected {
            listener: Some(listener),
            conn,
        };
        Ok(Some(peer))
    }

    /// Connects to the configured peer (client role).
    ///
    /// Any current connection is closed first. Failures are returned as is;
    /// retrying is up to the caller.
    pub fn connect(&mut self) -> Result<()> {
        let StreamRole::Client { peer } = self.role else {
            return Err(Error::WrongRole {
                expected: RoleKind::Client,
            });
        };

        if let Endpoint::Connected { conn, .. } =
            std::mem::replace(&mut self.endpoint, Endpoint::AwaitingConnect)
        {
            conn.close();
        }

        let stream = TcpStream::connect_timeout(&peer, self.timeout)?;
        let conn = Connection::open(stream, peer, self.timeout, self.max_frame_size)?;

        log::info!("Connected to stream server {}", peer);
        self.endpoint = Endpoint::Connected {
            listener: None,
            conn,
        };
        Ok(())
    }

    /// Sends one framed message.
    ///
    /// The whole frame goes out in a single `write_all`. If the write fails
    /// the connection is torn down, since a partial frame may be on the wire.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let max_frame_size = self.max_frame_size;
        let conn = self.connection_mut().ok_or(Error::NotConnected)?;
        let frame = encode(payload, max_frame_size)?;

        match conn.stream.write_all(&frame) {
            Ok(()) => {
                log::trace!("Sent stream message to {}: {} bytes", conn.peer, payload.len());
                self.stats.record_sent(payload.len());
                Ok(())
            }
            Err(e) if is_disconnect(&e) => {
                log::info!("Peer {} disconnected during send: {}", conn.peer, e);
                self.stats.disconnects += 1;
                self.teardown();
                Err(Error::Disconnected)
            }
            Err(e) => {
                log::warn!("Send to {} failed, closing connection: {}", conn.peer, e);
                self.teardown();
                Err(e.into())
            }
        }
    }

    /// Receives one framed message, blocking up to the timeout per read.
    pub fn receive(&mut self) -> Result<StreamMessage> {
        let conn = self.connection_mut().ok_or(Error::NotConnected)?;
        let peer = conn.peer;

        let decoded = match conn.reader.read_frame(&mut conn.stream) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Receive from {} failed, closing connection: {}", peer, e);
                self.teardown();
                return Err(e.into());
            }
        };

        match decoded {
            Decoded::Payload(payload) => {
                log::trace!("Received stream message from {}: {} bytes", peer, payload.len());
                self.stats.record_received(payload.len());
                Ok(StreamMessage::Message(payload))
            }
            Decoded::Pending => {
                self.stats.timeouts += 1;
                Ok(StreamMessage::TimedOut)
            }
            Decoded::Closed => {
                log::info!("Peer {} disconnected", peer);
                self.stats.disconnects += 1;
                self.teardown();
                Ok(StreamMessage::Disconnected)
            }
            Decoded::Corrupt(reason) => {
                self.stats.corrupt_dropped += 1;
                if self.close_on_bad_checksum {
                    log::warn!("Corrupt frame from {} ({:?}), closing connection", peer, reason);
                    self.teardown();
                } else {
                    log::warn!("Corrupt frame from {} ({:?}), dropped", peer, reason);
                }
                Ok(StreamMessage::Corrupt(reason))
            }
        }
    }

    /// Releases the connection and, in the server role, the listener.
    /// Calling it again does nothing.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.endpoint, Endpoint::Closed) {
            Endpoint::Connected { conn, .. } => {
                log::debug!("Closing stream connection to {}", conn.peer);
                conn.close();
            }
            Endpoint::Listening(_) => log::debug!("Closing stream listener"),
            Endpoint::Unbound | Endpoint::AwaitingConnect | Endpoint::Closed => {}
        }
    }

    fn listener(&self) -> Option<&Socket> {
        match &self.endpoint {
            Endpoint::Listening(listener) => Some(listener),
            Endpoint::Connected {
                listener: Some(listener),
                ..
            } => Some(listener),
            _ => None,
        }
    }

    fn connection_mut(&mut self) -> Option<&mut Connection> {
        match &mut self.endpoint {
            Endpoint::Connected { conn, .. } => Some(conn),
            _ => None,
        }
    }

    /// Drops the connection and returns to the state a new one can start
    /// from: Listening for a server, AwaitingConnect for a client.
    fn teardown(&mut self) {
        let next = match std::mem::replace(&mut self.endpoint, Endpoint::Closed) {
            Endpoint::Connected { listener, conn } => {
                conn.close();
                match listener {
                    Some(listener) => Endpoint::Listening(listener),
                    None => Endpoint::AwaitingConnect,
                }
            }
            other => other,
        };
        self.endpoint = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn client() -> StreamChannel {
        StreamChannel::new(StreamRole::client(local(1)), Duration::from_millis(100), true, 1024)
    }

    fn server() -> StreamChannel {
        StreamChannel::new(StreamRole::server(local(0)), Duration::from_millis(100), true, 1024)
    }

    #[test]
    fn test_initial_states() {
        assert_eq!(server().state(), StreamState::Unbound);
        assert_eq!(client().state(), StreamState::AwaitingConnect);
        assert!(!client().is_connected());
        assert_eq!(client().peer_addr(), None);
    }

    #[test]
    fn test_role_checks() {
        let mut client = client();
        assert!(matches!(
            client.listen(),
            Err(Error::WrongRole {
                expected: RoleKind::Server
            })
        ));
        assert!(matches!(
            client.accept_once(),
            Err(Error::WrongRole {
                expected: RoleKind::Server
            })
        ));

        let mut server = server();
        assert!(matches!(
            server.connect(),
            Err(Error::WrongRole {
                expected: RoleKind::Client
            })
        ));
    }

    #[test]
    fn test_accept_before_listen() {
        assert!(matches!(server().accept_once(), Err(Error::NotListening)));
    }

    #[test]
    fn test_io_requires_connection() {
        let mut channel = client();
        assert!(matches!(channel.send(b"x"), Err(Error::NotConnected)));
        assert!(matches!(channel.receive(), Err(Error::NotConnected)));
        assert!(matches!(channel.local_addr(), Err(Error::NotConnected)));
    }

    #[test]
    fn test_listen_then_close() {
        let mut channel = server();
        channel.listen().unwrap();
        assert_eq!(channel.state(), StreamState::Listening);
        assert_ne!(channel.local_addr().unwrap().port(), 0);

        channel.listen().unwrap();
        assert_eq!(channel.state(), StreamState::Listening);

        channel.close();
        assert_eq!(channel.state(), StreamState::Closed);
        channel.close();
        assert_eq!(channel.state(), StreamState::Closed);
        assert!(matches!(channel.accept_once(), Err(Error::NotListening)));
    }

    #[test]
    fn test_accept_times_out() {
        let mut channel = server();
        channel.listen().unwrap();
        assert_eq!(channel.accept_once().unwrap(), None);
        assert_eq!(channel.state(), StreamState::Listening);
    }
}
