//! Transport configuration.
//!
//! A [`TransportConfig`] is assembled with [`TransportConfigBuilder`] and
//! validated once in [`TransportConfigBuilder::build`]; after that it cannot
//! change. The stream role is a [`StreamRole`] value, so a configuration that
//! is both server and client cannot be expressed.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::core::{DEFAULT_MAX_FRAME_SIZE, MIN_FRAME_LENGTH};
use crate::error::{ConfigError, RoleKind};

/// Default local datagram port.
pub const DEFAULT_DATAGRAM_PORT: u16 = 5005;

/// Default datagram receive timeout.
pub const DEFAULT_DATAGRAM_TIMEOUT: Duration = Duration::from_millis(50);

/// Default accept/connect/read/write timeout for the stream channel.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_millis(500);

/// Default accept backlog.
pub const DEFAULT_BACKLOG: u32 = 1;

/// Default receive buffer for one datagram, checksum included.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 2048;

/// Default `SO_SNDBUF` of the datagram socket.
pub const DEFAULT_SEND_BUFFER: usize = 1 << 16;

/// Role of the stream channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// Listen on `listen` and accept one peer at a time.
    Server {
        /// Listen address.
        listen: SocketAddr,
        /// Pending connection queue length.
        backlog: u32,
    },
    /// Connect to `peer`.
    Client {
        /// Peer address.
        peer: SocketAddr,
    },
}

impl StreamRole {
    /// Server role with the default backlog.
    pub fn server(listen: SocketAddr) -> Self {
        StreamRole::Server {
            listen,
            backlog: DEFAULT_BACKLOG,
        }
    }

    /// Client role.
    pub fn client(peer: SocketAddr) -> Self {
        StreamRole::Client { peer }
    }

    /// Returns the role without its addresses.
    pub fn kind(&self) -> RoleKind {
        match self {
            StreamRole::Server { .. } => RoleKind::Server,
            StreamRole::Client { .. } => RoleKind::Client,
        }
    }
}

/// Validated, immutable transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    datagram_bind: SocketAddr,
    datagram_peer: Option<SocketAddr>,
    datagram_timeout: Duration,
    max_datagram_size: usize,
    send_buffer: usize,
    role: StreamRole,
    stream_timeout: Duration,
    close_on_bad_checksum: bool,
    max_frame_size: usize,
}

impl TransportConfig {
    /// Starts a builder for the given stream role, with every other setting
    /// at its default.
    pub fn builder(role: StreamRole) -> TransportConfigBuilder {
        TransportConfigBuilder::new(role)
    }

    /// Local datagram address.
    pub fn datagram_bind(&self) -> SocketAddr {
        self.datagram_bind
    }

    /// Default datagram destination.
    pub fn datagram_peer(&self) -> Option<SocketAddr> {
        self.datagram_peer
    }

    /// Datagram receive timeout.
    pub fn datagram_timeout(&self) -> Duration {
        self.datagram_timeout
    }

    /// Datagram receive buffer size, checksum included.
    pub fn max_datagram_size(&self) -> usize {
        self.max_datagram_size
    }

    /// `SO_SNDBUF` of the datagram socket.
    pub fn send_buffer(&self) -> usize {
        self.send_buffer
    }

    /// Stream role.
    pub fn role(&self) -> StreamRole {
        self.role
    }

    /// Stream timeout.
    pub fn stream_timeout(&self) -> Duration {
        self.stream_timeout
    }

    /// Whether a corrupt stream frame tears down the connection.
    pub fn close_on_bad_checksum(&self) -> bool {
        self.close_on_bad_checksum
    }

    /// Largest accepted stream length prefix.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    /// Creates a builder with default settings.
    pub fn new(role: StreamRole) -> Self {
        Self {
            config: TransportConfig {
                datagram_bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_DATAGRAM_PORT)),
                datagram_peer: None,
                datagram_timeout: DEFAULT_DATAGRAM_TIMEOUT,
                max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
                send_buffer: DEFAULT_SEND_BUFFER,
                role,
                stream_timeout: DEFAULT_STREAM_TIMEOUT,
                close_on_bad_checksum: true,
                max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            },
        }
    }

    /// Sets the local datagram address.
    pub fn with_datagram_bind(mut self, addr: SocketAddr) -> Self {
        self.config.datagram_bind = addr;
        self
    }

    /// Sets the default datagram destination.
    pub fn with_datagram_peer(mut self, addr: SocketAddr) -> Self {
        self.config.datagram_peer = Some(addr);
        self
    }

    /// Sets the datagram receive timeout.
    pub fn with_datagram_timeout(mut self, timeout: Duration) -> Self {
        self.config.datagram_timeout = timeout;
        self
    }

    /// Sets the datagram receive buffer size.
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.config.max_datagram_size = size;
        self
    }

    /// Sets `SO_SNDBUF` of the datagram socket.
    pub fn with_send_buffer(mut self, size: usize) -> Self {
        self.config.send_buffer = size;
        self
    }

    /// Sets the stream timeout.
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.config.stream_timeout = timeout;
        self
    }

    /// Sets whether a corrupt stream frame closes the connection.
    pub fn with_close_on_bad_checksum(mut self, close: bool) -> Self {
        self.config.close_on_bad_checksum = close;
        self
    }

    /// Sets the largest accepted stream length prefix.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<TransportConfig, ConfigError> {
        let config = self.config;

        if config.datagram_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("datagram timeout"));
        }
        if config.stream_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("stream timeout"));
        }
        if let StreamRole::Server { backlog, .. } = config.role {
            let max = i32::MAX as u32;
            if backlog == 0 || backlog > max {
                return Err(ConfigError::InvalidBacklog {
                    value: backlog,
                    max,
                });
            }
        }
        if config.max_frame_size < MIN_FRAME_LENGTH {
            return Err(ConfigError::LimitTooSmall {
                field: "max frame size",
                value: config.max_frame_size,
                min: MIN_FRAME_LENGTH,
            });
        }
        if config.max_datagram_size < MIN_FRAME_LENGTH {
            return Err(ConfigError::LimitTooSmall {
                field: "max datagram size",
                value: config.max_datagram_size,
                min: MIN_FRAME_LENGTH,
            });
        }

        Ok(config)
    }
}
