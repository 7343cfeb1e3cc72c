//! Error types.
//!
//! Timeouts and corrupt frames are not errors: they are ordinary outcomes of
//! the receive calls. Everything here is either a contract violation caught
//! at construction or an operation the current state cannot perform, or a
//! platform socket failure.

use std::io;
use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of the stream channel an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// Listens and accepts.
    Server,
    /// Connects to a peer.
    Client,
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleKind::Server => write!(f, "server"),
            RoleKind::Client => write!(f, "client"),
        }
    }
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration contract violated
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stream operation issued without an active connection
    #[error("stream not connected; accept or connect first")]
    NotConnected,

    /// Accept issued before the listener was set up
    #[error("stream server is not listening")]
    NotListening,

    /// Operation belongs to the other stream role
    #[error("operation requires the {expected} role")]
    WrongRole {
        /// Role the operation needs
        expected: RoleKind,
    },

    /// Payload does not fit in one stream frame
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Largest payload allowed
        max: usize,
    },

    /// Peer went away while sending
    #[error("peer disconnected")]
    Disconnected,

    /// Transport already closed
    #[error("transport closed")]
    Closed,

    /// Socket failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Construction-time configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Both stream roles were requested
    #[error("choose either tcp_listen (server) or tcp_peer (client), not both")]
    ConflictingRoles,

    /// No stream role was requested
    #[error("a stream role is required: set tcp_listen (server) or tcp_peer (client)")]
    MissingRole,

    /// Datagram send without a destination
    #[error("no datagram peer: configure one or pass a destination")]
    NoDatagramPeer,

    /// A timeout of zero would make the socket block forever
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    /// Listen backlog out of range
    #[error("accept backlog must be between 1 and {max}, got {value}")]
    InvalidBacklog {
        /// Requested backlog
        value: u32,
        /// Largest accepted backlog
        max: u32,
    },

    /// Frame limit below the smallest possible frame
    #[error("{field} must be at least {min} bytes, got {value}")]
    LimitTooSmall {
        /// Setting name
        field: &'static str,
        /// Requested value
        value: usize,
        /// Smallest accepted value
        min: usize,
    },

    /// Address could not be parsed or resolved
    #[error("invalid address for {field}: {value:?}")]
    InvalidAddress {
        /// Setting name
        field: &'static str,
        /// Address as written
        value: String,
    },

    /// Settings file could not be read
    #[error("failed to read {path:?}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Settings file is not valid TOML for this schema
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}
