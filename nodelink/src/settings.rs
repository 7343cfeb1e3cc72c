//! File form of the transport configuration.
//!
//! Loads settings from a TOML file. Every key is optional; missing keys take
//! the same defaults as [`TransportConfigBuilder`](crate::config::TransportConfigBuilder). Exactly one of
//! `tcp_listen` and `tcp_peer` must be present.
//!
//! ```toml
//! udp_bind = "0.0.0.0:5005"
//! udp_peer = "10.42.0.86:5005"
//! tcp_peer = "10.42.0.86:5006"
//! udp_timeout_ms = 50
//! tcp_timeout_ms = 500
//! tcp_close_on_bad_crc = true
//! ```

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{
    DEFAULT_BACKLOG, DEFAULT_DATAGRAM_PORT, DEFAULT_DATAGRAM_TIMEOUT, DEFAULT_MAX_DATAGRAM_SIZE,
    DEFAULT_SEND_BUFFER, DEFAULT_STREAM_TIMEOUT, StreamRole, TransportConfig,
};
use crate::core::DEFAULT_MAX_FRAME_SIZE;
use crate::error::ConfigError;

/// Transport settings as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSettings {
    /// Where datagrams are received.
    pub udp_bind: String,
    /// Default datagram destination.
    pub udp_peer: Option<String>,
    /// Stream server listen address (server role).
    pub tcp_listen: Option<String>,
    /// Stream peer address (client role).
    pub tcp_peer: Option<String>,
    /// Datagram receive timeout in milliseconds.
    pub udp_timeout_ms: u64,
    /// Accept/connect/read/write timeout in milliseconds.
    pub tcp_timeout_ms: u64,
    /// Pending connection queue length (server role).
    pub tcp_backlog: u32,
    /// Tear the stream down when a frame fails verification.
    pub tcp_close_on_bad_crc: bool,
    /// Largest accepted stream length prefix.
    pub max_frame_size: usize,
    /// Datagram receive buffer, checksum included.
    pub max_datagram_size: usize,
    /// `SO_SNDBUF` of the datagram socket.
    pub udp_send_buffer: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            udp_bind: format!("0.0.0.0:{DEFAULT_DATAGRAM_PORT}"),
            udp_peer: None,
            tcp_listen: None,
            tcp_peer: None,
            udp_timeout_ms: DEFAULT_DATAGRAM_TIMEOUT.as_millis() as u64,
            tcp_timeout_ms: DEFAULT_STREAM_TIMEOUT.as_millis() as u64,
            tcp_backlog: DEFAULT_BACKLOG,
            tcp_close_on_bad_crc: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            udp_send_buffer: DEFAULT_SEND_BUFFER,
        }
    }
}

impl LinkSettings {
    /// Loads settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolves addresses and validates the settings.
    pub fn into_config(self) -> Result<TransportConfig, ConfigError> {
        let role = match (&self.tcp_listen, &self.tcp_peer) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingRoles),
            (None, None) => return Err(ConfigError::MissingRole),
            (Some(listen), None) => StreamRole::Server {
                listen: resolve("tcp_listen", listen)?,
                backlog: self.tcp_backlog,
            },
            (None, Some(peer)) => StreamRole::Client {
                peer: resolve("tcp_peer", peer)?,
            },
        };

        let mut builder = TransportConfig::builder(role)
            .with_datagram_bind(resolve("udp_bind", &self.udp_bind)?)
            .with_datagram_timeout(Duration::from_millis(self.udp_timeout_ms))
            .with_stream_timeout(Duration::from_millis(self.tcp_timeout_ms))
            .with_close_on_bad_checksum(self.tcp_close_on_bad_crc)
            .with_max_frame_size(self.max_frame_size)
            .with_max_datagram_size(self.max_datagram_size)
            .with_send_buffer(self.udp_send_buffer);
        if let Some(peer) = &self.udp_peer {
            builder = builder.with_datagram_peer(resolve("udp_peer", peer)?);
        }
        builder.build()
    }
}

/// Resolves `host:port`, taking the first address the resolver returns.
fn resolve(field: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = || ConfigError::InvalidAddress {
        field,
        value: value.to_string(),
    };
    value
        .to_socket_addrs()
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoleKind;

    #[test]
    fn test_client_settings() {
        let settings = LinkSettings::from_toml(
            r#"
            udp_peer = "127.0.0.1:5005"
            tcp_peer = "127.0.0.1:5006"
            udp_timeout_ms = 20
            tcp_close_on_bad_crc = false
            "#,
        )
        .unwrap();
        let config = settings.into_config().unwrap();

        assert_eq!(config.role(), StreamRole::client("127.0.0.1:5006".parse().unwrap()));
        assert_eq!(config.datagram_peer(), Some("127.0.0.1:5005".parse().unwrap()));
        assert_eq!(config.datagram_timeout(), Duration::from_millis(20));
        assert_eq!(config.stream_timeout(), Duration::from_millis(500));
        assert!(!config.close_on_bad_checksum());
    }

    #[test]
    fn test_server_settings_with_backlog() {
        let settings = LinkSettings::from_toml(
            r#"
            udp_bind = "127.0.0.1:0"
            tcp_listen = "0.0.0.0:5006"
            tcp_backlog = 4
            "#,
        )
        .unwrap();
        let config = settings.into_config().unwrap();
        assert_eq!(config.role().kind(), RoleKind::Server);
        assert!(matches!(config.role(), StreamRole::Server { backlog: 4, .. }));
    }

    #[test]
    fn test_both_roles_rejected() {
        let settings = LinkSettings {
            tcp_listen: Some("0.0.0.0:5006".into()),
            tcp_peer: Some("127.0.0.1:5006".into()),
            ..LinkSettings::default()
        };
        assert!(matches!(
            settings.into_config(),
            Err(ConfigError::ConflictingRoles)
        ));
    }

    #[test]
    fn test_no_role_rejected() {
        assert!(matches!(
            LinkSettings::default().into_config(),
            Err(ConfigError::MissingRole)
        ));
    }

    #[test]
    fn test_bad_address() {
        let settings = LinkSettings {
            tcp_peer: Some("not an address".into()),
            ..LinkSettings::default()
        };
        assert!(matches!(
            settings.into_config(),
            Err(ConfigError::InvalidAddress { field: "tcp_peer", .. })
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            LinkSettings::from_toml("tcp_peer = \"127.0.0.1:1\"\nbogus = 1\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = LinkSettings::load("/nonexistent/nodelink.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
