//! # NodeLink - Point-to-Point Transport for Cooperating Nodes
//!
//! NodeLink connects two nodes (for example a robot's controller unit and its
//! compute unit) over a local network and moves opaque byte payloads between
//! them in two ways:
//!
//! - **Datagrams**: best-effort, low-latency UDP for frequent, loss-tolerant
//!   telemetry and control values
//! - **Stream messages**: length-prefixed frames over one TCP connection for
//!   commands and status that must not be lost
//! - **CRC32 checksum**: every payload in both modes is verified on receipt;
//!   corrupt data is dropped, never delivered
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                  Transport (facade)                      │
//! │  ┌──────────────────────┐  ┌──────────────────────────┐ │
//! │  │   DatagramChannel    │  │      StreamChannel       │ │
//! │  │  payload ‖ crc32     │  │ len ‖ payload ‖ crc32    │ │
//! │  └──────────────────────┘  └──────────────────────────┘ │
//! ├─────────────────────────────────────────────────────────┤
//! │              Core: Crc32 codec, frame reader             │
//! ├─────────────────────────────────────────────────────────┤
//! │                std UDP / TCP sockets (socket2)           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All operations are blocking and bounded by the configured timeouts.
//! Timeouts and corrupt messages are returned as ordinary outcomes
//! ([`Datagram`], [`StreamMessage`]); only misuse and socket failures are
//! errors.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nodelink::{StreamMessage, StreamRole, Transport, TransportConfig};
//!
//! let config = TransportConfig::builder(StreamRole::server("0.0.0.0:5006".parse()?)).build()?;
//! let mut link = Transport::new(config)?;
//!
//! loop {
//!     if !link.is_connected() {
//!         link.accept_once()?;
//!         continue;
//!     }
//!     match link.receive()? {
//!         StreamMessage::Message(cmd) => println!("command: {:?}", cmd),
//!         StreamMessage::TimedOut => {}
//!         StreamMessage::Disconnected | StreamMessage::Corrupt(_) => {}
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod datagram;
pub mod error;
pub mod io;
pub mod settings;
pub mod stats;
pub mod stream;
pub mod transport;

// Re-export commonly used types
pub use config::{StreamRole, TransportConfig, TransportConfigBuilder};
pub use crate::core::{CHECKSUM_SIZE, CorruptFrame, Crc32, LENGTH_PREFIX_SIZE};
pub use datagram::{Datagram, DatagramChannel};
pub use error::{ConfigError, Error, Result, RoleKind};
pub use settings::LinkSettings;
pub use stats::ChannelStats;
pub use stream::{StreamChannel, StreamMessage, StreamState};
pub use transport::Transport;
