//! Shared helpers for loopback integration tests

#![allow(dead_code)]

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use nodelink::{Crc32, StreamMessage, StreamRole, Transport, TransportConfig, TransportConfigBuilder};

pub fn loopback() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

/// Server-side builder bound to ephemeral loopback ports.
pub fn server_builder() -> TransportConfigBuilder {
    TransportConfig::builder(StreamRole::server(loopback()))
        .with_datagram_bind(loopback())
        .with_stream_timeout(Duration::from_millis(200))
}

pub fn server() -> Transport {
    Transport::new(server_builder().build().unwrap()).unwrap()
}

/// Client transport pointed at `server`'s stream and datagram sockets.
pub fn client_for(server: &Transport) -> Transport {
    let config = TransportConfig::builder(StreamRole::client(server.stream_addr().unwrap()))
        .with_datagram_bind(loopback())
        .with_datagram_peer(server.datagram_addr().unwrap())
        .with_stream_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    Transport::new(config).unwrap()
}

/// Accepts until a client shows up or two seconds pass.
pub fn accept(server: &mut Transport) -> SocketAddr {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if let Some(peer) = server.accept_once().unwrap() {
            return peer;
        }
    }
    panic!("no client connected");
}

/// Opens a raw TCP connection to `server` and accepts it, so the test can
/// write arbitrary bytes.
pub fn raw_peer(server: &mut Transport) -> TcpStream {
    let stream = TcpStream::connect(server.stream_addr().unwrap()).unwrap();
    let peer = accept(server);
    assert_eq!(peer, stream.local_addr().unwrap());
    stream
}

/// Receives until something other than a timeout arrives.
pub fn receive(link: &mut Transport) -> StreamMessage {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match link.receive().unwrap() {
            StreamMessage::TimedOut if Instant::now() < deadline => continue,
            other => return other,
        }
    }
}

/// Encodes a stream frame by hand.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = ((payload.len() + 4) as u32).to_be_bytes().to_vec();
    out.extend(Crc32::append(payload));
    out
}

pub fn write(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).unwrap();
    stream.flush().unwrap();
}
