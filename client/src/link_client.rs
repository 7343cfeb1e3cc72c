use std::thread;
use std::time::{Duration, Instant};

use log::*;
use nodelink::{Error, StreamMessage, Transport, TransportConfig};

const CYCLE: Duration = Duration::from_millis(200);

/// How long to wait for the server's acknowledgement of one command.
const ACK_WAIT: Duration = Duration::from_secs(2);

pub struct LinkClient {
    link: Transport,
}

impl LinkClient {
    pub fn new(config: TransportConfig) -> nodelink::Result<Self> {
        let link = Transport::new(config)?;
        info!("Client datagram socket bound to {}", link.datagram_addr()?);
        Ok(Self { link })
    }

    /// Runs the send cycle until a non-recoverable error occurs.
    pub fn run(&mut self) -> nodelink::Result<()> {
        for i in 0u64.. {
            let started = Instant::now();

            match self.link.send_datagram(format!("hello-udp-{i}").as_bytes()) {
                Ok(()) => {}
                Err(Error::Io(e)) => warn!("[udp] send failed: {}", e),
                Err(e) => return Err(e),
            }

            if !self.link.is_connected() {
                match self.link.connect() {
                    Ok(()) => info!("Connected to server"),
                    Err(Error::Io(e)) => warn!("Connect failed: {}", e),
                    Err(e) => return Err(e),
                }
            }

            if self.link.is_connected() {
                self.exchange(&format!("cmd:ping-{i}"))?;
            }

            if let Some(rest) = CYCLE.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        Ok(())
    }

    /// Sends one command and waits for its acknowledgement.
    fn exchange(&mut self, command: &str) -> nodelink::Result<()> {
        match self.link.send(command.as_bytes()) {
            Ok(()) => {}
            Err(Error::Disconnected | Error::Io(_)) => {
                warn!("[tcp] send failed, reconnecting next cycle");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let deadline = Instant::now() + ACK_WAIT;
        while Instant::now() < deadline {
            match self.link.receive() {
                Ok(StreamMessage::Message(reply)) => {
                    info!("[tcp] {}", String::from_utf8_lossy(&reply));
                    return Ok(());
                }
                Ok(StreamMessage::TimedOut) => continue,
                Ok(StreamMessage::Disconnected) => {
                    warn!("[tcp] server disconnected");
                    return Ok(());
                }
                Ok(StreamMessage::Corrupt(reason)) => {
                    warn!("[tcp] corrupt reply: {:?}", reason);
                    return Ok(());
                }
                Err(Error::Io(e)) => {
                    warn!("[tcp] receive failed: {}", e);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
        warn!("[tcp] no acknowledgement for {}", command);
        Ok(())
    }
}
