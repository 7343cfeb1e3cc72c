use log::*;
use nodelink::{Datagram, StreamMessage, Transport, TransportConfig};

pub struct LinkServer {
    link: Transport,
}

impl LinkServer {
    pub fn new(config: TransportConfig) -> nodelink::Result<Self> {
        let link = Transport::new(config)?;
        info!(
            "Server listening on TCP {} and UDP {}",
            link.stream_addr()?,
            link.datagram_addr()?
        );
        Ok(Self { link })
    }

    /// Serves clients until a socket error occurs.
    pub fn run(&mut self) -> nodelink::Result<()> {
        loop {
            if !self.link.is_connected() {
                if let Some(peer) = self.link.accept_once()? {
                    info!("Accepted TCP connection from {}", peer);
                }
            }

            self.drain_datagrams()?;

            if self.link.is_connected() {
                self.serve_stream()?;
            }
        }
    }

    /// Logs every datagram that is already waiting, stopping at the first
    /// timeout.
    fn drain_datagrams(&mut self) -> nodelink::Result<()> {
        loop {
            match self.link.receive_datagram()? {
                Datagram::Received { payload, from } => {
                    info!(
                        "[udp] {} bytes from {}: {}",
                        payload.len(),
                        from,
                        String::from_utf8_lossy(&payload)
                    );
                }
                Datagram::Corrupt { from } => warn!("[udp] dropped corrupt datagram from {}", from),
                Datagram::TimedOut => return Ok(()),
            }
        }
    }

    fn serve_stream(&mut self) -> nodelink::Result<()> {
        let message = match self.link.receive() {
            Ok(message) => message,
            Err(nodelink::Error::Io(e)) => {
                error!("[tcp] receive failed, waiting for a new client: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match message {
            StreamMessage::Message(payload) => {
                info!("[tcp] {}", String::from_utf8_lossy(&payload));
                let mut reply = b"ack:".to_vec();
                reply.extend_from_slice(&payload);
                if let Err(e) = self.link.send(&reply) {
                    error!("[tcp] failed to send acknowledgement: {}", e);
                }
            }
            StreamMessage::TimedOut => {}
            StreamMessage::Disconnected => info!("[tcp] client disconnected"),
            StreamMessage::Corrupt(reason) => warn!("[tcp] corrupt frame: {:?}", reason),
        }
        Ok(())
    }
}
