//! Per-channel traffic counters.

/// Statistics about one channel's operation.
///
/// Counters only grow; they survive reconnects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Messages sent.
    pub messages_sent: u64,

    /// Messages received and verified.
    pub messages_received: u64,

    /// Bytes sent (payload only).
    pub bytes_sent: u64,

    /// Bytes received (payload only).
    pub bytes_received: u64,

    /// Messages dropped because they failed verification.
    pub corrupt_dropped: u64,

    /// Receive calls that timed out without data.
    pub timeouts: u64,

    /// Connections torn down because the peer went away.
    pub disconnects: u64,
}

impl ChannelStats {
    pub(crate) fn record_sent(&mut self, payload_len: usize) {
        self.messages_sent += 1;
        self.bytes_sent += payload_len as u64;
    }

    pub(crate) fn record_received(&mut self, payload_len: usize) {
        self.messages_received += 1;
        self.bytes_received += payload_len as u64;
    }
}
