// Wrapper for a packet being decoded

use crate::rtmp::RtmpPacket;

/// Wrapper for a packet
/// Contains a packet alongside the chunk decoding state for its chunk stream
#[derive(Clone)]
pub struct RtmpPacketWrapper {
    /// The packet
    pub packet: RtmpPacket,

    /// Clock value (accumulated absolute timestamp)
    pub clock: i64,

    /// Current packet size (received payload bytes)
    pub bytes: usize,

    /// True if a message was started on this chunk stream
    pub used: bool,

    /// True if the last message header carried an extended timestamp,
    /// continuation chunks then carry it too
    pub has_extended_timestamp: bool,
}

impl RtmpPacketWrapper {
    /// Creates new RtmpPacketWrapper
    pub fn new() -> RtmpPacketWrapper {
        RtmpPacketWrapper {
            packet: RtmpPacket::new_blank(),
            clock: 0,
            bytes: 0,
            used: false,
            has_extended_timestamp: false,
        }
    }

    /// Resets the payload state, keeping the header context
    pub fn reset(&mut self) {
        self.packet.reset_payload();
        self.bytes = 0;
    }

    /// Fully resets the packet wrapper
    pub fn reset_full(&mut self) {
        self.clock = 0;
        self.bytes = 0;
        self.used = false;
        self.has_extended_timestamp = false;

        self.packet.reset();
    }
}

impl Default for RtmpPacketWrapper {
    fn default() -> Self {
        Self::new()
    }
}
