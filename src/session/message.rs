// Messages sent to the session writer task

use std::sync::Arc;

use crate::rtmp::RtmpPacket;

/// RTMP session message
#[derive(Clone)]
pub enum RtmpSessionMessage {
    /// Start burst for a player: metadata, codec headers and GOP replay
    PlayStart {
        metadata: Arc<Vec<u8>>,
        audio_codec: u32,
        aac_sequence_header: Arc<Vec<u8>>,
        video_codec: u32,
        avc_sequence_header: Arc<Vec<u8>>,
        gop_cache: Vec<Arc<RtmpPacket>>,
    },

    /// Updated stream metadata
    PlayMetadata { metadata: Arc<Vec<u8>> },

    /// A live media packet
    PlayPacket { packet: Arc<RtmpPacket> },

    /// The publisher went away
    PlayStop,

    /// Ends the writer task
    End,
}
