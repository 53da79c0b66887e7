// RTMP session status models

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::rtmp::{RtmpPacket, RTMP_CODEC_ID_AAC, RTMP_CODEC_ID_H264, RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO};

use super::RtmpSessionMessage;

/// Play status of a session
#[derive(Clone)]
pub struct RtmpSessionPlayStatus {
    /// True if the session is a player
    pub is_player: bool,

    /// ID of the RTMP stream used to play
    pub play_stream_id: u32,

    /// True for the player to receive the GOP cache replay
    pub receive_gop: bool,

    /// True to receive audio packets
    pub receive_audio: bool,

    /// True to receive video packets
    pub receive_video: bool,

    /// True once the player observed a keyframe
    pub has_keyframe: bool,
}

impl RtmpSessionPlayStatus {
    pub fn new() -> RtmpSessionPlayStatus {
        RtmpSessionPlayStatus {
            is_player: false,
            play_stream_id: 0,
            receive_gop: true,
            receive_audio: true,
            receive_video: true,
            has_keyframe: false,
        }
    }
}

impl Default for RtmpSessionPlayStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// RTMP session status
pub struct RtmpSessionStatus {
    /// App name, set by the connect command
    pub app: Option<String>,

    /// Unix timestamp (seconds) when the connect command was received
    pub connect_time: i64,

    /// Counter of streams created by the peer
    pub streams: u64,

    /// True if the session is a publisher
    pub is_publisher: bool,

    /// ID of the RTMP stream used to publish
    pub publish_stream_id: u32,

    /// Play status
    pub play_status: RtmpSessionPlayStatus,

    /// Stream name
    pub key: Option<String>,

    /// Full stream path: /app/stream_name
    pub stream_path: Option<String>,

    /// True if the session was killed
    pub killed: bool,
}

impl RtmpSessionStatus {
    pub fn new() -> RtmpSessionStatus {
        RtmpSessionStatus {
            app: None,
            connect_time: 0,
            streams: 0,
            is_publisher: false,
            publish_stream_id: 0,
            play_status: RtmpSessionPlayStatus::new(),
            key: None,
            stream_path: None,
            killed: false,
        }
    }
}

impl Default for RtmpSessionStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Status of the stream being published by a session
pub struct RtmpSessionPublishStreamStatus {
    /// Clock value (absolute timestamp of the last media packet)
    pub clock: i64,

    /// Video codec ID
    pub video_codec: u32,

    /// Audio codec ID
    pub audio_codec: u32,

    /// Stream metadata (encoded onMetaData message payload)
    pub metadata: Arc<Vec<u8>>,

    /// AVC sequence header
    pub avc_sequence_header: Arc<Vec<u8>>,

    /// AAC sequence header
    pub aac_sequence_header: Arc<Vec<u8>>,

    /// GOP cache: gop index -> frames of the group
    /// Holds at most 2 entries: the completed group and the one in progress
    pub gop_cache: BTreeMap<u64, Vec<Arc<RtmpPacket>>>,

    /// Index of the group in progress
    pub gop_index: u64,
}

impl RtmpSessionPublishStreamStatus {
    pub fn new() -> RtmpSessionPublishStreamStatus {
        RtmpSessionPublishStreamStatus {
            clock: 0,
            video_codec: 0,
            audio_codec: 0,
            metadata: Arc::new(Vec::new()),
            avc_sequence_header: Arc::new(Vec::new()),
            aac_sequence_header: Arc::new(Vec::new()),
            gop_cache: BTreeMap::new(),
            gop_index: 0,
        }
    }

    /// Clears the GOP cache
    pub fn clear_gop(&mut self) {
        self.gop_cache.clear();
    }

    /// Resets the status for a fresh publishing stream
    pub fn reset(&mut self) {
        self.clock = 0;
        self.video_codec = 0;
        self.audio_codec = 0;
        self.metadata = Arc::new(Vec::new());
        self.avc_sequence_header = Arc::new(Vec::new());
        self.aac_sequence_header = Arc::new(Vec::new());
        self.gop_cache.clear();
        self.gop_index = 0;
    }

    /// Saves a media packet into the GOP cache
    ///
    /// A H.264 keyframe NALU starts a new group, evicting the oldest
    /// group when 2 are already cached. Inter frames and AAC frames are
    /// appended to the group in progress until it holds max_gop_cache_len
    /// frames. Sequence headers are never stored.
    ///
    /// # Arguments
    ///
    /// * `packet` - The media packet
    /// * `max_gop_cache_len` - Max number of frames per group (0 disables the cache)
    pub fn save_gop(&mut self, packet: &Arc<RtmpPacket>, max_gop_cache_len: usize) {
        if max_gop_cache_len == 0 {
            return;
        }

        let payload = &packet.payload;

        if payload.len() < 2 {
            return;
        }

        match packet.header.packet_type {
            RTMP_TYPE_VIDEO => {
                let frame_type = (payload[0] >> 4) & 0x0f;
                let codec_id = payload[0] & 0x0f;

                if codec_id != RTMP_CODEC_ID_H264 {
                    return;
                }

                if frame_type == 1 && payload[1] == 1 {
                    // Keyframe NALU, starts a new group
                    if self.gop_cache.len() == 2 {
                        let oldest_index = *self.gop_cache.keys().next().unwrap();
                        self.gop_cache.remove(&oldest_index);
                    }

                    self.gop_index += 1;
                    self.gop_cache.insert(self.gop_index, vec![packet.clone()]);
                } else if frame_type != 1 {
                    // Inter frame, append to the group in progress
                    if let Some(gop) = self.gop_cache.get_mut(&self.gop_index) {
                        if !gop.is_empty() && gop.len() < max_gop_cache_len {
                            gop.push(packet.clone());
                        }
                    }
                }
            }
            RTMP_TYPE_AUDIO => {
                let sound_format = (payload[0] >> 4) & 0x0f;

                if sound_format != RTMP_CODEC_ID_AAC as u8 || payload[1] == 0 {
                    return;
                }

                if packet.header.timestamp > 0 {
                    if let Some(gop) = self.gop_cache.get_mut(&self.gop_index) {
                        if !gop.is_empty() && gop.len() < max_gop_cache_len {
                            gop.push(packet.clone());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Builds the start message for a new player:
    /// metadata, sequence headers and the oldest cached group of pictures
    pub fn get_play_start_message(&self) -> RtmpSessionMessage {
        let gop_cache: Vec<Arc<RtmpPacket>> = match self.gop_cache.values().next() {
            Some(gop) => gop.clone(),
            None => Vec::new(),
        };

        RtmpSessionMessage::PlayStart {
            metadata: self.metadata.clone(),
            audio_codec: self.audio_codec,
            aac_sequence_header: self.aac_sequence_header.clone(),
            video_codec: self.video_codec,
            avc_sequence_header: self.avc_sequence_header.clone(),
            gop_cache,
        }
    }
}

impl Default for RtmpSessionPublishStreamStatus {
    fn default() -> Self {
        Self::new()
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtmp::{RTMP_CHANNEL_AUDIO, RTMP_CHANNEL_VIDEO, RTMP_CHUNK_TYPE_0};

    fn media_packet(packet_type: u32, payload: Vec<u8>, timestamp: i64) -> Arc<RtmpPacket> {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = if packet_type == RTMP_TYPE_VIDEO {
            RTMP_CHANNEL_VIDEO
        } else {
            RTMP_CHANNEL_AUDIO
        };
        packet.header.packet_type = packet_type;
        packet.header.timestamp = timestamp;
        packet.header.length = payload.len();
        packet.payload = payload;

        Arc::new(packet)
    }

    fn keyframe(timestamp: i64) -> Arc<RtmpPacket> {
        media_packet(RTMP_TYPE_VIDEO, vec![0x17, 0x01, 0, 0, 0, 0xAA], timestamp)
    }

    fn inter_frame(timestamp: i64) -> Arc<RtmpPacket> {
        media_packet(RTMP_TYPE_VIDEO, vec![0x27, 0x01, 0, 0, 0, 0xBB], timestamp)
    }

    fn aac_frame(timestamp: i64) -> Arc<RtmpPacket> {
        media_packet(RTMP_TYPE_AUDIO, vec![0xAF, 0x01, 0xCC], timestamp)
    }

    fn avc_sequence_header() -> Arc<RtmpPacket> {
        media_packet(RTMP_TYPE_VIDEO, vec![0x17, 0x00, 0, 0, 0, 0x01], 0)
    }

    #[test]
    fn test_gop_cache_starts_on_keyframe() {
        let mut status = RtmpSessionPublishStreamStatus::new();

        // Frames before any keyframe are not cached
        status.save_gop(&inter_frame(10), 100);
        assert!(status.gop_cache.is_empty());

        status.save_gop(&keyframe(20), 100);
        status.save_gop(&inter_frame(30), 100);
        status.save_gop(&aac_frame(35), 100);

        assert_eq!(status.gop_cache.len(), 1);
        assert_eq!(status.gop_cache.get(&1).unwrap().len(), 3);
    }

    #[test]
    fn test_gop_cache_keeps_two_groups() {
        let mut status = RtmpSessionPublishStreamStatus::new();

        status.save_gop(&keyframe(0), 100);
        status.save_gop(&inter_frame(40), 100);
        status.save_gop(&keyframe(80), 100);
        status.save_gop(&keyframe(160), 100);

        assert_eq!(status.gop_cache.len(), 2);
        // The oldest retained group is the one opened at index 2
        assert_eq!(*status.gop_cache.keys().next().unwrap(), 2);
    }

    #[test]
    fn test_gop_cache_respects_frame_limit() {
        let mut status = RtmpSessionPublishStreamStatus::new();

        status.save_gop(&keyframe(0), 3);

        for i in 1..10 {
            status.save_gop(&inter_frame(i * 40), 3);
        }

        assert_eq!(status.gop_cache.get(&1).unwrap().len(), 3);
    }

    #[test]
    fn test_gop_cache_skips_sequence_headers_and_zero_ts_audio() {
        let mut status = RtmpSessionPublishStreamStatus::new();

        status.save_gop(&keyframe(0), 100);
        status.save_gop(&avc_sequence_header(), 100);
        status.save_gop(&aac_frame(0), 100);

        assert_eq!(status.gop_cache.get(&1).unwrap().len(), 1);
    }

    #[test]
    fn test_gop_cache_disabled() {
        let mut status = RtmpSessionPublishStreamStatus::new();

        status.save_gop(&keyframe(0), 0);
        status.save_gop(&inter_frame(40), 0);

        assert!(status.gop_cache.is_empty());
    }

    #[test]
    fn test_play_start_message_uses_oldest_group() {
        let mut status = RtmpSessionPublishStreamStatus::new();

        status.save_gop(&keyframe(0), 100);
        status.save_gop(&inter_frame(40), 100);
        status.save_gop(&keyframe(80), 100);

        let msg = status.get_play_start_message();

        match msg {
            RtmpSessionMessage::PlayStart { gop_cache, .. } => {
                assert_eq!(gop_cache.len(), 2);
                assert_eq!(gop_cache[0].header.timestamp, 0);
                assert_eq!(gop_cache[1].header.timestamp, 40);
            }
            _ => panic!("expected PlayStart"),
        }
    }
}
