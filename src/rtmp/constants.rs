// RTMP constants

/// Protocol version byte (C0 / S0)
pub const RTMP_VERSION: u8 = 0x03;

/// Size of the C1, C2, S1 and S2 handshake signatures
pub const RTMP_SIG_SIZE: usize = 1536;

// Chunk types
pub const RTMP_CHUNK_TYPE_0: u32 = 0; // 11-bytes: timestamp(3) + length(3) + stream type(1) + stream id(4)
pub const RTMP_CHUNK_TYPE_1: u32 = 1; // 7-bytes: delta(3) + length(3) + stream type(1)
pub const RTMP_CHUNK_TYPE_2: u32 = 2; // 3-bytes: delta(3)
pub const RTMP_CHUNK_TYPE_3: u32 = 3; // 0-byte

// RTMP channel types
pub const RTMP_CHANNEL_PROTOCOL: u32 = 2;
pub const RTMP_CHANNEL_INVOKE: u32 = 3;
pub const RTMP_CHANNEL_AUDIO: u32 = 4;
pub const RTMP_CHANNEL_VIDEO: u32 = 5;
pub const RTMP_CHANNEL_DATA: u32 = 6;

/// Gets RTMP message header size from the chunk format
pub fn get_rtmp_header_size(header_byte: u8) -> usize {
    match header_byte {
        0 => 11,
        1 => 7,
        2 => 3,
        _ => 0,
    }
}

// Packet types

/* Protocol Control Messages */
pub const RTMP_TYPE_SET_CHUNK_SIZE: u32 = 1;
pub const RTMP_TYPE_ABORT: u32 = 2;
pub const RTMP_TYPE_ACKNOWLEDGEMENT: u32 = 3; // bytes read report
pub const RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE: u32 = 5; // server bandwidth
pub const RTMP_TYPE_SET_PEER_BANDWIDTH: u32 = 6; // client bandwidth

/* User Control Messages Event (4) */
pub const RTMP_TYPE_EVENT: u32 = 4;

pub const RTMP_TYPE_AUDIO: u32 = 8;
pub const RTMP_TYPE_VIDEO: u32 = 9;

/* Data Message */
pub const RTMP_TYPE_FLEX_STREAM: u32 = 15; // AMF3
pub const RTMP_TYPE_DATA: u32 = 18; // AMF0

/* Command Message */
pub const RTMP_TYPE_FLEX_MESSAGE: u32 = 17; // AMF3
pub const RTMP_TYPE_INVOKE: u32 = 20; // AMF0

/* FLV video */
pub const RTMP_TYPE_FLASH_VIDEO: u32 = 22;

// Stream statuses

pub const STREAM_BEGIN: u16 = 0x00;
pub const STREAM_EOF: u16 = 0x01;

// Chunk sizes

/// Chunk size both sides start with
pub const RTMP_CHUNK_SIZE_DEFAULT: usize = 128;

/// Largest outbound chunk size the peer may be asked to accept
pub const RTMP_MAX_CHUNK_SIZE: usize = 60000;

/// Ceiling for an inbound Set Chunk Size value
pub const RTMP_MAX_IN_CHUNK_SIZE: usize = 65535;

// Codec IDs

pub const RTMP_CODEC_ID_H264: u8 = 7;
pub const RTMP_CODEC_ID_AAC: u8 = 10;

// Windows

pub const RTMP_WINDOW_ACK: u32 = 5000000;
pub const RTMP_PEER_BANDWIDTH: u32 = 5000000;

/// Peer bandwidth limit types
pub const RTMP_PEER_BANDWIDTH_HARD: u8 = 0;
pub const RTMP_PEER_BANDWIDTH_SOFT: u8 = 1;
pub const RTMP_PEER_BANDWIDTH_DYNAMIC: u8 = 2;

// Timings (seconds)

/// Interval to send ping requests to clients
pub const RTMP_PING_TIME: u64 = 30;

/// Max time to wait for socket reads before giving up on the connection
pub const RTMP_PING_TIMEOUT: u64 = 60;
