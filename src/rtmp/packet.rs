// RTMP packet model

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1, RTMP_CHUNK_TYPE_2, RTMP_CHUNK_TYPE_3};

/// Header of an RTMP packet
#[derive(Clone)]
pub struct RtmpPacketHeader {
    /// Timestamp
    pub timestamp: i64,

    /// Packet format (chunk type of the leading chunk)
    pub format: u32,

    /// Channel ID (chunk stream id)
    pub channel_id: u32,

    /// Packet type
    pub packet_type: u32,

    /// Message stream ID
    pub stream_id: u32,

    // Payload length
    pub length: usize,
}

impl RtmpPacketHeader {
    /// Resets the header
    pub fn reset(&mut self) {
        *self = RtmpPacketHeader {
            timestamp: 0,
            format: 0,
            channel_id: 0,
            packet_type: 0,
            stream_id: 0,
            length: 0,
        };
    }
}

/// RTMP packet
#[derive(Clone)]
pub struct RtmpPacket {
    /// Packet header
    pub header: RtmpPacketHeader,

    /// Packet payload
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    /// Creates new blank RTMP packet
    pub fn new_blank() -> RtmpPacket {
        RtmpPacket {
            header: RtmpPacketHeader {
                timestamp: 0,
                format: 0,
                channel_id: 0,
                packet_type: 0,
                stream_id: 0,
                length: 0,
            },
            payload: Vec::new(),
        }
    }

    /// Resets the payload
    pub fn reset_payload(&mut self) {
        self.payload.truncate(0);
    }

    /// Fully resets the packet
    pub fn reset(&mut self) {
        self.header.reset();
        self.payload = Vec::new();
    }

    /// Serializes a basic header for a RTMP chunk
    /// format - Chunk format
    /// channel_id - Chunk stream ID
    /// Returns the serialized bytes
    pub fn serialize_basic_header(format: u32, channel_id: u32) -> Vec<u8> {
        if channel_id >= 64 + 256 {
            vec![
                ((format << 6) as u8) | 1,
                ((channel_id - 64) & 0xff) as u8,
                (((channel_id - 64) >> 8) & 0xff) as u8,
            ]
        } else if channel_id >= 64 {
            vec![(format << 6) as u8, (channel_id - 64) as u8]
        } else {
            vec![((format << 6) as u8) | (channel_id as u8)]
        }
    }

    /// Serializes the message header of a RTMP chunk
    /// stream_id - Message stream ID to use for chunk type 0
    /// Returns the serialized bytes
    pub fn serialize_chunk_message_header(&self, stream_id: u32) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();

        if self.header.format <= RTMP_CHUNK_TYPE_2 {
            let mut b: Vec<u8> = vec![0; 4];

            if self.header.timestamp >= 0xffffff {
                BigEndian::write_u32(&mut b, 0xffffff);
            } else {
                BigEndian::write_u32(&mut b, self.header.timestamp as u32);
            }

            out.extend(&b[1..]);
        }

        if self.header.format <= RTMP_CHUNK_TYPE_1 {
            let mut b: Vec<u8> = vec![0; 4];

            BigEndian::write_u32(&mut b, self.header.length as u32);

            out.extend(&b[1..]);
            out.push(self.header.packet_type as u8);
        }

        if self.header.format == RTMP_CHUNK_TYPE_0 {
            let mut b: Vec<u8> = vec![0; 4];

            LittleEndian::write_u32(&mut b, stream_id);

            out.extend(b);
        }

        out
    }

    /// Creates the chunks for an RTMP packet
    /// out_chunk_size - Size of the output chunks
    pub fn create_chunks(&self, out_chunk_size: usize) -> Vec<u8> {
        self.create_chunks_for_stream(self.header.stream_id, out_chunk_size)
    }

    /// Creates the chunks for an RTMP packet
    /// The payload is split into a leading chunk plus
    /// type 3 continuation chunks of up to out_chunk_size bytes
    /// stream_id - Message stream ID
    /// out_chunk_size - Size of the output chunks
    pub fn create_chunks_for_stream(&self, stream_id: u32, out_chunk_size: usize) -> Vec<u8> {
        let chunk_basic_header =
            Self::serialize_basic_header(self.header.format, self.header.channel_id);

        let chunk_basic_header_3 =
            Self::serialize_basic_header(RTMP_CHUNK_TYPE_3, self.header.channel_id);

        let chunk_message_header = self.serialize_chunk_message_header(stream_id);

        let use_extended_timestamp = self.header.timestamp >= 0xffffff;

        let payload_size = if self.header.length > self.payload.len() {
            self.payload.len()
        } else {
            self.header.length
        };

        let mut extended_timestamp_bytes: Vec<u8> = Vec::new();

        if use_extended_timestamp {
            extended_timestamp_bytes = vec![0; 4];
            BigEndian::write_u32(&mut extended_timestamp_bytes, self.header.timestamp as u32);
        }

        let mut chunks: Vec<u8> = Vec::with_capacity(
            chunk_basic_header.len() + chunk_message_header.len() + payload_size + 64,
        );

        chunks.extend(&chunk_basic_header);
        chunks.extend(&chunk_message_header);
        chunks.extend(&extended_timestamp_bytes);

        let mut payload_offset: usize = 0;

        while payload_offset < payload_size {
            let sub_payload_size = if payload_size - payload_offset > out_chunk_size {
                out_chunk_size
            } else {
                payload_size - payload_offset
            };

            chunks.extend(&self.payload[payload_offset..payload_offset + sub_payload_size]);

            payload_offset += sub_payload_size;

            if payload_offset < payload_size {
                chunks.extend(&chunk_basic_header_3);
                chunks.extend(&extended_timestamp_bytes);
            }
        }

        chunks
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_basic_header() {
        assert_eq!(RtmpPacket::serialize_basic_header(0, 3), vec![0x03]);
        assert_eq!(RtmpPacket::serialize_basic_header(3, 5), vec![0xc5]);
        assert_eq!(RtmpPacket::serialize_basic_header(0, 70), vec![0x00, 6]);
        assert_eq!(
            RtmpPacket::serialize_basic_header(1, 64 + 256 + 3),
            vec![0x41, 3, 1]
        );
    }

    #[test]
    fn test_serialize_chunk_message_header_sizes() {
        let mut packet = RtmpPacket::new_blank();
        packet.header.length = 100;
        packet.header.timestamp = 4000;

        packet.header.format = RTMP_CHUNK_TYPE_0;
        assert_eq!(packet.serialize_chunk_message_header(1).len(), 11);

        packet.header.format = RTMP_CHUNK_TYPE_1;
        assert_eq!(packet.serialize_chunk_message_header(1).len(), 7);

        packet.header.format = RTMP_CHUNK_TYPE_2;
        assert_eq!(packet.serialize_chunk_message_header(1).len(), 3);

        packet.header.format = RTMP_CHUNK_TYPE_3;
        assert_eq!(packet.serialize_chunk_message_header(1).len(), 0);
    }

    #[test]
    fn test_create_chunks_splits_payload() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 5;
        packet.header.packet_type = 9;
        packet.header.stream_id = 1;
        packet.payload = vec![0xAB; 300];
        packet.header.length = packet.payload.len();

        let chunks = packet.create_chunks(128);

        // 1 + 11 byte leading header, 300 payload bytes, 2 type 3 basic headers
        assert_eq!(chunks.len(), 12 + 300 + 2);
        assert_eq!(chunks[0], 0x05);
        assert_eq!(chunks[12 + 128], 0xc5);
        assert_eq!(chunks[12 + 128 + 1 + 128], 0xc5);
    }

    #[test]
    fn test_create_chunks_exact_multiple_has_no_trailing_header() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 4;
        packet.header.packet_type = 8;
        packet.header.stream_id = 1;
        packet.payload = vec![0x01; 256];
        packet.header.length = packet.payload.len();

        let chunks = packet.create_chunks(128);

        assert_eq!(chunks.len(), 12 + 256 + 1);
        assert_eq!(*chunks.last().unwrap(), 0x01);
    }

    #[test]
    fn test_create_chunks_extended_timestamp() {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = 5;
        packet.header.packet_type = 9;
        packet.header.stream_id = 1;
        packet.header.timestamp = 0x01000000;
        packet.payload = vec![0x02; 10];
        packet.header.length = packet.payload.len();

        let chunks = packet.create_chunks(128);

        // Timestamp field saturated to 0xffffff
        assert_eq!(&chunks[1..4], &[0xff, 0xff, 0xff]);
        // Extended timestamp follows the 11 byte message header
        assert_eq!(&chunks[12..16], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(chunks.len(), 12 + 4 + 10);
    }
}
