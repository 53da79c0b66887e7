// Chunk read logic

use std::time::Duration;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{get_rtmp_header_size, RtmpPacket, RTMP_PING_TIMEOUT},
};

use super::{RtmpPacketWrapper, RtmpSessionReadStatus};

/// Refuse to assemble messages larger than this
const RTMP_MAX_PACKET_LENGTH: usize = 15 * 1024 * 1024;

/// Reads a single byte, bounded by the read timeout
async fn read_byte<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
    logger: &Logger,
) -> Result<u8, ()> {
    match tokio::time::timeout(Duration::from_secs(RTMP_PING_TIMEOUT), read_stream.read_u8()).await
    {
        Ok(r) => match r {
            Ok(b) => Ok(b),
            Err(e) => {
                log_debug!(logger, format!("Chunk read error: {}", e));
                Err(())
            }
        },
        Err(_) => {
            log_debug!(logger, "Chunk read error: Timed out");
            Err(())
        }
    }
}

/// Reads an exact number of bytes, bounded by the read timeout
async fn read_exact_bytes<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
    buf: &mut [u8],
    logger: &Logger,
) -> Result<(), ()> {
    match tokio::time::timeout(
        Duration::from_secs(RTMP_PING_TIMEOUT),
        read_stream.read_exact(buf),
    )
    .await
    {
        Ok(r) => match r {
            Ok(_) => Ok(()),
            Err(e) => {
                log_debug!(logger, format!("Chunk read error: {}", e));
                Err(())
            }
        },
        Err(_) => {
            log_debug!(logger, "Chunk read error: Timed out");
            Err(())
        }
    }
}

/// Reads one RTMP chunk from the stream
///
/// # Arguments
///
/// * `read_stream` - IO stream to read bytes
/// * `read_status` - Chunk decoding status (per-chunk-stream packet map)
/// * `logger` - Session logger
///
/// # Return value
///
/// Returns the completed packet if the chunk finished a message.
/// Returns Err if the connection failed or the chunk was malformed.
pub async fn read_rtmp_chunk<TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin>(
    read_stream: &mut TR,
    read_status: &mut RtmpSessionReadStatus,
    logger: &Logger,
) -> Result<Option<RtmpPacket>, ()> {
    let mut bytes_read_count: u64 = 0;

    // Basic header

    let start_byte = read_byte(read_stream, logger).await?;
    bytes_read_count += 1;

    let format = (start_byte >> 6) as u32;

    let channel_id: u32 = match start_byte & 0x3f {
        0 => {
            let b1 = read_byte(read_stream, logger).await?;
            bytes_read_count += 1;
            64 + (b1 as u32)
        }
        1 => {
            let b1 = read_byte(read_stream, logger).await?;
            let b2 = read_byte(read_stream, logger).await?;
            bytes_read_count += 2;
            64 + (b1 as u32) + 256 * (b2 as u32)
        }
        id => id as u32,
    };

    // Message header

    let header_size = get_rtmp_header_size((start_byte >> 6) as u8);

    let mut header: Vec<u8> = vec![0; header_size];

    if header_size > 0 {
        read_exact_bytes(read_stream, &mut header, logger).await?;
        bytes_read_count += header_size as u64;
    }

    let wrapper = read_status
        .packets
        .entry(channel_id)
        .or_insert_with(RtmpPacketWrapper::new);

    wrapper.packet.header.channel_id = channel_id;
    wrapper.packet.header.format = format;

    match format {
        0 => {
            let timestamp = BigEndian::read_u24(&header[0..3]) as i64;
            let length = BigEndian::read_u24(&header[3..6]) as usize;
            let packet_type = header[6] as u32;
            let stream_id = LittleEndian::read_u32(&header[7..11]);

            wrapper.packet.header.length = length;
            wrapper.packet.header.packet_type = packet_type;
            wrapper.packet.header.stream_id = stream_id;
            wrapper.reset();
            wrapper.used = true;

            wrapper.clock = timestamp;
        }
        1 | 2 => {
            if !wrapper.used {
                log_debug!(
                    logger,
                    "Chunk error: Delta chunk received with no context"
                );
                return Err(());
            }

            let delta = BigEndian::read_u24(&header[0..3]) as i64;

            if format == 1 {
                let length = BigEndian::read_u24(&header[3..6]) as usize;
                let packet_type = header[6] as u32;

                wrapper.packet.header.length = length;
                wrapper.packet.header.packet_type = packet_type;
            }

            wrapper.reset();
            wrapper.clock = wrapper.clock.wrapping_add(delta);
        }
        _ => {
            // Type 3: inherits everything from the previous chunk.
            // If the previous message completed, this starts a new one
            // with the same header.
            if !wrapper.used {
                log_debug!(
                    logger,
                    "Chunk error: Continuation chunk received with no context"
                );
                return Err(());
            }
        }
    }

    // Extended timestamp

    if format <= 2 {
        let timestamp_field = BigEndian::read_u24(&header[0..3]);

        wrapper.has_extended_timestamp = timestamp_field == 0xffffff;

        if wrapper.has_extended_timestamp {
            let mut extended: Vec<u8> = vec![0; 4];

            read_exact_bytes(read_stream, &mut extended, logger).await?;
            bytes_read_count += 4;

            let extended_timestamp = BigEndian::read_u32(&extended) as i64;

            if format == 0 {
                wrapper.clock = extended_timestamp;
            } else {
                // The 3 byte field held the saturated delta marker, replace it
                wrapper.clock = wrapper
                    .clock
                    .wrapping_sub(0xffffff)
                    .wrapping_add(extended_timestamp);
            }
        }
    } else if wrapper.has_extended_timestamp {
        // Continuation chunks repeat the extended timestamp
        let mut extended: Vec<u8> = vec![0; 4];

        read_exact_bytes(read_stream, &mut extended, logger).await?;
        bytes_read_count += 4;
    }

    if wrapper.packet.header.length > RTMP_MAX_PACKET_LENGTH {
        log_debug!(
            logger,
            format!(
                "Chunk error: Message length too large: {}",
                wrapper.packet.header.length
            )
        );
        return Err(());
    }

    // Body

    let remaining = wrapper.packet.header.length.saturating_sub(wrapper.bytes);
    let body_size = remaining.min(read_status.in_chunk_size);

    if body_size > 0 {
        let mut body: Vec<u8> = vec![0; body_size];

        read_exact_bytes(read_stream, &mut body, logger).await?;
        bytes_read_count += body_size as u64;

        wrapper.packet.payload.extend(body);
        wrapper.bytes += body_size;
    }

    read_status.bytes_since_ack += bytes_read_count;

    // Completion check

    if wrapper.bytes >= wrapper.packet.header.length && wrapper.packet.header.length > 0 {
        let mut packet = wrapper.packet.clone();

        packet.header.timestamp = wrapper.clock;

        wrapper.reset();

        return Ok(Some(packet));
    }

    Ok(None)
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Logger;
    use crate::rtmp::{RTMP_CHANNEL_VIDEO, RTMP_CHUNK_TYPE_0, RTMP_TYPE_VIDEO};
    use tokio::io::AsyncWriteExt;

    fn make_test_packet(payload_len: usize, timestamp: i64) -> RtmpPacket {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = RTMP_CHANNEL_VIDEO;
        packet.header.packet_type = RTMP_TYPE_VIDEO;
        packet.header.stream_id = 1;
        packet.header.timestamp = timestamp;
        packet.payload = (0..payload_len).map(|i| (i % 251) as u8).collect();
        packet.header.length = packet.payload.len();

        packet
    }

    async fn decode_all(bytes: &[u8], in_chunk_size: usize) -> Vec<RtmpPacket> {
        let logger = Logger::new_disabled();
        let mut read_status = RtmpSessionReadStatus::new();

        read_status.in_chunk_size = in_chunk_size;

        let mut read_stream: &[u8] = bytes;
        let mut packets = Vec::new();

        while !read_stream.is_empty() {
            if let Some(packet) = read_rtmp_chunk(&mut read_stream, &mut read_status, &logger)
                .await
                .expect("chunk decode failed")
            {
                packets.push(packet);
            }
        }

        packets
    }

    #[tokio::test]
    async fn test_chunk_round_trip_multiple_sizes() {
        for chunk_size in [128, 1000, 4096, 60000] {
            let packet = make_test_packet(10000, 123456);
            let bytes = packet.create_chunks(chunk_size);

            let packets = decode_all(&bytes, chunk_size).await;

            assert_eq!(packets.len(), 1, "chunk size {}", chunk_size);
            assert_eq!(packets[0].header.packet_type, RTMP_TYPE_VIDEO);
            assert_eq!(packets[0].header.channel_id, RTMP_CHANNEL_VIDEO);
            assert_eq!(packets[0].header.stream_id, 1);
            assert_eq!(packets[0].header.timestamp, 123456);
            assert_eq!(packets[0].header.length, 10000);
            assert_eq!(packets[0].payload, packet.payload);
        }
    }

    #[tokio::test]
    async fn test_chunk_round_trip_extended_timestamp() {
        let packet = make_test_packet(500, 0x01234567);
        let bytes = packet.create_chunks(128);

        let packets = decode_all(&bytes, 128).await;

        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].header.timestamp, 0x01234567);
        assert_eq!(packets[0].payload, packet.payload);
    }

    #[tokio::test]
    async fn test_chunk_round_trip_byte_by_byte() {
        let packet = make_test_packet(1000, 42);
        let bytes = packet.create_chunks(128);

        let (mut writer, mut reader) = tokio::io::duplex(1);

        let writer_bytes = bytes.clone();
        let write_task = tokio::spawn(async move {
            for b in writer_bytes {
                writer.write_all(&[b]).await.unwrap();
            }
        });

        let logger = Logger::new_disabled();
        let mut read_status = RtmpSessionReadStatus::new();

        let mut decoded: Option<RtmpPacket> = None;

        while decoded.is_none() {
            decoded = read_rtmp_chunk(&mut reader, &mut read_status, &logger)
                .await
                .expect("chunk decode failed");
        }

        write_task.await.unwrap();

        let decoded = decoded.unwrap();

        assert_eq!(decoded.header.timestamp, 42);
        assert_eq!(decoded.payload, packet.payload);
    }

    #[tokio::test]
    async fn test_sequential_messages_and_delta_chunks() {
        let first = make_test_packet(100, 1000);
        let second = make_test_packet(100, 2000);

        let mut bytes = first.create_chunks(4096);
        bytes.extend(second.create_chunks(4096));

        let packets = decode_all(&bytes, 4096).await;

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].header.timestamp, 1000);
        assert_eq!(packets[1].header.timestamp, 2000);

        // A delta chunk (type 2 header) adds to the clock
        let mut delta_bytes = vec![(2u32 << 6) as u8 | RTMP_CHANNEL_VIDEO as u8];
        delta_bytes.extend([0x00, 0x00, 0x28]); // delta 40

        let mut all = first.create_chunks(4096);
        all.extend(delta_bytes);
        all.extend(&first.payload[..]);

        let replayed = decode_all(&all, 4096).await;

        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[1].header.timestamp, 1000 + 40);
        assert_eq!(replayed[1].header.length, 100);
    }

    #[tokio::test]
    async fn test_orphan_continuation_chunk_fails() {
        // A type 3 chunk with no previous context is a protocol error
        let bytes = vec![(3u32 << 6) as u8 | 0x05];

        let logger = Logger::new_disabled();
        let mut read_status = RtmpSessionReadStatus::new();
        let mut read_stream: &[u8] = &bytes;

        assert!(
            read_rtmp_chunk(&mut read_stream, &mut read_status, &logger)
                .await
                .is_err()
        );
    }
}
