// Packet handling logic

use byteorder::{BigEndian, ByteOrder};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{
        RtmpPacket, RTMP_MAX_IN_CHUNK_SIZE, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT,
        RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_EVENT, RTMP_TYPE_FLASH_VIDEO,
        RTMP_TYPE_FLEX_MESSAGE, RTMP_TYPE_FLEX_STREAM, RTMP_TYPE_INVOKE,
        RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH, RTMP_TYPE_VIDEO,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    },
    server::RtmpServerContext,
};

use super::{
    handle_rtmp_packet_audio, handle_rtmp_packet_data, handle_rtmp_packet_invoke,
    handle_rtmp_packet_video, SessionReadThreadContext,
};

/// Handles RTMP packet
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `write_stream` - The stream to write to the client
/// * `packet` - The packet to handle
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_packet<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static>(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    write_stream: &Mutex<TW>,
    packet: &RtmpPacket,
) -> bool {
    match packet.header.packet_type {
        RTMP_TYPE_SET_CHUNK_SIZE => {
            if packet.payload.len() < 4 {
                log_debug!(logger, "Packet error: SET_CHUNK_SIZE packet too short");

                return false;
            }

            let chunk_size = (BigEndian::read_u32(&packet.payload[0..4]) & 0x7fffffff) as usize;

            if chunk_size == 0 || chunk_size > RTMP_MAX_IN_CHUNK_SIZE {
                log_debug!(
                    logger,
                    format!("Protocol error: Invalid chunk size: {}", chunk_size)
                );

                return false;
            }

            session_context.read_status.in_chunk_size = chunk_size;

            log_debug!(logger, format!("Chunk size updated: {}", chunk_size));

            true
        }
        RTMP_TYPE_ABORT => {
            if packet.payload.len() >= 4 {
                let channel_id = BigEndian::read_u32(&packet.payload[0..4]);

                session_context.read_status.packets.remove(&channel_id);
            }

            true
        }
        RTMP_TYPE_ACKNOWLEDGEMENT => true,
        RTMP_TYPE_EVENT => {
            // User control messages are parsed, but not acted upon
            true
        }
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE => {
            if packet.payload.len() < 4 {
                log_debug!(logger, "Packet error: WINDOW_ACK_SIZE packet too short");

                return false;
            }

            let ack_size = BigEndian::read_u32(&packet.payload[0..4]);

            session_context.read_status.ack_window = ack_size;

            log_debug!(logger, format!("ACK window updated: {}", ack_size));

            true
        }
        RTMP_TYPE_SET_PEER_BANDWIDTH => {
            // Parsed, ignored
            true
        }
        RTMP_TYPE_AUDIO => {
            handle_rtmp_packet_audio(logger, server_context, session_context, packet).await
        }
        RTMP_TYPE_VIDEO => {
            handle_rtmp_packet_video(logger, server_context, session_context, packet).await
        }
        RTMP_TYPE_DATA => {
            handle_rtmp_packet_data(logger, server_context, session_context, packet).await
        }
        RTMP_TYPE_INVOKE => {
            handle_rtmp_packet_invoke(logger, server_context, session_context, write_stream, packet)
                .await
        }
        RTMP_TYPE_FLEX_MESSAGE | RTMP_TYPE_FLEX_STREAM | RTMP_TYPE_FLASH_VIDEO => {
            log_debug!(
                logger,
                format!(
                    "Unsupported message type: {}",
                    packet.header.packet_type
                )
            );

            false
        }
        _ => {
            log_debug!(
                logger,
                format!("Unknown message type: {}", packet.header.packet_type)
            );

            true
        }
    }
}
