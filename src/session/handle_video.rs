// Logic to handle video packets

use std::sync::Arc;

use crate::{
    log::Logger,
    log_debug, log_trace,
    rtmp::{
        RtmpPacket, RTMP_CHANNEL_VIDEO, RTMP_CHUNK_TYPE_0, RTMP_CODEC_ID_H264, RTMP_TYPE_VIDEO,
    },
    server::RtmpServerContext,
};

use super::SessionReadThreadContext;

/// Handles VIDEO RTMP packet
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `packet` - The packet
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_packet_video(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    packet: &RtmpPacket,
) -> bool {
    let channel_status_mu = match &session_context.read_status.channel_status {
        Some(s) => s.clone(),
        None => {
            log_debug!(logger, "Video packet ignored since it was not publishing");

            return true;
        }
    };

    if packet.header.length <= 2 {
        log_debug!(logger, "Packet error: Packet length too short");

        return false;
    }

    // Load packet metadata and update publish status

    let frame_type = (packet.payload[0] >> 4) & 0x0f;
    let codec_id = packet.payload[0] & 0x0f;

    let is_header =
        frame_type == 1 && codec_id == RTMP_CODEC_ID_H264 && packet.payload[1] == 0;

    let mut publish_status_v = session_context.publish_status.lock().await;

    if is_header {
        publish_status_v.avc_sequence_header = Arc::new(packet.payload.clone());
    }

    if publish_status_v.video_codec == 0 {
        publish_status_v.video_codec = codec_id as u32;
    }

    publish_status_v.clock = packet.header.timestamp;

    drop(publish_status_v);

    // Log

    log_trace!(
        logger,
        format!("VIDEO PACKET: {} bytes", packet.payload.len())
    );

    // Prepare packet copy to store

    let mut copied_packet = RtmpPacket::new_blank();

    copied_packet.header.format = RTMP_CHUNK_TYPE_0;
    copied_packet.header.channel_id = RTMP_CHANNEL_VIDEO;
    copied_packet.header.packet_type = RTMP_TYPE_VIDEO;
    copied_packet.payload = packet.payload.clone();
    copied_packet.header.length = copied_packet.payload.len();
    copied_packet.header.timestamp = packet.header.timestamp;

    // Send packet to the channel

    let mut channel_status = channel_status_mu.lock().await;

    channel_status
        .send_packet(
            session_context.id,
            Arc::new(copied_packet),
            is_header,
            server_context.config.gop_cache_len,
        )
        .await;

    drop(channel_status);

    // Done

    true
}
