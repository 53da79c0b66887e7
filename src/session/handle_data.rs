// Logic to handle data packets

use std::sync::Arc;

use crate::{
    log::Logger,
    log_debug, log_trace,
    rtmp::{rtmp_build_metadata, RtmpData, RtmpPacket},
    server::{set_channel_metadata, RtmpServerContext},
};

use super::SessionReadThreadContext;

/// Handles DATA RTMP packet (AMF0)
///
/// A @setDataFrame / onMetaData message updates the channel metadata.
/// Data received before the session joined a channel is ignored.
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
pub async fn handle_rtmp_packet_data(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    packet: &RtmpPacket,
) -> bool {
    if packet.header.length > packet.payload.len() {
        log_debug!(logger, "Packet error: Payload does not match with packet length");

        return false;
    }

    let data = match RtmpData::decode(&packet.payload[..packet.header.length]) {
        Ok(d) => d,
        Err(_) => {
            log_debug!(logger, "Packet error: Could not decode RTMP data");

            return false;
        }
    };

    log_trace!(logger, format!("DATA: {}", data.to_debug_string()));

    let is_metadata = match data.tag.as_str() {
        "@setDataFrame" => match data.get_argument("method") {
            Some(m) => m.get_string() == "onMetaData",
            None => false,
        },
        "onMetaData" => true,
        _ => false,
    };

    if !is_metadata {
        return true;
    }

    if !session_context.is_publisher().await {
        log_debug!(logger, "Metadata ignored since the session is not publishing");

        return true;
    }

    let stream_path = {
        let status = session_context.status.lock().await;

        match &status.stream_path {
            Some(p) => p.clone(),
            None => {
                return true;
            }
        }
    };

    // Build, store and broadcast the metadata

    let metadata = Arc::new(rtmp_build_metadata(&data));

    let mut publish_status_v = session_context.publish_status.lock().await;
    publish_status_v.metadata = metadata.clone();
    drop(publish_status_v);

    set_channel_metadata(server_context, &stream_path, session_context.id, metadata).await;

    true
}
