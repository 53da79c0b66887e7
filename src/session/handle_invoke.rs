// Invoke packet handling logic

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug, log_trace,
    rtmp::{RtmpCommand, RtmpPacket},
    server::{player_set_receive_audio, player_set_receive_video, RtmpServerContext},
};

use super::{
    handle_rtmp_command_connect, handle_rtmp_command_create_stream, handle_rtmp_command_play,
    handle_rtmp_command_publish, rtmp_delete_stream, SessionReadThreadContext,
};

/// Handles RTMP packet (INVOKE)
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
pub async fn handle_rtmp_packet_invoke<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    write_stream: &Mutex<TW>,
    packet: &RtmpPacket,
) -> bool {
    if packet.header.length == 0 {
        log_debug!(logger, "Packet error: Packet length too short");

        return false;
    }

    if packet.header.length > packet.payload.len() {
        log_debug!(logger, "Packet error: Payload does not match with packet length");

        return false;
    }

    let cmd = match RtmpCommand::decode(&packet.payload[..packet.header.length]) {
        Ok(c) => c,
        Err(_) => {
            log_debug!(logger, "Packet error: Could not decode RTMP command");

            return false;
        }
    };

    log_trace!(logger, format!("COMMAND: {}", cmd.to_debug_string()));

    match cmd.cmd.as_str() {
        "connect" => {
            handle_rtmp_command_connect(logger, server_context, session_context, write_stream, &cmd)
                .await
        }
        "createStream" => {
            handle_rtmp_command_create_stream(
                logger,
                server_context,
                session_context,
                write_stream,
                &cmd,
            )
            .await
        }
        "publish" => {
            handle_rtmp_command_publish(
                logger,
                server_context,
                session_context,
                write_stream,
                packet,
                &cmd,
            )
            .await
        }
        // play2 carries bandwidth switching parameters this server
        // does not act upon, it is handled as a regular play
        "play" | "play2" => {
            handle_rtmp_command_play(
                logger,
                server_context,
                session_context,
                write_stream,
                packet,
                &cmd,
            )
            .await
        }
        "deleteStream" => {
            let stream_id = match cmd.get_argument("streamId") {
                Some(id) => id.get_integer() as u32,
                None => 0,
            };

            rtmp_delete_stream(logger, server_context, session_context, write_stream, stream_id)
                .await
        }
        "closeStream" => {
            let stream_id = {
                let status = session_context.status.lock().await;

                if status.is_publisher {
                    status.publish_stream_id
                } else {
                    status.play_status.play_stream_id
                }
            };

            rtmp_delete_stream(logger, server_context, session_context, write_stream, stream_id)
                .await
        }
        "receiveAudio" => {
            let receive_audio = match cmd.get_argument("bool") {
                Some(v) => v.get_bool(),
                None => false,
            };

            log_debug!(
                logger,
                format!("Receive audio setting change: {}", receive_audio)
            );

            let mut status = session_context.status.lock().await;
            status.play_status.receive_audio = receive_audio;
            drop(status);

            player_set_receive_audio(server_context, session_context, receive_audio).await;

            true
        }
        "receiveVideo" => {
            let receive_video = match cmd.get_argument("bool") {
                Some(v) => v.get_bool(),
                None => false,
            };

            log_debug!(
                logger,
                format!("Receive video setting change: {}", receive_video)
            );

            let mut status = session_context.status.lock().await;
            status.play_status.receive_video = receive_video;
            drop(status);

            player_set_receive_video(server_context, session_context, receive_video).await;

            true
        }
        "releaseStream" | "FCPublish" | "FCUnpublish" | "pause" => {
            // Acknowledged, no action required
            true
        }
        _ => {
            log_debug!(logger, format!("Unrecognized command: {}", cmd.cmd));

            true
        }
    }
}
