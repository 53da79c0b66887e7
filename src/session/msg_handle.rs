// Session message handling (writer task)

use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{mpsc::Receiver, Mutex},
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{
        rtmp_make_audio_codec_header_message, rtmp_make_metadata_message,
        rtmp_make_stream_status_message, rtmp_make_video_codec_header_message, RtmpPacket,
        RTMP_CODEC_ID_AAC, RTMP_CODEC_ID_H264, RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO, STREAM_EOF,
    },
    server::{RtmpServerConfiguration, RtmpServerContext},
};

use super::{
    do_session_cleanup, send_status_message, session_write_bytes, RtmpSessionMessage,
    SessionContext,
};

/// Checks if a media packet is a codec sequence header
fn packet_is_sequence_header(packet: &RtmpPacket) -> bool {
    let payload = &packet.payload;

    if payload.len() < 2 {
        return false;
    }

    match packet.header.packet_type {
        RTMP_TYPE_VIDEO => {
            let frame_type = (payload[0] >> 4) & 0x0f;
            let codec_id = payload[0] & 0x0f;

            frame_type == 1 && codec_id == RTMP_CODEC_ID_H264 && payload[1] == 0
        }
        RTMP_TYPE_AUDIO => {
            let sound_format = (payload[0] >> 4) & 0x0f;

            sound_format == RTMP_CODEC_ID_AAC as u8 && payload[1] == 0
        }
        _ => false,
    }
}

/// Checks if a media packet is a H.264 keyframe NALU
fn packet_is_keyframe(packet: &RtmpPacket) -> bool {
    let payload = &packet.payload;

    if payload.len() < 2 || packet.header.packet_type != RTMP_TYPE_VIDEO {
        return false;
    }

    let frame_type = (payload[0] >> 4) & 0x0f;
    let codec_id = payload[0] & 0x0f;

    frame_type == 1 && codec_id == RTMP_CODEC_ID_H264 && payload[1] == 1
}

/// Handles session message
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `config` - Server configuration
/// * `session_context` - The session context
/// * `write_stream` - IO stream to write bytes
/// * `msg` - Session message to handle
///
/// # Return value
///
/// Returns true to continue handling messages. Returns false to end the task.
pub async fn handle_session_message<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin>(
    logger: &Logger,
    config: &RtmpServerConfiguration,
    session_context: &SessionContext,
    write_stream: &Mutex<TW>,
    msg: RtmpSessionMessage,
) -> bool {
    match msg {
        RtmpSessionMessage::PlayStart {
            metadata,
            audio_codec,
            aac_sequence_header,
            video_codec,
            avc_sequence_header,
            gop_cache,
        } => {
            log_debug!(logger, "RtmpSessionMessage::PlayStart");

            let play_status = session_context.play_status().await;

            if !play_status.is_player {
                return true;
            }

            let play_stream_id = play_status.play_stream_id;

            // Send metadata

            if !metadata.is_empty() {
                let metadata_bytes =
                    rtmp_make_metadata_message(play_stream_id, &metadata, 0, config.chunk_size);

                if let Err(e) = session_write_bytes(write_stream, &metadata_bytes).await {
                    log_debug!(logger, format!("Send error: Could not send metadata: {}", e));
                    return true;
                }
            }

            // Send video codec header

            if video_codec == RTMP_CODEC_ID_H264 as u32 && !avc_sequence_header.is_empty() {
                let video_codec_header = rtmp_make_video_codec_header_message(
                    play_stream_id,
                    &avc_sequence_header,
                    0,
                    config.chunk_size,
                );

                if let Err(e) = session_write_bytes(write_stream, &video_codec_header).await {
                    log_debug!(
                        logger,
                        format!("Send error: Could not send video codec header: {}", e)
                    );
                    return true;
                }
            }

            // Send audio codec header

            if audio_codec == RTMP_CODEC_ID_AAC as u32 && !aac_sequence_header.is_empty() {
                let audio_codec_header = rtmp_make_audio_codec_header_message(
                    play_stream_id,
                    &aac_sequence_header,
                    0,
                    config.chunk_size,
                );

                if let Err(e) = session_write_bytes(write_stream, &audio_codec_header).await {
                    log_debug!(
                        logger,
                        format!("Send error: Could not send audio codec header: {}", e)
                    );
                    return true;
                }
            }

            // Send the GOP replay, oldest first

            if play_status.receive_gop {
                let mut keyframe_sent = false;

                for packet in gop_cache {
                    if packet.header.packet_type == RTMP_TYPE_AUDIO && !play_status.receive_audio {
                        continue;
                    }

                    if packet.header.packet_type == RTMP_TYPE_VIDEO && !play_status.receive_video {
                        continue;
                    }

                    let packet_bytes =
                        packet.create_chunks_for_stream(play_stream_id, config.chunk_size);

                    if let Err(e) = session_write_bytes(write_stream, &packet_bytes).await {
                        log_debug!(
                            logger,
                            format!("Send error: Could not send GOP cached packet: {}", e)
                        );
                        return true;
                    }

                    if packet_is_keyframe(&packet) {
                        keyframe_sent = true;
                    }
                }

                if keyframe_sent {
                    let mut status = session_context.status.lock().await;
                    status.play_status.has_keyframe = true;
                }
            }

            log_debug!(logger, "Play start burst sent");
        }
        RtmpSessionMessage::PlayMetadata { metadata } => {
            log_debug!(logger, "RtmpSessionMessage::PlayMetadata");

            let (is_player, play_stream_id) = session_context.play_stream_id().await;

            if !is_player || metadata.is_empty() {
                return true;
            }

            let metadata_bytes =
                rtmp_make_metadata_message(play_stream_id, &metadata, 0, config.chunk_size);

            if let Err(e) = session_write_bytes(write_stream, &metadata_bytes).await {
                log_debug!(logger, format!("Send error: Could not send metadata: {}", e));
                return true;
            }
        }
        RtmpSessionMessage::PlayPacket { packet } => {
            let play_status = session_context.play_status().await;

            if !play_status.is_player {
                return true;
            }

            if packet.header.packet_type == RTMP_TYPE_AUDIO && !play_status.receive_audio {
                return true;
            }

            if packet.header.packet_type == RTMP_TYPE_VIDEO && !play_status.receive_video {
                return true;
            }

            // Keyframe gating: until a keyframe was observed, only
            // sequence headers and keyframes may go through

            if !play_status.has_keyframe {
                if packet_is_keyframe(&packet) {
                    let mut status = session_context.status.lock().await;
                    status.play_status.has_keyframe = true;
                } else if !packet_is_sequence_header(&packet) {
                    return true;
                }
            }

            let packet_bytes =
                packet.create_chunks_for_stream(play_status.play_stream_id, config.chunk_size);

            if let Err(e) = session_write_bytes(write_stream, &packet_bytes).await {
                log_debug!(logger, format!("Send error: Could not send packet: {}", e));
                return true;
            }
        }
        RtmpSessionMessage::PlayStop => {
            log_debug!(logger, "RtmpSessionMessage::PlayStop");

            let (is_player, play_stream_id) = session_context.play_stream_id().await;

            if !is_player {
                return true;
            }

            // The stream was unpublished, notify and reset the gating

            if let Err(e) = send_status_message(
                write_stream,
                play_stream_id,
                "status",
                "NetStream.Play.UnpublishNotify",
                Some("stream is now unpublished."),
                config.chunk_size,
            )
            .await
            {
                log_debug!(
                    logger,
                    format!("Send error: Could not send status message: {}", e)
                );
            }

            let stream_status_bytes = rtmp_make_stream_status_message(STREAM_EOF, play_stream_id);

            if let Err(e) = session_write_bytes(write_stream, &stream_status_bytes).await {
                log_debug!(
                    logger,
                    format!("Send error: Could not send stream status: {}", e)
                );
                return true;
            }

            let mut status = session_context.status.lock().await;
            status.play_status.has_keyframe = false;
        }
        RtmpSessionMessage::End => {
            log_debug!(logger, "RtmpSessionMessage::End");

            return false;
        }
    }

    true
}

/// Creates a task to read and handle session messages
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `write_stream` - IO stream to write bytes
/// * `session_msg_receiver` - Receiver for the session messages
pub fn spawn_task_to_read_session_messages<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    mut server_context: RtmpServerContext,
    session_context: SessionContext,
    write_stream: Arc<Mutex<TW>>,
    mut session_msg_receiver: Receiver<RtmpSessionMessage>,
) {
    tokio::spawn(async move {
        let config = server_context.config.clone();
        let mut continue_loop = true;

        while continue_loop {
            let msg_opt = session_msg_receiver.recv().await;

            match msg_opt {
                Some(msg) => {
                    continue_loop = handle_session_message(
                        &logger,
                        &config,
                        &session_context,
                        &write_stream,
                        msg,
                    )
                    .await;
                }
                None => {
                    continue_loop = false;
                }
            }
        }

        // Cleanup

        log_debug!(logger, "Performing session cleanup...");

        do_session_cleanup(&logger, &mut server_context, &session_context).await;

        // Drain the channel to prevent senders from filling it

        while session_msg_receiver.try_recv().is_ok() {}

        log_debug!(logger, "Completed session messages handling task");
    });
}
