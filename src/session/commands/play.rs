// play command

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{
        rtmp_make_sample_access_message, rtmp_make_stream_status_message, RtmpCommand, RtmpPacket,
        STREAM_BEGIN,
    },
    server::{add_player, AddPlayerOptions, RtmpServerContext, RtmpServerEvent},
    session::{send_status_message, session_write_bytes, SessionReadThreadContext},
    utils::validate_id_string,
};

/// Handles RTMP command (play)
///
/// Registers the session as a player of /app/stream_name and replies
/// with the playback start sequence. The media burst (metadata, codec
/// headers, GOP replay) is delivered when the publisher's next media
/// packet fans out.
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `write_stream` - The stream to write to the client
/// * `packet` - The packet the command arrived in
/// * `cmd` - The command to handle
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_command_play<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    write_stream: &Mutex<TW>,
    packet: &RtmpPacket,
    cmd: &RtmpCommand,
) -> bool {
    let config = server_context.config.clone();

    // Load and validate parameters

    let play_stream_id = packet.header.stream_id;

    let app = match session_context.app().await {
        Some(a) => a,
        None => {
            log_debug!(logger, "Protocol error: Received play before connect");

            return false;
        }
    };

    // play carries the stream name as a positional value,
    // play2 carries it inside the params object

    let key = match cmd.get_argument("streamName") {
        Some(k) => k.get_string().to_string(),
        None => match cmd
            .get_argument("params")
            .and_then(|p| p.get_object_property("streamName"))
        {
            Some(k) => k.get_string().to_string(),
            None => {
                log_debug!(logger, "Command error: streamName property not provided");

                return false;
            }
        },
    };

    if !validate_id_string(&key, config.id_max_length) {
        log_debug!(
            logger,
            format!("Command error: Invalid streamName value: {}", key)
        );

        return false;
    }

    if session_context.is_player().await {
        log_debug!(logger, "Protocol error: Received play command, but already playing");

        return false;
    }

    let stream_path = format!("/{}/{}", app, key);

    // Log

    if config.log_requests {
        logger.log_info(&format!("PLAY ({}): {}", play_stream_id, stream_path));
    }

    // Update the session status

    session_context
        .set_player(play_stream_id, &key, &stream_path)
        .await;

    // Send the playback start sequence

    let stream_status_bytes = rtmp_make_stream_status_message(STREAM_BEGIN, play_stream_id);

    if let Err(e) = session_write_bytes(write_stream, &stream_status_bytes).await {
        log_debug!(
            logger,
            format!("Send error: Could not send stream status: {}", e)
        );
        return false;
    }

    if let Err(e) = send_status_message(
        write_stream,
        play_stream_id,
        "status",
        "NetStream.Play.Reset",
        Some("Playing and resetting stream."),
        config.chunk_size,
    )
    .await
    {
        log_debug!(
            logger,
            format!("Send error: Could not send status message: {}", e)
        );
        return false;
    }

    if let Err(e) = send_status_message(
        write_stream,
        play_stream_id,
        "status",
        "NetStream.Play.Start",
        Some("Started playing stream."),
        config.chunk_size,
    )
    .await
    {
        log_debug!(
            logger,
            format!("Send error: Could not send status message: {}", e)
        );
        return false;
    }

    let sample_access_bytes = rtmp_make_sample_access_message(play_stream_id, config.chunk_size);

    if let Err(e) = session_write_bytes(write_stream, &sample_access_bytes).await {
        log_debug!(
            logger,
            format!("Send error: Could not send sample access: {}", e)
        );
        return false;
    }

    // Register as a player of the channel.
    // Registration happens after the start sequence was written, so the
    // media burst coming through the writer task cannot precede it.

    let play_status = session_context.status.lock().await.play_status.clone();

    add_player(
        server_context,
        session_context,
        &stream_path,
        AddPlayerOptions {
            receive_audio: play_status.receive_audio,
            receive_video: play_status.receive_video,
        },
    )
    .await;

    // Fire event

    server_context.notify_event(RtmpServerEvent::PlayStart {
        stream_path: stream_path.clone(),
    });

    // Done

    true
}
