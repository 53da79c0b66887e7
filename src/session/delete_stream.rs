// Stream deletion util

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug, log_info,
    server::{
        remove_player, remove_publisher, try_clear_channel, RtmpServerContext, RtmpServerEvent,
    },
};

use super::{send_status_message, SessionReadThreadContext};

/// Deletes RTMP stream
///
/// Unregisters the session from its channel, sends the corresponding
/// status messages and fires the stop events
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `write_stream` - The stream to write to the client
/// * `stream_id` - ID of the RTMP stream to delete
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn rtmp_delete_stream<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static>(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    write_stream: &Mutex<TW>,
    stream_id: u32,
) -> bool {
    let mut session_status_v = session_context.status.lock().await;

    let stream_path = match &session_status_v.stream_path {
        Some(p) => p.clone(),
        None => {
            log_debug!(
                logger,
                "Protocol error: Trying to delete a stream before publish or play"
            );

            return true;
        }
    };

    let is_play_stream =
        session_status_v.play_status.is_player && stream_id == session_status_v.play_status.play_stream_id;

    if is_play_stream {
        session_status_v.play_status.is_player = false;
        session_status_v.play_status.play_stream_id = 0;
        session_status_v.play_status.has_keyframe = false;
    }

    let is_publish_stream =
        session_status_v.is_publisher && stream_id == session_status_v.publish_stream_id;

    if is_publish_stream {
        session_status_v.is_publisher = false;
        session_status_v.publish_stream_id = 0;
    }

    drop(session_status_v);

    if is_play_stream {
        log_info!(logger, format!("PLAY STOP: {}", stream_path));

        if let Err(e) = send_status_message(
            write_stream,
            stream_id,
            "status",
            "NetStream.Play.Stop",
            Some("Stopped playing stream."),
            server_context.config.chunk_size,
        )
        .await
        {
            log_debug!(
                logger,
                format!("Send error: Could not send status message: {}", e)
            );
        }

        remove_player(server_context, &stream_path, session_context.id).await;

        server_context.notify_event(RtmpServerEvent::PlayStop {
            stream_path: stream_path.clone(),
        });
    }

    if is_publish_stream {
        log_info!(logger, format!("PUBLISH STOP: {}", stream_path));

        if let Err(e) = send_status_message(
            write_stream,
            stream_id,
            "status",
            "NetStream.Unpublish.Success",
            Some("Stream unpublished."),
            server_context.config.chunk_size,
        )
        .await
        {
            log_debug!(
                logger,
                format!("Send error: Could not send status message: {}", e)
            );
        }

        remove_publisher(server_context, &stream_path, session_context.id).await;

        server_context.notify_event(RtmpServerEvent::PublishStop {
            stream_path: stream_path.clone(),
        });
    }

    if is_play_stream || is_publish_stream {
        // Reset the chunk decoding contexts
        session_context.read_status.packets.clear();
        session_context.read_status.channel_status = None;

        try_clear_channel(server_context, &stream_path).await;
    }

    true
}
