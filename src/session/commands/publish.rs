// publish command

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{RtmpCommand, RtmpPacket},
    server::{set_publisher, RtmpServerContext, RtmpServerEvent},
    session::{send_status_message, SessionReadThreadContext},
    utils::validate_id_string,
};

/// Handles RTMP command (publish)
///
/// Registers the session as the publisher of /app/stream_name.
/// A duplicate publisher is rejected with NetStream.Publish.BadName,
/// a session publishing twice with NetStream.Publish.BadConnection.
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
pub async fn handle_rtmp_command_publish<
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

    let publish_stream_id = packet.header.stream_id;

    let app = match session_context.app().await {
        Some(a) => a,
        None => {
            log_debug!(logger, "Protocol error: Received publish before connect");

            if let Err(e) = send_status_message(
                write_stream,
                publish_stream_id,
                "error",
                "NetStream.Publish.BadConnection",
                Some("No app was selected"),
                config.chunk_size,
            )
            .await
            {
                log_debug!(
                    logger,
                    format!("Send error: Could not send status message: {}", e)
                );
            }

            return false;
        }
    };

    let key = match cmd.get_argument("streamName") {
        Some(k) => k.get_string().to_string(),
        None => {
            log_debug!(logger, "Command error: streamName property not provided");

            if let Err(e) = send_status_message(
                write_stream,
                publish_stream_id,
                "error",
                "NetStream.Publish.BadName",
                Some("No stream name provided"),
                config.chunk_size,
            )
            .await
            {
                log_debug!(
                    logger,
                    format!("Send error: Could not send status message: {}", e)
                );
            }

            return false;
        }
    };

    if !validate_id_string(&key, config.id_max_length) {
        log_debug!(
            logger,
            format!("Command error: Invalid streamName value: {}", key)
        );

        if let Err(e) = send_status_message(
            write_stream,
            publish_stream_id,
            "error",
            "NetStream.Publish.BadName",
            Some("Invalid stream name provided"),
            config.chunk_size,
        )
        .await
        {
            log_debug!(
                logger,
                format!("Send error: Could not send status message: {}", e)
            );
        }

        return false;
    }

    let stream_path = format!("/{}/{}", app, key);

    // Ensure the session is not already publishing

    if session_context.is_publisher().await {
        log_debug!(logger, "Protocol error: Received publish command, but already publishing");

        if let Err(e) = send_status_message(
            write_stream,
            publish_stream_id,
            "error",
            "NetStream.Publish.BadConnection",
            Some("Connection already publishing"),
            config.chunk_size,
        )
        .await
        {
            log_debug!(
                logger,
                format!("Send error: Could not send status message: {}", e)
            );
        }

        return false;
    }

    // Try to register as the publisher of the stream path

    if !set_publisher(server_context, session_context, &stream_path).await {
        log_debug!(logger, "Cannot publish: Another session is already publishing on the path");

        if let Err(e) = send_status_message(
            write_stream,
            publish_stream_id,
            "error",
            "NetStream.Publish.BadName",
            Some("Stream already publishing"),
            config.chunk_size,
        )
        .await
        {
            log_debug!(
                logger,
                format!("Send error: Could not send status message: {}", e)
            );
        }

        return false;
    }

    // Log

    if config.log_requests {
        logger.log_info(&format!("PUBLISH ({}): {}", publish_stream_id, stream_path));
    }

    // Set publishing status to the session status

    session_context
        .set_publisher(publish_stream_id, &key, &stream_path)
        .await;

    // Respond with status message

    if let Err(e) = send_status_message(
        write_stream,
        publish_stream_id,
        "status",
        "NetStream.Publish.Start",
        Some(&format!("{} is now published.", stream_path)),
        config.chunk_size,
    )
    .await
    {
        log_debug!(
            logger,
            format!("Send error: Could not send status message: {}", e)
        );
    }

    // Fire event

    server_context.notify_event(RtmpServerEvent::PublishStart {
        stream_path: stream_path.clone(),
    });

    // Done

    true
}
