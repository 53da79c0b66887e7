// connect command

use chrono::Utc;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{
        rtmp_make_chunk_size_set_message, rtmp_make_connect_response,
        rtmp_make_peer_bandwidth_set_message, rtmp_make_window_ack, RtmpCommand,
        RTMP_PEER_BANDWIDTH, RTMP_PEER_BANDWIDTH_DYNAMIC, RTMP_WINDOW_ACK,
    },
    server::RtmpServerContext,
    session::{session_write_bytes, SessionReadThreadContext},
    utils::validate_id_string,
};

/// Handles RTMP command (connect)
///
/// Stores the app, then replies with Window Acknowledgement Size,
/// Set Peer Bandwidth, Set Chunk Size and the connect _result.
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `write_stream` - The stream to write to the client
/// * `cmd` - The command to handle
///
/// # Return value
///
/// Returns true to continue receiving chunks. Returns false to end the session main loop.
pub async fn handle_rtmp_command_connect<
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    write_stream: &Mutex<TW>,
    cmd: &RtmpCommand,
) -> bool {
    let config = server_context.config.clone();

    // Load and validate parameters

    let app = match cmd.get_argument("cmdObj") {
        Some(cmd_obj) => match cmd_obj.get_object_property("app") {
            Some(app) => {
                let app_str = app.get_string();

                if !validate_id_string(app_str, config.id_max_length) {
                    log_debug!(
                        logger,
                        format!("Command error: Invalid app value: {}", app_str)
                    );

                    return false;
                }

                app_str.to_string()
            }
            None => {
                log_debug!(logger, "Command error: app property not provided");

                return false;
            }
        },
        None => {
            log_debug!(logger, "Command error: cmdObj argument not provided");

            return false;
        }
    };

    let object_encoding: Option<u32> = match cmd.get_argument("cmdObj") {
        Some(cmd_obj) => match cmd_obj.get_object_property("objectEncoding") {
            Some(oe) => {
                if !oe.is_undefined() {
                    Some(oe.get_integer() as u32)
                } else {
                    None
                }
            }
            None => None,
        },
        None => None,
    };

    let trans_id = match cmd.get_argument("transId") {
        Some(t) => t.get_integer(),
        None => 0,
    };

    let now = Utc::now().timestamp();

    // Update the session status

    let mut session_status_v = session_context.status.lock().await;

    if session_status_v.app.is_some() {
        // Already connected. This command is invalid
        drop(session_status_v);

        log_debug!(logger, "Protocol error: Connect received, but already connected");

        return false;
    }

    session_status_v.app = Some(app.clone());
    session_status_v.connect_time = now;

    drop(session_status_v);

    if config.log_requests {
        logger.log_info(&format!("CONNECT: {}", app));
    }

    // Send window ACK

    let window_ack_bytes = rtmp_make_window_ack(RTMP_WINDOW_ACK);
    if let Err(e) = session_write_bytes(write_stream, &window_ack_bytes).await {
        log_debug!(
            logger,
            format!("Send error: Could not send window ACK: {}", e)
        );
        return false;
    }

    // Set peer bandwidth

    let peer_bandwidth_bytes =
        rtmp_make_peer_bandwidth_set_message(RTMP_PEER_BANDWIDTH, RTMP_PEER_BANDWIDTH_DYNAMIC);
    if let Err(e) = session_write_bytes(write_stream, &peer_bandwidth_bytes).await {
        log_debug!(
            logger,
            format!("Send error: Could not set peer bandwidth: {}", e)
        );
        return false;
    }

    // Set chunk size

    let chunk_size_bytes = rtmp_make_chunk_size_set_message(config.chunk_size as u32);
    if let Err(e) = session_write_bytes(write_stream, &chunk_size_bytes).await {
        log_debug!(
            logger,
            format!("Send error: Could not set chunk size: {}", e)
        );
        return false;
    }

    // Respond

    let connect_response_bytes =
        rtmp_make_connect_response(trans_id, object_encoding, config.chunk_size);
    if let Err(e) = session_write_bytes(write_stream, &connect_response_bytes).await {
        log_debug!(
            logger,
            format!("Send error: Could not send connect response: {}", e)
        );
        return false;
    }

    // Done

    true
}
