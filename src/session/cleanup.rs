// Session cleanup logic

use crate::{
    log::Logger,
    log_debug,
    server::{remove_player, remove_publisher, try_clear_channel, RtmpServerContext, RtmpServerEvent},
};

use super::SessionContext;

/// Performs session cleanup
///
/// Removes the session from its channel and fires the stop events
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
pub async fn do_session_cleanup(
    logger: &Logger,
    server_context: &mut RtmpServerContext,
    session_context: &SessionContext,
) {
    let mut session_status_v = session_context.status.lock().await;

    let stream_path = match &session_status_v.stream_path {
        Some(p) => p.clone(),
        None => {
            return; // Never joined a channel, nothing to do
        }
    };

    let must_clear_player = session_status_v.play_status.is_player;
    let must_clear_publisher = session_status_v.is_publisher;

    session_status_v.play_status.is_player = false;
    session_status_v.is_publisher = false;

    drop(session_status_v);

    if must_clear_player {
        log_debug!(logger, "Cleanup: Removing player from channel");

        remove_player(server_context, &stream_path, session_context.id).await;

        server_context.notify_event(RtmpServerEvent::PlayStop {
            stream_path: stream_path.clone(),
        });
    }

    if must_clear_publisher {
        log_debug!(logger, "Cleanup: Removing publisher from channel");

        remove_publisher(server_context, &stream_path, session_context.id).await;

        server_context.notify_event(RtmpServerEvent::PublishStop {
            stream_path: stream_path.clone(),
        });
    }

    if must_clear_player || must_clear_publisher {
        try_clear_channel(server_context, &stream_path).await;
    }
}
