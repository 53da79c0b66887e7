// Remove publisher operation

use crate::{server::RtmpServerContext, session::RtmpSessionMessage};

/// Removes the publisher of a channel and notifies the players
/// the stream was unpublished
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `stream_path` - The stream path
/// * `session_id` - ID of the publisher session
pub async fn remove_publisher(
    server_context: &RtmpServerContext,
    stream_path: &str,
    session_id: u64,
) {
    let status = server_context.status.lock().await;

    let channel_mu = match status.channels.get(stream_path) {
        Some(c) => c.clone(),
        None => {
            return;
        }
    };

    drop(status);

    let mut channel_status = channel_mu.lock().await;

    if channel_status.publisher_id != Some(session_id) {
        return; // Not the publisher session
    }

    channel_status.publishing = false;
    channel_status.publisher_id = None;
    channel_status.publish_status = None;

    for player in channel_status.players.values_mut() {
        if player.started {
            let _ = player
                .message_sender
                .try_send(RtmpSessionMessage::PlayStop);
        }

        player.started = false;
    }
}
