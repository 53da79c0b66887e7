// Set publisher operation

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    server::{RtmpChannelStatus, RtmpServerContext},
    session::SessionReadThreadContext,
};

/// Sets the publisher of a channel, creating the channel if it does not
/// exist. Fails if the channel already has a publisher: the existing
/// session keeps it.
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `stream_path` - The stream path
///
/// # Return value
///
/// Returns true on success, false if another session is already publishing.
pub async fn set_publisher(
    server_context: &RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    stream_path: &str,
) -> bool {
    let mut status = server_context.status.lock().await;

    let channel_mu = status
        .channels
        .entry(stream_path.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(RtmpChannelStatus::new())))
        .clone();

    drop(status);

    let mut channel_status = channel_mu.lock().await;

    if channel_status.publishing {
        return false;
    }

    channel_status.publishing = true;
    channel_status.publisher_id = Some(session_context.id);
    channel_status.publish_status = Some(session_context.publish_status.clone());

    // Every player starts from a clean burst with the new stream

    for player in channel_status.players.values_mut() {
        player.started = false;
    }

    drop(channel_status);

    // Reset the publishing state for the fresh stream

    let mut publish_status = session_context.publish_status.lock().await;
    publish_status.reset();
    drop(publish_status);

    session_context.read_status.channel_status = Some(channel_mu);

    true
}
