// Remove player operation

use crate::server::RtmpServerContext;

/// Removes a player from a channel
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `stream_path` - The stream path
/// * `session_id` - ID of the player session
pub async fn remove_player(
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

    channel_status.players.remove(&session_id);
}
