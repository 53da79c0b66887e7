// Channel clearing operation

use crate::server::RtmpServerContext;

/// Removes a channel if it has no players and no publisher
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `stream_path` - The stream path
pub async fn try_clear_channel(server_context: &RtmpServerContext, stream_path: &str) {
    let mut status = server_context.status.lock().await;

    let is_idle = match status.channels.get(stream_path) {
        Some(channel_mu) => {
            let channel_status = channel_mu.lock().await;

            !channel_status.publishing && channel_status.players.is_empty()
        }
        None => false,
    };

    if is_idle {
        status.channels.remove(stream_path);
    }
}
