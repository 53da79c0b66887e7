// Set channel metadata operation

use std::sync::Arc;

use crate::server::RtmpServerContext;

/// Stores the stream metadata and broadcasts it to the players
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `stream_path` - The stream path
/// * `session_id` - ID of the session providing the metadata
/// * `metadata` - The encoded metadata
pub async fn set_channel_metadata(
    server_context: &RtmpServerContext,
    stream_path: &str,
    session_id: u64,
    metadata: Arc<Vec<u8>>,
) {
    let status = server_context.status.lock().await;

    let channel_mu = match status.channels.get(stream_path) {
        Some(c) => c.clone(),
        None => {
            return;
        }
    };

    drop(status);

    let channel_status = channel_mu.lock().await;

    if channel_status.publisher_id != Some(session_id) {
        return; // Only the publisher may set the metadata
    }

    channel_status.send_metadata(metadata);
}
