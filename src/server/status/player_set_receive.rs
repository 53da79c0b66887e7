// Player receive settings operations

use crate::{server::RtmpServerContext, session::SessionReadThreadContext};

/// Updates the receive audio setting of a player
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `receive_audio` - True to receive audio packets
pub async fn player_set_receive_audio(
    server_context: &RtmpServerContext,
    session_context: &SessionReadThreadContext,
    receive_audio: bool,
) {
    let stream_path = {
        let status = session_context.status.lock().await;

        match &status.stream_path {
            Some(p) => p.clone(),
            None => {
                return;
            }
        }
    };

    let status = server_context.status.lock().await;

    let channel_mu = match status.channels.get(&stream_path) {
        Some(c) => c.clone(),
        None => {
            return;
        }
    };

    drop(status);

    let mut channel_status = channel_mu.lock().await;

    if let Some(player) = channel_status.players.get_mut(&session_context.id) {
        player.receive_audio = receive_audio;
    }
}

/// Updates the receive video setting of a player
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `receive_video` - True to receive video packets
pub async fn player_set_receive_video(
    server_context: &RtmpServerContext,
    session_context: &SessionReadThreadContext,
    receive_video: bool,
) {
    let stream_path = {
        let status = session_context.status.lock().await;

        match &status.stream_path {
            Some(p) => p.clone(),
            None => {
                return;
            }
        }
    };

    let status = server_context.status.lock().await;

    let channel_mu = match status.channels.get(&stream_path) {
        Some(c) => c.clone(),
        None => {
            return;
        }
    };

    drop(status);

    let mut channel_status = channel_mu.lock().await;

    if let Some(player) = channel_status.players.get_mut(&session_context.id) {
        player.receive_video = receive_video;
    }
}
