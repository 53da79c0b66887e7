// Add player operation

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    server::{RtmpChannelStatus, RtmpPlayerStatus, RtmpServerContext},
    session::SessionReadThreadContext,
};

/// Options to add a player to a channel
pub struct AddPlayerOptions {
    /// Receive audio
    pub receive_audio: bool,

    /// Receive video
    pub receive_video: bool,
}

/// Adds a player to a channel, creating the channel if it does not exist.
///
/// The player stays idle until the publisher's next media packet fans
/// out, which delivers the start burst.
///
/// # Arguments
///
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `stream_path` - The stream path
/// * `player_options` - The player options
pub async fn add_player(
    server_context: &RtmpServerContext,
    session_context: &mut SessionReadThreadContext,
    stream_path: &str,
    player_options: AddPlayerOptions,
) {
    let mut status = server_context.status.lock().await;

    let channel_mu = status
        .channels
        .entry(stream_path.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(RtmpChannelStatus::new())))
        .clone();

    drop(status);

    let mut channel_status = channel_mu.lock().await;

    channel_status.players.insert(
        session_context.id,
        RtmpPlayerStatus {
            message_sender: session_context.session_msg_sender.clone(),
            started: false,
            receive_audio: player_options.receive_audio,
            receive_video: player_options.receive_video,
        },
    );

    drop(channel_status);

    session_context.read_status.channel_status = Some(channel_mu);
}
