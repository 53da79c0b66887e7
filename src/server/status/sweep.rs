// Periodic channel sweep

use std::{sync::Arc, time::Duration};

use crate::{log::Logger, log_debug, server::RtmpServerContext};

/// Interval between channel sweeps (seconds)
pub const CHANNEL_SWEEP_INTERVAL_SECONDS: u64 = 30;

/// Removes idle channels.
///
/// A channel is idle when it has no publisher and every player
/// session went away.
///
/// # Arguments
///
/// * `server_context` - The server context
///
/// # Return value
///
/// Returns the number of removed channels
pub async fn sweep_channels(server_context: &RtmpServerContext) -> usize {
    let mut status = server_context.status.lock().await;

    let mut idle_channels: Vec<String> = Vec::new();

    for (stream_path, channel_mu) in status.channels.iter() {
        let mut channel_status = channel_mu.lock().await;

        channel_status
            .players
            .retain(|_, p| !p.message_sender.is_closed());

        if !channel_status.publishing && channel_status.players.is_empty() {
            idle_channels.push(stream_path.clone());
        }
    }

    let removed = idle_channels.len();

    for stream_path in idle_channels {
        status.channels.remove(&stream_path);
    }

    removed
}

/// Creates a task to periodically remove idle channels
///
/// # Arguments
///
/// * `logger` - The logger
/// * `server_context` - The server context
pub fn spawn_task_to_sweep_channels(logger: Arc<Logger>, server_context: RtmpServerContext) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(CHANNEL_SWEEP_INTERVAL_SECONDS)).await;

            let removed = sweep_channels(&server_context).await;

            if removed > 0 {
                log_debug!(logger, format!("Sweep removed {} idle channels", removed));
            }
        }
    });
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{
        RtmpChannelStatus, RtmpPlayerStatus, RtmpServerConfiguration, RtmpServerStatus,
    };
    use crate::session::RtmpSessionMessage;
    use tokio::sync::{mpsc, Mutex};

    fn test_context() -> RtmpServerContext {
        RtmpServerContext {
            config: Arc::new(RtmpServerConfiguration {
                port: 1935,
                bind_address: "127.0.0.1".to_string(),
                chunk_size: 4096,
                gop_cache_len: 256,
                msg_buffer_size: 8,
                id_max_length: 128,
                log_requests: false,
            }),
            status: Arc::new(Mutex::new(RtmpServerStatus::new())),
            event_sender: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_idle_channels() {
        let context = test_context();

        // An idle channel, a publishing one and one with a live player

        let (live_sender, _live_receiver) = mpsc::channel::<RtmpSessionMessage>(8);
        let (dead_sender, dead_receiver) = mpsc::channel::<RtmpSessionMessage>(8);
        drop(dead_receiver);

        {
            let mut status = context.status.lock().await;

            status.channels.insert(
                "/live/idle".to_string(),
                Arc::new(Mutex::new(RtmpChannelStatus::new())),
            );

            let mut publishing = RtmpChannelStatus::new();
            publishing.publishing = true;
            publishing.publisher_id = Some(1);
            status
                .channels
                .insert("/live/active".to_string(), Arc::new(Mutex::new(publishing)));

            let mut with_player = RtmpChannelStatus::new();
            with_player.players.insert(
                2,
                RtmpPlayerStatus {
                    message_sender: live_sender,
                    started: false,
                    receive_audio: true,
                    receive_video: true,
                },
            );
            status.channels.insert(
                "/live/watched".to_string(),
                Arc::new(Mutex::new(with_player)),
            );

            let mut with_dead_player = RtmpChannelStatus::new();
            with_dead_player.players.insert(
                3,
                RtmpPlayerStatus {
                    message_sender: dead_sender,
                    started: true,
                    receive_audio: true,
                    receive_video: true,
                },
            );
            status.channels.insert(
                "/live/abandoned".to_string(),
                Arc::new(Mutex::new(with_dead_player)),
            );
        }

        let removed = sweep_channels(&context).await;

        assert_eq!(removed, 2);

        let status = context.status.lock().await;

        assert!(!status.channels.contains_key("/live/idle"));
        assert!(!status.channels.contains_key("/live/abandoned"));
        assert!(status.channels.contains_key("/live/active"));
        assert!(status.channels.contains_key("/live/watched"));
    }
}
