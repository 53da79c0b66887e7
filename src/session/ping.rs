// Logic to send pings to the client

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{mpsc::Receiver, Mutex},
};

use crate::{
    log::Logger,
    rtmp::{rtmp_make_ping_request, RTMP_PING_TIME},
    server::RtmpServerConfiguration,
    session::session_write_bytes,
};

use super::RtmpSessionStatus;

/// Creates a task to periodically send ping requests to the client
///
/// # Arguments
///
/// * `write_stream` - IO stream to write bytes
/// * `config` - Server configuration
/// * `session_status` - Session status
/// * `cancel_pings_receiver` - Receiver to cancel the task
/// * `logger` - Session logger
pub fn spawn_task_to_send_pings<TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static>(
    write_stream: Arc<Mutex<TW>>,
    config: Arc<RtmpServerConfiguration>,
    session_status: Arc<Mutex<RtmpSessionStatus>>,
    mut cancel_pings_receiver: Receiver<()>,
    logger: Arc<Logger>,
) {
    tokio::spawn(async move {
        let mut finished = false;

        while !finished {
            // Wait
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(RTMP_PING_TIME)) => {}
                _ = cancel_pings_receiver.recv() => {
                    finished = true;
                    continue;
                }
            }

            // Check status
            let session_status_v = session_status.lock().await;

            if session_status_v.app.is_none() {
                drop(session_status_v);
                continue; // Not connected, can't send ping yet
            }

            let connect_time = session_status_v.connect_time;
            drop(session_status_v);

            // Create and send the ping packet

            let packet_bytes = rtmp_make_ping_request(connect_time, config.chunk_size);

            match session_write_bytes(&write_stream, &packet_bytes).await {
                Ok(_) => {
                    if config.log_requests && logger.config.debug_enabled {
                        logger.log_debug("Sent ping request to client");
                    }
                }
                Err(e) => {
                    if config.log_requests && logger.config.debug_enabled {
                        logger.log_debug(&format!("Could not send ping request: {}", e));
                    }

                    finished = true;
                }
            }
        }
    });
}
