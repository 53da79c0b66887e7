// RTMP server

mod config;
mod connection_handle;
mod context;
mod events;
mod session_id_generator;
mod status;
mod tcp;

use std::sync::Arc;

pub use config::*;
pub use connection_handle::*;
pub use context::*;
pub use events::*;
pub use session_id_generator::*;
pub use status::*;
pub use tcp::*;

use tokio::sync::{mpsc::Sender, Mutex};

use crate::log::Logger;

/// Runs the RTMP server
///
/// # Arguments
///
/// * `logger` - The logger
/// * `config` - The server configuration
/// * `server_status` - The server status
/// * `event_sender` - Optional sender to receive server events
pub async fn run_server(
    logger: Logger,
    config: Arc<RtmpServerConfiguration>,
    server_status: Arc<Mutex<RtmpServerStatus>>,
    event_sender: Option<Sender<RtmpServerEvent>>,
) {
    let session_id_generator = Arc::new(Mutex::new(SessionIdGenerator::new()));

    let server_context = RtmpServerContext {
        config: config.clone(),
        status: server_status,
        event_sender,
    };

    // Periodic sweep of idle channels

    spawn_task_to_sweep_channels(
        Arc::new(logger.make_child_logger("[SWEEP] ")),
        server_context.clone(),
    );

    // TCP server

    let (end_notifier_tcp, mut end_receiver_tcp) = tokio::sync::mpsc::channel::<()>(1);

    tcp_server(
        Arc::new(logger.make_child_logger("[SERVER:TCP] ")),
        RtmpServerContextExtended {
            context: server_context,
            session_id_generator,
        },
        end_notifier_tcp,
    );

    end_receiver_tcp
        .recv()
        .await
        .expect("could not receive signal from TCP server task");
}
