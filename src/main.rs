// Main

use std::sync::Arc;

use rtmp_relay::log::{LogConfig, Logger};
use rtmp_relay::server::{run_server, RtmpServerConfiguration, RtmpServerEvent, RtmpServerStatus};
use rtmp_relay::utils::get_env_bool;
use tokio::sync::Mutex;

/// Buffer size of the server event channel
const EVENT_CHANNEL_BUFFER_SIZE: usize = 16;

/// Main function
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Initialize logger

    let logger = Logger::new(LogConfig {
        prefix: "".to_string(),
        error_enabled: get_env_bool("LOG_ERROR", true),
        warning_enabled: get_env_bool("LOG_WARNING", true),
        info_enabled: get_env_bool("LOG_INFO", true),
        debug_enabled: get_env_bool("LOG_DEBUG", false),
        trace_enabled: get_env_bool("LOG_TRACE", get_env_bool("LOG_DEBUG", false)),
    });

    // Initialize server status

    let server_status = Arc::new(Mutex::new(RtmpServerStatus::new()));

    // Print version

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    logger.log_info(&format!("RTMP Relay ({VERSION})"));

    // Load configuration

    let server_config = match RtmpServerConfiguration::load_from_env(&logger) {
        Ok(c) => Arc::new(c),
        Err(_) => {
            std::process::exit(1);
        }
    };

    // Create the event channel and log the received events

    let (event_sender, mut event_receiver) =
        tokio::sync::mpsc::channel::<RtmpServerEvent>(EVENT_CHANNEL_BUFFER_SIZE);

    let event_logger = logger.make_child_logger("[EVENT] ");

    tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            event_logger.log_info(&format!(
                "{}: {}",
                event.event_type(),
                event.stream_path()
            ));
        }
    });

    // Run server

    run_server(logger, server_config, server_status, Some(event_sender)).await;

    // End of main

    Ok(())
}
