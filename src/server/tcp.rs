// TCP server

use std::{net::IpAddr, sync::Arc};

use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    sync::{mpsc::Sender, Mutex},
};

use crate::log::Logger;

use super::{handle_connection, RtmpServerContextExtended};

/// Runs the TCP server
///
/// # Arguments
///
/// * `logger` - The server logger
/// * `server_context` - The server context
/// * `end_notifier` - Sender to notify the main task when the server dies
pub fn tcp_server(
    logger: Arc<Logger>,
    server_context: RtmpServerContextExtended,
    end_notifier: Sender<()>,
) {
    tokio::spawn(async move {
        let listen_addr = server_context.context.config.get_tcp_listen_addr();

        // Create listener

        let listener = match TcpListener::bind(&listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                logger.log_error(&format!("Could not create TCP listener: {}", e));
                end_notifier
                    .send(())
                    .await
                    .expect("failed to notify the main task");
                return;
            }
        };

        logger.log_info(&format!("Listening on {}", listen_addr));

        loop {
            match listener.accept().await {
                Ok((connection, addr)) => {
                    // Handle connection
                    handle_connection_tcp(
                        logger.clone(),
                        server_context.clone(),
                        connection,
                        addr.ip(),
                    );
                }
                Err(e) => {
                    logger.log_error(&format!("Could not accept connection: {}", e));
                    end_notifier
                        .send(())
                        .await
                        .expect("failed to notify the main task");
                    return;
                }
            }
        }
    });
}

fn handle_connection_tcp(
    logger: Arc<Logger>,
    server_context: RtmpServerContextExtended,
    connection: TcpStream,
    ip: IpAddr,
) {
    tokio::spawn(async move {
        let _ = connection.set_nodelay(true);

        let (read_stream, write_stream) = connection.into_split();
        let write_stream_mu = Arc::new(Mutex::new(write_stream));

        handle_connection(
            logger,
            server_context,
            read_stream,
            write_stream_mu.clone(),
            ip,
        )
        .await;

        // Ensure the connection is closed

        let mut write_stream_v = write_stream_mu.lock().await;
        let _ = write_stream_v.shutdown().await;
    });
}
