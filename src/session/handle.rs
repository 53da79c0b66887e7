// Logic to handle RTMP sessions

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{mpsc, Mutex},
};

use crate::{
    log::Logger,
    log_debug, log_error,
    rtmp::{
        generate_s0_s1_s2, rtmp_check_version, rtmp_make_ack, RTMP_PING_TIMEOUT, RTMP_SIG_SIZE,
    },
    server::RtmpServerContext,
};

use super::{
    handle_rtmp_packet, read_rtmp_chunk, session_write_bytes, spawn_task_to_read_session_messages,
    spawn_task_to_send_pings, RtmpSessionMessage, RtmpSessionReadStatus, SessionContext,
    SessionReadThreadContext,
};

/// Performs the server side of the RTMP handshake
///
/// Reads C0 + C1, validates the version, sends S0 + S1 + S2 and reads C2.
/// An unsupported version closes the connection before any reply is sent.
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `read_stream` - The stream to read from the client
/// * `write_stream` - The stream to write to the client
///
/// # Return value
///
/// Returns true on success, false if the connection must be closed.
async fn perform_server_handshake<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin,
>(
    logger: &Logger,
    read_stream: &mut TR,
    write_stream: &Mutex<TW>,
) -> bool {
    // Read C0 + C1

    let mut c0_c1: Vec<u8> = vec![0; 1 + RTMP_SIG_SIZE];

    match tokio::time::timeout(
        Duration::from_secs(RTMP_PING_TIMEOUT),
        read_stream.read_exact(&mut c0_c1),
    )
    .await
    {
        Ok(r) => {
            if let Err(e) = r {
                log_debug!(logger, format!("BAD HANDSHAKE: Could not read C0 + C1: {}", e));
                return false;
            }
        }
        Err(_) => {
            log_debug!(logger, "BAD HANDSHAKE: Could not read C0 + C1: Timed out");
            return false;
        }
    }

    if !rtmp_check_version(c0_c1[0]) {
        log_debug!(
            logger,
            format!("BAD HANDSHAKE: Unsupported RTMP version: {}", c0_c1[0])
        );
        return false;
    }

    // Send S0 + S1 + S2

    let s0_s1_s2 = match generate_s0_s1_s2(&c0_c1[1..]) {
        Ok(b) => b,
        Err(_) => {
            log_error!(logger, "BAD HANDSHAKE: Could not generate S0 + S1 + S2");
            return false;
        }
    };

    if let Err(e) = session_write_bytes(write_stream, &s0_s1_s2).await {
        log_debug!(
            logger,
            format!("BAD HANDSHAKE: Could not send S0 + S1 + S2: {}", e)
        );
        return false;
    }

    // Read C2

    let mut c2: Vec<u8> = vec![0; RTMP_SIG_SIZE];

    match tokio::time::timeout(
        Duration::from_secs(RTMP_PING_TIMEOUT),
        read_stream.read_exact(&mut c2),
    )
    .await
    {
        Ok(r) => {
            if let Err(e) = r {
                log_debug!(logger, format!("BAD HANDSHAKE: Could not read C2: {}", e));
                return false;
            }
        }
        Err(_) => {
            log_debug!(logger, "BAD HANDSHAKE: Could not read C2: Timed out");
            return false;
        }
    }

    true
}

/// Handles RTMP session
///
/// # Arguments
///
/// * `logger` - The session logger
/// * `server_context` - The server context
/// * `session_context` - The session context
/// * `read_stream` - The stream to read from the client
/// * `write_stream` - The stream to write to the client
pub async fn handle_rtmp_session<
    TR: AsyncRead + AsyncReadExt + Send + Sync + Unpin,
    TW: AsyncWrite + AsyncWriteExt + Send + Sync + Unpin + 'static,
>(
    logger: Arc<Logger>,
    server_context: RtmpServerContext,
    session_context: SessionContext,
    mut read_stream: TR,
    write_stream: Arc<Mutex<TW>>,
) {
    // Handshake

    if !perform_server_handshake(&logger, &mut read_stream, &write_stream).await {
        return;
    }

    log_debug!(logger, "Handshake completed");

    // Create the session message channel and spawn the writer task

    let (session_msg_sender, session_msg_receiver) =
        mpsc::channel::<RtmpSessionMessage>(server_context.config.msg_buffer_size);

    spawn_task_to_read_session_messages(
        logger.clone(),
        server_context.clone(),
        session_context.clone(),
        write_stream.clone(),
        session_msg_receiver,
    );

    // Spawn the ping task

    let (cancel_pings_sender, cancel_pings_receiver) = mpsc::channel::<()>(1);

    spawn_task_to_send_pings(
        write_stream.clone(),
        server_context.config.clone(),
        session_context.status.clone(),
        cancel_pings_receiver,
        logger.clone(),
    );

    // Read loop

    let mut server_context_v = server_context.clone();

    let mut read_context = SessionReadThreadContext {
        id: session_context.id,
        ip: session_context.ip,
        status: session_context.status.clone(),
        publish_status: session_context.publish_status.clone(),
        session_msg_sender: session_msg_sender.clone(),
        read_status: RtmpSessionReadStatus::new(),
    };

    let mut continue_loop = true;

    while continue_loop {
        match read_rtmp_chunk(&mut read_stream, &mut read_context.read_status, &logger).await {
            Ok(packet_opt) => {
                if let Some(packet) = packet_opt {
                    continue_loop = handle_rtmp_packet(
                        &logger,
                        &mut server_context_v,
                        &mut read_context,
                        &write_stream,
                        &packet,
                    )
                    .await;
                }

                // Acknowledge received bytes when the window is exceeded

                let ack_window = read_context.read_status.ack_window as u64;

                if continue_loop
                    && ack_window > 0
                    && read_context.read_status.bytes_since_ack >= ack_window
                {
                    let ack_bytes =
                        rtmp_make_ack(read_context.read_status.bytes_since_ack as u32);

                    read_context.read_status.bytes_since_ack = 0;

                    if session_write_bytes(&write_stream, &ack_bytes).await.is_err() {
                        continue_loop = false;
                    }
                }

                if continue_loop && read_context.is_killed().await {
                    log_debug!(logger, "Session killed");
                    continue_loop = false;
                }
            }
            Err(_) => {
                continue_loop = false;
            }
        }
    }

    // Teardown: stop the ping task and end the writer task,
    // which performs the session cleanup

    let _ = cancel_pings_sender.send(()).await;
    let _ = session_msg_sender.send(RtmpSessionMessage::End).await;
}
