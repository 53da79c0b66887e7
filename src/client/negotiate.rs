// Client session negotiation

use byteorder::{BigEndian, ByteOrder};
use tokio::{io::AsyncRead, net::tcp::OwnedReadHalf};

use crate::{
    amf::{AMF0Properties, AMF0Value},
    log::Logger,
    log_debug,
    rtmp::{
        rtmp_make_chunk_size_set_message, rtmp_make_invoke_message, RtmpCommand, RtmpPacket,
        RtmpUrl, RTMP_MAX_IN_CHUNK_SIZE, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT,
        RTMP_TYPE_EVENT, RTMP_TYPE_INVOKE, RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH,
        RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
    },
    session::{read_rtmp_chunk, session_write_bytes, RtmpSessionReadStatus},
};

use super::{RtmpClientConnection, RtmpClientError};

/// What the client is negotiating for
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum RtmpClientMode {
    /// Publish a stream
    Publish,

    /// Play a stream
    Play,
}

/// Reads packets until a non-control message arrives.
/// Control messages (chunk size, acknowledgements, user control)
/// are applied to the read status and consumed.
pub(crate) async fn read_client_packet<TR: AsyncRead + Send + Sync + Unpin>(
    read_stream: &mut TR,
    read_status: &mut RtmpSessionReadStatus,
    logger: &Logger,
) -> Result<RtmpPacket, RtmpClientError> {
    loop {
        let packet = match read_rtmp_chunk(read_stream, read_status, logger).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                continue;
            }
            Err(_) => {
                return Err(RtmpClientError::Closed);
            }
        };

        match packet.header.packet_type {
            RTMP_TYPE_SET_CHUNK_SIZE => {
                if packet.payload.len() < 4 {
                    return Err(RtmpClientError::Protocol(
                        "chunk size message too short".to_string(),
                    ));
                }

                let chunk_size =
                    (BigEndian::read_u32(&packet.payload[0..4]) & 0x7fffffff) as usize;

                if chunk_size == 0 || chunk_size > RTMP_MAX_IN_CHUNK_SIZE {
                    return Err(RtmpClientError::Protocol(format!(
                        "invalid chunk size: {}",
                        chunk_size
                    )));
                }

                read_status.in_chunk_size = chunk_size;

                log_debug!(logger, format!("Server set chunk size: {}", chunk_size));
            }
            RTMP_TYPE_ABORT => {
                if packet.payload.len() >= 4 {
                    let channel_id = BigEndian::read_u32(&packet.payload[0..4]);

                    read_status.packets.remove(&channel_id);
                }
            }
            RTMP_TYPE_ACKNOWLEDGEMENT
            | RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE
            | RTMP_TYPE_SET_PEER_BANDWIDTH
            | RTMP_TYPE_EVENT => {
                // Informational, nothing to do
            }
            _ => {
                return Ok(packet);
            }
        }
    }
}

/// Extracts the code of the info object of a command
fn command_info_code(cmd: &RtmpCommand) -> String {
    match cmd.get_argument("info") {
        Some(info) => match info.get_object_property("code") {
            Some(code) => code.get_string().to_string(),
            None => "".to_string(),
        },
        None => "".to_string(),
    }
}

/// Waits for the _result of a command, by transaction id
async fn wait_for_result(
    read_stream: &mut OwnedReadHalf,
    read_status: &mut RtmpSessionReadStatus,
    trans_id: i64,
    logger: &Logger,
) -> Result<RtmpCommand, RtmpClientError> {
    loop {
        let packet = read_client_packet(read_stream, read_status, logger).await?;

        if packet.header.packet_type != RTMP_TYPE_INVOKE {
            continue;
        }

        let cmd = RtmpCommand::decode(&packet.payload[..packet.header.length])
            .map_err(|_| RtmpClientError::Protocol("could not decode command".to_string()))?;

        match cmd.cmd.as_str() {
            "_result" => {
                let result_trans_id = match cmd.get_argument("transId") {
                    Some(t) => t.get_integer(),
                    None => 0,
                };

                if result_trans_id == trans_id {
                    return Ok(cmd);
                }
            }
            "_error" => {
                return Err(RtmpClientError::Rejected(command_info_code(&cmd)));
            }
            _ => {}
        }
    }
}

/// Waits for an onStatus command and returns its code.
/// An error level status fails with Rejected.
async fn wait_for_status(
    read_stream: &mut OwnedReadHalf,
    read_status: &mut RtmpSessionReadStatus,
    expected_code: &str,
    logger: &Logger,
) -> Result<(), RtmpClientError> {
    loop {
        let packet = read_client_packet(read_stream, read_status, logger).await?;

        if packet.header.packet_type != RTMP_TYPE_INVOKE {
            continue;
        }

        let cmd = RtmpCommand::decode(&packet.payload[..packet.header.length])
            .map_err(|_| RtmpClientError::Protocol("could not decode command".to_string()))?;

        if cmd.cmd != "onStatus" {
            continue;
        }

        let level = match cmd.get_argument("info") {
            Some(info) => match info.get_object_property("level") {
                Some(l) => l.get_string().to_string(),
                None => "".to_string(),
            },
            None => "".to_string(),
        };

        let code = command_info_code(&cmd);

        if level == "error" {
            return Err(RtmpClientError::Rejected(code));
        }

        if code == expected_code {
            return Ok(());
        }

        log_debug!(logger, format!("Intermediate status: {}", code));
    }
}

/// Negotiates a client session: connect, createStream, then
/// publish or play, waiting for the corresponding start status.
///
/// # Arguments
///
/// * `conn` - The client connection (handshake completed)
/// * `url` - The parsed rtmp:// URL
/// * `mode` - Publish or play
/// * `out_chunk_size` - Chunk size announced and used for outbound messages
/// * `logger` - The client logger
///
/// # Return value
///
/// Returns the stream id allocated by the server
pub(crate) async fn negotiate_client_session(
    conn: &mut RtmpClientConnection,
    url: &RtmpUrl,
    mode: RtmpClientMode,
    out_chunk_size: usize,
    logger: &Logger,
) -> Result<u32, RtmpClientError> {
    // Announce our chunk size

    let chunk_size_bytes = rtmp_make_chunk_size_set_message(out_chunk_size as u32);
    session_write_bytes(&conn.write_stream, &chunk_size_bytes).await?;

    // connect

    let mut connect_cmd = RtmpCommand::new("connect".to_string());

    connect_cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 1.0 });

    let mut cmd_obj: AMF0Properties = Vec::new();

    cmd_obj.push((
        "app".to_string(),
        AMF0Value::String {
            value: url.app.clone(),
        },
    ));
    cmd_obj.push((
        "flashVer".to_string(),
        AMF0Value::String {
            value: "FMLE/3.0".to_string(),
        },
    ));
    cmd_obj.push((
        "tcUrl".to_string(),
        AMF0Value::String {
            value: url.tc_url(),
        },
    ));
    cmd_obj.push(("objectEncoding".to_string(), AMF0Value::Number { value: 0.0 }));

    connect_cmd.set_argument(
        "cmdObj".to_string(),
        AMF0Value::Object {
            properties: cmd_obj,
        },
    );

    let connect_bytes = rtmp_make_invoke_message(&connect_cmd, 0, out_chunk_size);
    session_write_bytes(&conn.write_stream, &connect_bytes).await?;

    let connect_result =
        wait_for_result(&mut conn.read_stream, &mut conn.read_status, 1, logger).await?;

    let connect_code = command_info_code(&connect_result);

    if connect_code != "NetConnection.Connect.Success" {
        return Err(RtmpClientError::Rejected(connect_code));
    }

    log_debug!(logger, "Connected, creating stream");

    // createStream

    let mut create_stream_cmd = RtmpCommand::new("createStream".to_string());

    create_stream_cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 2.0 });
    create_stream_cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);

    let create_stream_bytes = rtmp_make_invoke_message(&create_stream_cmd, 0, out_chunk_size);
    session_write_bytes(&conn.write_stream, &create_stream_bytes).await?;

    let create_stream_result =
        wait_for_result(&mut conn.read_stream, &mut conn.read_status, 2, logger).await?;

    let stream_id = match create_stream_result.get_argument("info") {
        Some(id) => id.get_integer() as u32,
        None => 0,
    };

    if stream_id == 0 {
        return Err(RtmpClientError::Protocol(
            "server did not allocate a stream id".to_string(),
        ));
    }

    log_debug!(logger, format!("Stream created: {}", stream_id));

    // publish or play

    match mode {
        RtmpClientMode::Publish => {
            let mut publish_cmd = RtmpCommand::new("publish".to_string());

            publish_cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 3.0 });
            publish_cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);
            publish_cmd.set_argument(
                "streamName".to_string(),
                AMF0Value::String {
                    value: url.stream_name.clone(),
                },
            );
            publish_cmd.set_argument(
                "type".to_string(),
                AMF0Value::String {
                    value: "live".to_string(),
                },
            );

            let publish_bytes = rtmp_make_invoke_message(&publish_cmd, stream_id, out_chunk_size);
            session_write_bytes(&conn.write_stream, &publish_bytes).await?;

            wait_for_status(
                &mut conn.read_stream,
                &mut conn.read_status,
                "NetStream.Publish.Start",
                logger,
            )
            .await?;
        }
        RtmpClientMode::Play => {
            let mut play_cmd = RtmpCommand::new("play".to_string());

            play_cmd.set_argument("transId".to_string(), AMF0Value::Number { value: 3.0 });
            play_cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);
            play_cmd.set_argument(
                "streamName".to_string(),
                AMF0Value::String {
                    value: url.stream_name.clone(),
                },
            );

            let play_bytes = rtmp_make_invoke_message(&play_cmd, stream_id, out_chunk_size);
            session_write_bytes(&conn.write_stream, &play_bytes).await?;

            wait_for_status(
                &mut conn.read_stream,
                &mut conn.read_status,
                "NetStream.Play.Start",
                logger,
            )
            .await?;
        }
    }

    Ok(stream_id)
}

/// Sends a deleteStream command
///
/// # Arguments
///
/// * `conn_write_stream` - The write half of the connection
/// * `stream_id` - The stream id to delete
/// * `trans_id` - Transaction id for the command
/// * `out_chunk_size` - Chunk size for the outbound message
pub(crate) async fn send_delete_stream(
    conn_write_stream: &std::sync::Arc<tokio::sync::Mutex<tokio::net::tcp::OwnedWriteHalf>>,
    stream_id: u32,
    trans_id: i64,
    out_chunk_size: usize,
) -> Result<(), RtmpClientError> {
    let mut delete_cmd = RtmpCommand::new("deleteStream".to_string());

    delete_cmd.set_argument(
        "transId".to_string(),
        AMF0Value::Number {
            value: trans_id as f64,
        },
    );
    delete_cmd.set_argument("cmdObj".to_string(), AMF0Value::Null);
    delete_cmd.set_argument(
        "streamId".to_string(),
        AMF0Value::Number {
            value: stream_id as f64,
        },
    );

    let delete_bytes = rtmp_make_invoke_message(&delete_cmd, stream_id, out_chunk_size);
    session_write_bytes(conn_write_stream, &delete_bytes).await?;

    Ok(())
}
