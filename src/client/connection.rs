// Client connection setup

use std::sync::Arc;

use tokio::{
    io::AsyncReadExt,
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{generate_c0_c1, generate_c2, rtmp_check_version, RtmpUrl, RTMP_SIG_SIZE},
    session::{session_write_bytes, RtmpSessionReadStatus},
};

use super::RtmpClientError;

/// An established client connection, after the handshake
pub(crate) struct RtmpClientConnection {
    /// Read half of the socket
    pub read_stream: OwnedReadHalf,

    /// Write half of the socket
    pub write_stream: Arc<Mutex<OwnedWriteHalf>>,

    /// Chunk decoding status
    pub read_status: RtmpSessionReadStatus,
}

/// Opens a TCP connection to the RTMP server and performs the
/// client side of the handshake: C0 + C1, S0 + S1 + S2, C2.
///
/// # Arguments
///
/// * `url` - The parsed rtmp:// URL
/// * `logger` - The client logger
pub(crate) async fn open_rtmp_connection(
    url: &RtmpUrl,
    logger: &Logger,
) -> Result<RtmpClientConnection, RtmpClientError> {
    let stream = TcpStream::connect(url.tcp_connect_addr()).await?;

    let _ = stream.set_nodelay(true);

    let (mut read_stream, write_stream) = stream.into_split();
    let write_stream_mu = Arc::new(Mutex::new(write_stream));

    // Send C0 + C1

    let c0_c1 = generate_c0_c1();

    session_write_bytes(&write_stream_mu, &c0_c1).await?;

    // Read S0 + S1 + S2

    let mut s0_s1_s2: Vec<u8> = vec![0; 1 + RTMP_SIG_SIZE + RTMP_SIG_SIZE];

    read_stream.read_exact(&mut s0_s1_s2).await?;

    if !rtmp_check_version(s0_s1_s2[0]) {
        log_debug!(
            logger,
            format!("BAD HANDSHAKE: Unsupported RTMP version: {}", s0_s1_s2[0])
        );

        return Err(RtmpClientError::Handshake(format!(
            "unsupported rtmp version: {}",
            s0_s1_s2[0]
        )));
    }

    // Send C2 (echo of S1)

    let c2 = generate_c2(&s0_s1_s2[1..1 + RTMP_SIG_SIZE])
        .map_err(|_| RtmpClientError::Handshake("could not build C2".to_string()))?;

    session_write_bytes(&write_stream_mu, &c2).await?;

    log_debug!(logger, "Client handshake completed");

    Ok(RtmpClientConnection {
        read_stream,
        write_stream: write_stream_mu,
        read_status: RtmpSessionReadStatus::new(),
    })
}
