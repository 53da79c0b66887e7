// Playing client

use std::{sync::Arc, time::Duration};

use tokio::{
    io::AsyncWriteExt,
    net::tcp::OwnedWriteHalf,
    sync::{
        mpsc::{Receiver, Sender},
        Mutex,
    },
};

use crate::{
    log::Logger,
    log_debug, log_info,
    rtmp::{
        RtmpCommand, RtmpUrl, RTMP_TYPE_AUDIO, RTMP_TYPE_INVOKE, RTMP_TYPE_VIDEO,
    },
};

use super::{
    negotiate_client_session, open_rtmp_connection, read_client_packet, RtmpClientError,
    RtmpClientMode,
};

/// Chunk size the playing client announces
const PLAYER_CHUNK_SIZE: usize = 4096;

/// Size of the received frame buffer
const FRAME_CHANNEL_BUFFER_SIZE: usize = 64;

/// Kind of a received media frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtmpFrameKind {
    Audio,
    Video,
}

/// A media frame received by the playing client
pub struct RtmpClientFrame {
    /// Audio or video
    pub kind: RtmpFrameKind,

    /// Codec id (7 for H.264 video, 10 for AAC audio)
    pub codec_id: u8,

    /// Timestamp in milliseconds
    pub timestamp: u32,

    /// The tagged frame payload
    pub payload: Vec<u8>,
}

/// Internal status of the playing client
struct RtmpPlayerClientStatus {
    /// True while the connection is up
    connected: bool,
}

/// Playing client: connects to a remote RTMP server and receives
/// the media frames of a stream path
pub struct RtmpPlayer {
    /// Client logger
    logger: Arc<Logger>,

    /// Write half of the connection
    write_stream: Arc<Mutex<OwnedWriteHalf>>,

    /// Status
    status: Arc<Mutex<RtmpPlayerClientStatus>>,
}

impl RtmpPlayer {
    /// Connects to a RTMP server and starts playing a stream path.
    /// Received frames arrive on the returned receiver.
    ///
    /// # Arguments
    ///
    /// * `raw_url` - URL of the form rtmp://host[:port]/app/stream_name
    /// * `timeout_ms` - Max milliseconds to wait for NetStream.Play.Start
    /// * `logger` - The client logger
    pub async fn connect(
        raw_url: &str,
        timeout_ms: u64,
        logger: Logger,
    ) -> Result<(RtmpPlayer, Receiver<RtmpClientFrame>), RtmpClientError> {
        let url = RtmpUrl::parse(raw_url).map_err(|_| RtmpClientError::InvalidUrl)?;
        let logger = Arc::new(logger);

        let negotiation_logger = logger.clone();

        let conn = match tokio::time::timeout(Duration::from_millis(timeout_ms), async move {
            let mut conn = open_rtmp_connection(&url, &negotiation_logger).await?;

            negotiate_client_session(
                &mut conn,
                &url,
                RtmpClientMode::Play,
                PLAYER_CHUNK_SIZE,
                &negotiation_logger,
            )
            .await?;

            Ok::<_, RtmpClientError>(conn)
        })
        .await
        {
            Ok(r) => r?,
            Err(_) => {
                return Err(RtmpClientError::Timeout);
            }
        };

        log_debug!(logger, "Play started");

        let status = Arc::new(Mutex::new(RtmpPlayerClientStatus { connected: true }));

        let (frame_sender, frame_receiver) =
            tokio::sync::mpsc::channel::<RtmpClientFrame>(FRAME_CHANNEL_BUFFER_SIZE);

        spawn_task_to_receive_frames(
            logger.clone(),
            status.clone(),
            conn.read_stream,
            conn.read_status,
            frame_sender,
        );

        Ok((
            RtmpPlayer {
                logger,
                write_stream: conn.write_stream,
                status,
            },
            frame_receiver,
        ))
    }

    /// Checks if the connection is still up
    pub async fn is_connected(&self) -> bool {
        let status_v = self.status.lock().await;

        status_v.connected
    }

    /// Closes the connection
    pub async fn close(&self) {
        let mut status_v = self.status.lock().await;

        if !status_v.connected {
            return;
        }

        status_v.connected = false;

        drop(status_v);

        self.logger.log_debug("Closing play connection");

        let mut write_stream_v = self.write_stream.lock().await;
        let _ = write_stream_v.shutdown().await;
    }
}

/// Creates the task receiving media frames for a playing client
fn spawn_task_to_receive_frames(
    logger: Arc<Logger>,
    status: Arc<Mutex<RtmpPlayerClientStatus>>,
    mut read_stream: tokio::net::tcp::OwnedReadHalf,
    mut read_status: crate::session::RtmpSessionReadStatus,
    frame_sender: Sender<RtmpClientFrame>,
) {
    tokio::spawn(async move {
        loop {
            let packet = match read_client_packet(&mut read_stream, &mut read_status, &logger).await
            {
                Ok(p) => p,
                Err(_) => {
                    break;
                }
            };

            match packet.header.packet_type {
                RTMP_TYPE_AUDIO => {
                    if packet.payload.is_empty() {
                        continue;
                    }

                    let frame = RtmpClientFrame {
                        kind: RtmpFrameKind::Audio,
                        codec_id: (packet.payload[0] >> 4) & 0x0f,
                        timestamp: packet.header.timestamp as u32,
                        payload: packet.payload,
                    };

                    if frame_sender.send(frame).await.is_err() {
                        break; // Receiver dropped
                    }
                }
                RTMP_TYPE_VIDEO => {
                    if packet.payload.is_empty() {
                        continue;
                    }

                    let frame = RtmpClientFrame {
                        kind: RtmpFrameKind::Video,
                        codec_id: packet.payload[0] & 0x0f,
                        timestamp: packet.header.timestamp as u32,
                        payload: packet.payload,
                    };

                    if frame_sender.send(frame).await.is_err() {
                        break;
                    }
                }
                RTMP_TYPE_INVOKE => {
                    let cmd = match RtmpCommand::decode(&packet.payload[..packet.header.length]) {
                        Ok(c) => c,
                        Err(_) => {
                            break;
                        }
                    };

                    if cmd.cmd == "onStatus" {
                        let code = match cmd.get_argument("info") {
                            Some(info) => match info.get_object_property("code") {
                                Some(c) => c.get_string().to_string(),
                                None => "".to_string(),
                            },
                            None => "".to_string(),
                        };

                        log_info!(logger, format!("Stream status: {}", code));

                        if code == "NetStream.Play.UnpublishNotify" {
                            break; // The stream ended
                        }
                    }
                }
                _ => {
                    // Data messages (metadata, sample access) are informational
                }
            }
        }

        let mut status_v = status.lock().await;
        status_v.connected = false;
    });
}
