// Publishing client

use std::{sync::Arc, time::Duration};

use byteorder::{BigEndian, ByteOrder};
use tokio::{
    io::AsyncWriteExt,
    net::tcp::OwnedWriteHalf,
    sync::Mutex,
};

use crate::{
    log::Logger,
    log_debug,
    rtmp::{
        RtmpPacket, RtmpUrl, RTMP_CHANNEL_AUDIO, RTMP_CHANNEL_VIDEO, RTMP_CHUNK_TYPE_0,
        RTMP_CODEC_ID_AAC, RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO,
    },
    session::session_write_bytes,
};

use super::{
    negotiate_client_session, open_rtmp_connection, read_client_packet, send_delete_stream,
    RtmpClientError, RtmpClientMode,
};

/// Chunk size the publishing client announces
const PUBLISHER_CHUNK_SIZE: usize = 4096;

/// H.264 IDR NALU type
const H264_NALU_TYPE_IDR: u8 = 5;

/// Media configuration of the published stream
pub struct MediaInfo {
    /// H.264 sequence parameter set
    pub sps: Vec<u8>,

    /// H.264 picture parameter set
    pub pps: Vec<u8>,

    /// AAC AudioSpecificConfig (empty if the stream has no audio)
    pub audio_specific_config: Vec<u8>,

    /// True if the audio is stereo
    pub stereo: bool,
}

/// Internal status of the publisher
struct RtmpPublisherStatus {
    /// True while the connection is up
    connected: bool,

    /// True once a keyframe was pushed, frames before it are skipped
    has_key_frame: bool,

    /// True if the audio is stereo
    stereo: bool,

    /// Transaction id counter
    transactions: i64,
}

/// Publishing client: connects to a remote RTMP server
/// and pushes pre-encoded frames
pub struct RtmpPublisher {
    /// Client logger
    logger: Arc<Logger>,

    /// Write half of the connection
    write_stream: Arc<Mutex<OwnedWriteHalf>>,

    /// Stream id allocated by the server
    stream_id: u32,

    /// Status
    status: Arc<Mutex<RtmpPublisherStatus>>,
}

/// Builds the AVC sequence header payload:
/// frame tag, packet type 0 and the AVCDecoderConfigurationRecord
fn build_avc_sequence_header(sps: &[u8], pps: &[u8]) -> Result<Vec<u8>, RtmpClientError> {
    if sps.len() < 4 {
        return Err(RtmpClientError::Protocol("SPS too short".to_string()));
    }

    let mut payload: Vec<u8> = vec![0x17, 0x00, 0x00, 0x00, 0x00];

    payload.push(0x01); // configurationVersion
    payload.push(sps[1]); // AVCProfileIndication
    payload.push(sps[2]); // profile_compatibility
    payload.push(sps[3]); // AVCLevelIndication
    payload.push(0xFF); // lengthSizeMinusOne
    payload.push(0xE1); // one SPS

    let mut len_bytes = [0u8; 2];

    BigEndian::write_u16(&mut len_bytes, sps.len() as u16);
    payload.extend(len_bytes);
    payload.extend(sps);

    payload.push(0x01); // one PPS

    BigEndian::write_u16(&mut len_bytes, pps.len() as u16);
    payload.extend(len_bytes);
    payload.extend(pps);

    Ok(payload)
}

/// Builds the AAC sequence header payload:
/// sound tag, packet type 0 and the AudioSpecificConfig
fn build_aac_sequence_header(audio_specific_config: &[u8], stereo: bool) -> Vec<u8> {
    let mut payload: Vec<u8> = vec![if stereo { 0xAF } else { 0xAE }, 0x00];

    payload.extend(audio_specific_config);

    payload
}

impl RtmpPublisher {
    /// Connects to a RTMP server and starts publishing a stream path
    ///
    /// # Arguments
    ///
    /// * `raw_url` - URL of the form rtmp://host[:port]/app/stream_name
    /// * `timeout_ms` - Max milliseconds to wait for NetStream.Publish.Start
    /// * `logger` - The client logger
    pub async fn connect(
        raw_url: &str,
        timeout_ms: u64,
        logger: Logger,
    ) -> Result<RtmpPublisher, RtmpClientError> {
        let url = RtmpUrl::parse(raw_url).map_err(|_| RtmpClientError::InvalidUrl)?;
        let logger = Arc::new(logger);

        let negotiation_logger = logger.clone();

        let (conn, stream_id) = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            async move {
                let mut conn = open_rtmp_connection(&url, &negotiation_logger).await?;

                let stream_id = negotiate_client_session(
                    &mut conn,
                    &url,
                    RtmpClientMode::Publish,
                    PUBLISHER_CHUNK_SIZE,
                    &negotiation_logger,
                )
                .await?;

                Ok::<_, RtmpClientError>((conn, stream_id))
            },
        )
        .await
        {
            Ok(r) => r?,
            Err(_) => {
                return Err(RtmpClientError::Timeout);
            }
        };

        log_debug!(logger, format!("Publishing on stream id {}", stream_id));

        let status = Arc::new(Mutex::new(RtmpPublisherStatus {
            connected: true,
            has_key_frame: false,
            stereo: true,
            transactions: 3,
        }));

        // Keep consuming server messages in the background,
        // so control messages are applied and a close is detected

        let task_status = status.clone();
        let task_logger = logger.clone();
        let mut read_stream = conn.read_stream;
        let mut read_status = conn.read_status;

        tokio::spawn(async move {
            loop {
                match read_client_packet(&mut read_stream, &mut read_status, &task_logger).await {
                    Ok(_) => {
                        // Commands after the negotiation are informational
                    }
                    Err(_) => {
                        let mut status_v = task_status.lock().await;
                        status_v.connected = false;
                        break;
                    }
                }
            }
        });

        Ok(RtmpPublisher {
            logger,
            write_stream: conn.write_stream,
            stream_id,
            status,
        })
    }

    /// Sends the codec sequence headers built from the media configuration
    ///
    /// # Arguments
    ///
    /// * `media_info` - SPS, PPS and AudioSpecificConfig of the stream
    pub async fn set_media_info(&self, media_info: &MediaInfo) -> Result<(), RtmpClientError> {
        let mut status_v = self.status.lock().await;
        status_v.stereo = media_info.stereo;
        drop(status_v);

        let avc_header = build_avc_sequence_header(&media_info.sps, &media_info.pps)?;

        self.send_media_payload(RTMP_TYPE_VIDEO, RTMP_CHANNEL_VIDEO, avc_header, 0)
            .await?;

        if !media_info.audio_specific_config.is_empty() {
            let aac_header =
                build_aac_sequence_header(&media_info.audio_specific_config, media_info.stereo);

            self.send_media_payload(RTMP_TYPE_AUDIO, RTMP_CHANNEL_AUDIO, aac_header, 0)
                .await?;
        }

        Ok(())
    }

    /// Pushes a H.264 NALU as a video message.
    /// Frames before the first keyframe are skipped.
    ///
    /// # Arguments
    ///
    /// * `nalu` - The encoded NALU, without start code
    /// * `timestamp` - Timestamp in milliseconds
    ///
    /// # Return value
    ///
    /// Returns true if the frame was sent, false if it was skipped
    pub async fn push_video_frame(
        &self,
        nalu: &[u8],
        timestamp: u32,
    ) -> Result<bool, RtmpClientError> {
        if nalu.is_empty() {
            return Ok(false);
        }

        let is_key_frame = nalu[0] & 0x1f == H264_NALU_TYPE_IDR;

        let mut status_v = self.status.lock().await;

        if !status_v.connected {
            return Err(RtmpClientError::Closed);
        }

        if !status_v.has_key_frame {
            if is_key_frame {
                status_v.has_key_frame = true;
            } else {
                drop(status_v);

                self.logger.log_debug("Video frame skipped, waiting for a keyframe");

                return Ok(false);
            }
        }

        drop(status_v);

        let mut payload: Vec<u8> = Vec::with_capacity(9 + nalu.len());

        payload.push(if is_key_frame { 0x17 } else { 0x27 });
        payload.push(0x01);
        payload.extend([0x00, 0x00, 0x00]); // composition time

        let mut len_bytes = [0u8; 4];

        BigEndian::write_u32(&mut len_bytes, nalu.len() as u32);
        payload.extend(len_bytes);
        payload.extend(nalu);

        self.send_media_payload(RTMP_TYPE_VIDEO, RTMP_CHANNEL_VIDEO, payload, timestamp)
            .await?;

        Ok(true)
    }

    /// Pushes a raw AAC frame as an audio message.
    /// Frames before the first video keyframe are skipped.
    ///
    /// # Arguments
    ///
    /// * `frame` - The raw AAC frame
    /// * `timestamp` - Timestamp in milliseconds
    ///
    /// # Return value
    ///
    /// Returns true if the frame was sent, false if it was skipped
    pub async fn push_audio_frame(
        &self,
        frame: &[u8],
        timestamp: u32,
    ) -> Result<bool, RtmpClientError> {
        if frame.is_empty() {
            return Ok(false);
        }

        let status_v = self.status.lock().await;

        if !status_v.connected {
            return Err(RtmpClientError::Closed);
        }

        if !status_v.has_key_frame {
            return Ok(false);
        }

        let stereo = status_v.stereo;

        drop(status_v);

        let mut payload: Vec<u8> = Vec::with_capacity(2 + frame.len());

        payload.push(if stereo { 0xAF } else { 0xAE });
        payload.push(0x01);
        payload.extend(frame);

        self.send_media_payload(RTMP_TYPE_AUDIO, RTMP_CHANNEL_AUDIO, payload, timestamp)
            .await?;

        Ok(true)
    }

    /// Pushes an already tagged frame. The message kind is derived
    /// from the first payload byte: AAC sound tags become audio
    /// messages, anything else is sent as video.
    ///
    /// # Arguments
    ///
    /// * `tagged_payload` - The tagged frame payload
    /// * `timestamp` - Timestamp in milliseconds
    pub async fn push_frame(
        &self,
        tagged_payload: &[u8],
        timestamp: u32,
    ) -> Result<(), RtmpClientError> {
        if tagged_payload.is_empty() {
            return Ok(());
        }

        let sound_format = (tagged_payload[0] >> 4) & 0x0f;

        if sound_format == RTMP_CODEC_ID_AAC as u8 {
            self.send_media_payload(
                RTMP_TYPE_AUDIO,
                RTMP_CHANNEL_AUDIO,
                tagged_payload.to_vec(),
                timestamp,
            )
            .await
        } else {
            self.send_media_payload(
                RTMP_TYPE_VIDEO,
                RTMP_CHANNEL_VIDEO,
                tagged_payload.to_vec(),
                timestamp,
            )
            .await
        }
    }

    /// Checks if the connection is still up
    pub async fn is_connected(&self) -> bool {
        let status_v = self.status.lock().await;

        status_v.connected
    }

    /// Deletes the stream and closes the connection
    pub async fn close(&self) {
        let trans_id = {
            let mut status_v = self.status.lock().await;

            if !status_v.connected {
                return;
            }

            status_v.connected = false;
            status_v.transactions += 1;
            status_v.transactions
        };

        let _ = send_delete_stream(
            &self.write_stream,
            self.stream_id,
            trans_id,
            PUBLISHER_CHUNK_SIZE,
        )
        .await;

        let mut write_stream_v = self.write_stream.lock().await;
        let _ = write_stream_v.shutdown().await;
    }

    /// Sends a media message to the server
    async fn send_media_payload(
        &self,
        packet_type: u32,
        channel_id: u32,
        payload: Vec<u8>,
        timestamp: u32,
    ) -> Result<(), RtmpClientError> {
        let mut packet = RtmpPacket::new_blank();

        packet.header.format = RTMP_CHUNK_TYPE_0;
        packet.header.channel_id = channel_id;
        packet.header.packet_type = packet_type;
        packet.header.stream_id = self.stream_id;
        packet.header.timestamp = timestamp as i64;
        packet.payload = payload;
        packet.header.length = packet.payload.len();

        let bytes = packet.create_chunks(PUBLISHER_CHUNK_SIZE);

        session_write_bytes(&self.write_stream, &bytes).await?;

        Ok(())
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_avc_sequence_header() {
        let sps = vec![0x67, 0x42, 0x00, 0x1f, 0xAA, 0xBB];
        let pps = vec![0x68, 0xCE, 0x3C, 0x80];

        let header = build_avc_sequence_header(&sps, &pps).unwrap();

        assert_eq!(&header[0..5], &[0x17, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(header[5], 0x01);
        assert_eq!(&header[6..9], &[0x42, 0x00, 0x1f]);
        assert_eq!(header[9], 0xFF);
        assert_eq!(header[10], 0xE1);
        assert_eq!(&header[11..13], &[0x00, 0x06]);
        assert_eq!(&header[13..19], &sps[..]);
        assert_eq!(header[19], 0x01);
        assert_eq!(&header[20..22], &[0x00, 0x04]);
        assert_eq!(&header[22..26], &pps[..]);
    }

    #[test]
    fn test_build_aac_sequence_header() {
        let asc = vec![0x12, 0x10];

        assert_eq!(
            build_aac_sequence_header(&asc, true),
            vec![0xAF, 0x00, 0x12, 0x10]
        );
        assert_eq!(
            build_aac_sequence_header(&asc, false),
            vec![0xAE, 0x00, 0x12, 0x10]
        );
    }
}
