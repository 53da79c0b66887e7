// RTMP client library: publishing and playing against a remote server

mod connection;
mod error;
mod negotiate;
mod player;
mod publisher;

pub use error::*;
pub use player::*;
pub use publisher::*;

pub(crate) use connection::*;
pub(crate) use negotiate::*;

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Logger;
    use crate::server::{run_server, RtmpServerConfiguration, RtmpServerEvent, RtmpServerStatus};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc::Receiver, Mutex};

    fn test_config(port: u32) -> Arc<RtmpServerConfiguration> {
        Arc::new(RtmpServerConfiguration {
            port,
            bind_address: "127.0.0.1".to_string(),
            chunk_size: 4096,
            gop_cache_len: 256,
            msg_buffer_size: 32,
            id_max_length: 128,
            log_requests: false,
        })
    }

    async fn start_test_server(port: u32) -> (Arc<Mutex<RtmpServerStatus>>, Receiver<RtmpServerEvent>) {
        let server_status = Arc::new(Mutex::new(RtmpServerStatus::new()));
        let (event_sender, event_receiver) = tokio::sync::mpsc::channel::<RtmpServerEvent>(64);

        let status_for_server = server_status.clone();

        tokio::spawn(async move {
            run_server(
                Logger::new_disabled(),
                test_config(port),
                status_for_server,
                Some(event_sender),
            )
            .await;
        });

        // Let the listener bind
        tokio::time::sleep(Duration::from_millis(200)).await;

        (server_status, event_receiver)
    }

    fn test_media_info() -> MediaInfo {
        MediaInfo {
            sps: vec![0x67, 0x42, 0x00, 0x1f, 0x8c, 0x8d],
            pps: vec![0x68, 0xce, 0x3c, 0x80],
            audio_specific_config: Vec::new(),
            stereo: true,
        }
    }

    async fn next_frame(frames: &mut Receiver<RtmpClientFrame>) -> RtmpClientFrame {
        tokio::time::timeout(Duration::from_secs(5), frames.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("frame channel closed")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_publish_and_late_play_with_gop_replay() {
        let port = 19361;
        let (_server_status, mut events) = start_test_server(port).await;

        let url = format!("rtmp://127.0.0.1:{}/live/stream0", port);

        // Publish a stream: sequence header, a keyframe and inter frames

        let publisher = RtmpPublisher::connect(&url, 3000, Logger::new_disabled())
            .await
            .expect("publisher could not connect");

        publisher
            .set_media_info(&test_media_info())
            .await
            .expect("could not send media info");

        assert!(publisher.push_video_frame(&[0x65, 1, 2, 3], 0).await.unwrap());
        assert!(publisher.push_video_frame(&[0x41, 4, 5], 40).await.unwrap());
        assert!(publisher.push_video_frame(&[0x41, 6, 7], 80).await.unwrap());

        tokio::time::sleep(Duration::from_millis(200)).await;

        // A late player joins mid GOP

        let (player, mut frames) = RtmpPlayer::connect(&url, 3000, Logger::new_disabled())
            .await
            .expect("player could not connect");

        tokio::time::sleep(Duration::from_millis(200)).await;

        // More live frames trigger the start burst for the late player

        assert!(publisher.push_video_frame(&[0x41, 8, 9], 120).await.unwrap());
        assert!(publisher.push_video_frame(&[0x65, 10, 11], 160).await.unwrap());

        // Expected: sequence header, then the cached GOP (keyframe first),
        // then the live frames, in order

        let header = next_frame(&mut frames).await;

        assert_eq!(header.kind, RtmpFrameKind::Video);
        assert_eq!(header.payload[0], 0x17);
        assert_eq!(header.payload[1], 0x00);

        let expected = [
            (0x17u8, 0u32),
            (0x27u8, 40u32),
            (0x27u8, 80u32),
            (0x27u8, 120u32),
            (0x17u8, 160u32),
        ];

        for (tag, timestamp) in expected {
            let frame = next_frame(&mut frames).await;

            assert_eq!(frame.kind, RtmpFrameKind::Video);
            assert_eq!(frame.payload[0], tag, "timestamp {}", timestamp);
            assert_eq!(frame.payload[1], 0x01);
            assert_eq!(frame.timestamp, timestamp);
        }

        // Events: publish.start for the publisher, play.start for the player

        let first_event = events.recv().await.unwrap();
        assert_eq!(first_event.event_type(), "publish.start");
        assert_eq!(first_event.stream_path(), "/live/stream0");

        let second_event = events.recv().await.unwrap();
        assert_eq!(second_event.event_type(), "play.start");
        assert_eq!(second_event.stream_path(), "/live/stream0");

        player.close().await;
        publisher.close().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_publish_is_rejected() {
        let port = 19362;
        let (server_status, _events) = start_test_server(port).await;

        let url = format!("rtmp://127.0.0.1:{}/live/stream0", port);

        let publisher = RtmpPublisher::connect(&url, 3000, Logger::new_disabled())
            .await
            .expect("first publisher could not connect");

        let second = RtmpPublisher::connect(&url, 3000, Logger::new_disabled()).await;

        match second {
            Err(RtmpClientError::Rejected(code)) => {
                assert_eq!(code, "NetStream.Publish.BadName");
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("second publisher was accepted"),
        }

        // The original session keeps the channel

        assert!(publisher.is_connected().await);

        let status = server_status.lock().await;
        let channel_mu = status.channels.get("/live/stream0").expect("channel removed");
        let channel_status = channel_mu.lock().await;

        assert!(channel_status.publishing);

        drop(channel_status);
        drop(status);

        publisher.close().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handshake_with_wrong_version_is_rejected() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let port = 19364;
        let (server_status, _events) = start_test_server(port).await;

        let mut stream = tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port))
            .await
            .expect("could not connect");

        // C0 with version 2 and a C1 signature

        let mut c0_c1 = vec![0u8; 1537];
        c0_c1[0] = 0x02;

        stream.write_all(&c0_c1).await.unwrap();

        // The server must close without sending S0

        let mut buf = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out waiting for the server to close")
            .expect("read failed");

        assert_eq!(read, 0);

        let status = server_status.lock().await;
        assert!(status.channels.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_play_before_publish_starts_at_keyframe() {
        let port = 19363;
        let (_server_status, _events) = start_test_server(port).await;

        let url = format!("rtmp://127.0.0.1:{}/live/waiting", port);

        // The player joins an idle path, which is valid

        let (player, mut frames) = RtmpPlayer::connect(&url, 3000, Logger::new_disabled())
            .await
            .expect("player could not connect");

        // A publisher appears later

        let publisher = RtmpPublisher::connect(&url, 3000, Logger::new_disabled())
            .await
            .expect("publisher could not connect");

        publisher
            .set_media_info(&test_media_info())
            .await
            .expect("could not send media info");

        // An inter frame before any keyframe is skipped by the publisher

        assert!(!publisher.push_video_frame(&[0x41, 1], 0).await.unwrap());

        assert!(publisher.push_video_frame(&[0x65, 2, 3], 40).await.unwrap());
        assert!(publisher.push_video_frame(&[0x41, 4, 5], 80).await.unwrap());

        // The player must receive the sequence header, then the keyframe

        let header = next_frame(&mut frames).await;

        assert_eq!(header.payload[0], 0x17);
        assert_eq!(header.payload[1], 0x00);

        let keyframe = next_frame(&mut frames).await;

        assert_eq!(keyframe.payload[0], 0x17);
        assert_eq!(keyframe.payload[1], 0x01);
        assert_eq!(keyframe.timestamp, 40);

        let inter = next_frame(&mut frames).await;

        assert_eq!(inter.payload[0], 0x27);
        assert_eq!(inter.timestamp, 80);

        player.close().await;
        publisher.close().await;
    }
}
