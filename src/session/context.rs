// Context types to group session parameters

use std::{collections::HashMap, net::IpAddr, sync::Arc};

use tokio::sync::{mpsc::Sender, Mutex};

use crate::rtmp::RTMP_CHUNK_SIZE_DEFAULT;
use crate::server::RtmpChannelStatus;

use super::{
    RtmpPacketWrapper, RtmpSessionMessage, RtmpSessionPlayStatus, RtmpSessionPublishStreamStatus,
    RtmpSessionStatus,
};

/// Session context
#[derive(Clone)]
pub struct SessionContext {
    /// Session ID
    pub id: u64,

    /// Client IP address
    pub ip: IpAddr,

    /// Session status
    pub status: Arc<Mutex<RtmpSessionStatus>>,

    /// Publishing status
    pub publish_status: Arc<Mutex<RtmpSessionPublishStreamStatus>>,
}

impl SessionContext {
    /// Sets the session as killed
    pub async fn set_killed(&self) {
        let mut status = self.status.lock().await;

        status.killed = true;
    }

    /// Gets a copy of the play status of the session
    pub async fn play_status(&self) -> RtmpSessionPlayStatus {
        let status = self.status.lock().await;
        status.play_status.clone()
    }

    /// Checks the play status of a session
    ///
    /// # Return value
    ///
    /// Returns a tuple with 2 values:
    ///  1. True if the session is a player, false otherwise
    ///  2. If the session is a player, the ID of the RTMP stream used to play
    pub async fn play_stream_id(&self) -> (bool, u32) {
        let status = self.status.lock().await;
        (
            status.play_status.is_player,
            status.play_status.play_stream_id,
        )
    }

    /// Sets the playing status to false
    pub async fn stop_playing(&self) {
        let mut status = self.status.lock().await;
        status.play_status.is_player = false;
        status.play_status.has_keyframe = false;
    }
}

/// Status owned by the session read task
pub struct RtmpSessionReadStatus {
    /// Inbound chunk size
    pub in_chunk_size: usize,

    /// Size of the acknowledgement window requested by the peer
    pub ack_window: u32,

    /// Bytes received since the last acknowledgement was sent
    pub bytes_since_ack: u64,

    /// Channel status, cached once the session joins a channel
    pub channel_status: Option<Arc<Mutex<RtmpChannelStatus>>>,

    /// Partially received packets, by chunk stream id
    pub packets: HashMap<u32, RtmpPacketWrapper>,
}

impl RtmpSessionReadStatus {
    pub fn new() -> RtmpSessionReadStatus {
        RtmpSessionReadStatus {
            in_chunk_size: RTMP_CHUNK_SIZE_DEFAULT,
            ack_window: 0,
            bytes_since_ack: 0,
            channel_status: None,
            packets: HashMap::new(),
        }
    }
}

impl Default for RtmpSessionReadStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Context of the session read task
pub struct SessionReadThreadContext {
    /// Session ID
    pub id: u64,

    /// Client IP address
    pub ip: IpAddr,

    /// Session status
    pub status: Arc<Mutex<RtmpSessionStatus>>,

    /// Publishing status
    pub publish_status: Arc<Mutex<RtmpSessionPublishStreamStatus>>,

    /// Sender for session messages
    pub session_msg_sender: Sender<RtmpSessionMessage>,

    /// Read status
    pub read_status: RtmpSessionReadStatus,
}

impl SessionReadThreadContext {
    /// Gets the current app of the session
    pub async fn app(&self) -> Option<String> {
        let status = self.status.lock().await;
        status.app.clone()
    }

    /// Checks if the session is a publisher
    pub async fn is_publisher(&self) -> bool {
        let status = self.status.lock().await;

        status.is_publisher
    }

    /// Checks if the session is a player
    pub async fn is_player(&self) -> bool {
        let status = self.status.lock().await;

        status.play_status.is_player
    }

    /// Checks if the session is killed
    pub async fn is_killed(&self) -> bool {
        let status = self.status.lock().await;

        status.killed
    }

    /// Updates session status for publishing
    ///
    /// # Arguments
    ///
    /// * `publish_stream_id` - ID of the RTMP stream used for publishing
    /// * `key` - Stream name
    /// * `stream_path` - Full stream path
    pub async fn set_publisher(&self, publish_stream_id: u32, key: &str, stream_path: &str) {
        let mut status = self.status.lock().await;

        status.is_publisher = true;
        status.publish_stream_id = publish_stream_id;
        status.key = Some(key.to_string());
        status.stream_path = Some(stream_path.to_string());
    }

    /// Updates session status for playing
    ///
    /// # Arguments
    ///
    /// * `play_stream_id` - ID of the RTMP stream used for playing
    /// * `key` - Stream name
    /// * `stream_path` - Full stream path
    pub async fn set_player(&self, play_stream_id: u32, key: &str, stream_path: &str) {
        let mut status = self.status.lock().await;

        status.play_status.is_player = true;
        status.play_status.play_stream_id = play_stream_id;
        status.play_status.has_keyframe = false;
        status.key = Some(key.to_string());
        status.stream_path = Some(stream_path.to_string());
    }
}
