// Channel status model and media fan-out

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{
    mpsc::{error::TrySendError, Sender},
    Mutex,
};

use crate::{
    rtmp::{RtmpPacket, RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO},
    session::{RtmpSessionMessage, RtmpSessionPublishStreamStatus},
};

/// Delay before retrying to enqueue a message on a full player buffer
const PLAYER_SEND_RETRY_DELAY_MS: u64 = 100;

/// Status of an RTMP player
pub struct RtmpPlayerStatus {
    /// Message sender to communicate with the player session
    pub message_sender: Sender<RtmpSessionMessage>,

    /// True once the player received the start burst
    /// (metadata, codec headers, GOP replay)
    pub started: bool,

    /// True to receive audio
    pub receive_audio: bool,

    /// True to receive video
    pub receive_video: bool,
}

/// RTMP channel status: the state bound to a stream path,
/// pairing a single publisher with its players
pub struct RtmpChannelStatus {
    /// True if a publisher is active
    pub publishing: bool,

    /// ID of the publisher session
    pub publisher_id: Option<u64>,

    /// Status of the published stream
    pub publish_status: Option<Arc<Mutex<RtmpSessionPublishStreamStatus>>>,

    /// Players, by session ID
    pub players: HashMap<u64, RtmpPlayerStatus>,
}

/// Enqueues a message on a player buffer without ever blocking.
/// A full buffer falls back to a single deferred retry, the message
/// is dropped for that player if the buffer is still full.
fn send_to_player(sender: &Sender<RtmpSessionMessage>, msg: RtmpSessionMessage) {
    match sender.try_send(msg) {
        Ok(_) => {}
        Err(TrySendError::Full(msg)) => {
            let sender = sender.clone();

            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(PLAYER_SEND_RETRY_DELAY_MS)).await;
                let _ = sender.try_send(msg);
            });
        }
        Err(TrySendError::Closed(_)) => {}
    }
}

impl RtmpChannelStatus {
    /// Creates a new instance of RtmpChannelStatus
    pub fn new() -> RtmpChannelStatus {
        RtmpChannelStatus {
            publishing: false,
            publisher_id: None,
            publish_status: None,
            players: HashMap::new(),
        }
    }

    /// Sends a media packet to the players, saving it into the GOP cache.
    ///
    /// Players that did not receive the start burst yet get it before
    /// this packet, so their stream begins with the metadata, the codec
    /// headers and the cached group of pictures.
    ///
    /// # Arguments
    ///
    /// * `publisher_id` - ID of the session sending the packet
    /// * `packet` - Packet to send
    /// * `is_header` - True if the packet is a codec sequence header
    /// * `gop_cache_len` - Max frames per cached group (server config)
    pub async fn send_packet(
        &mut self,
        publisher_id: u64,
        packet: Arc<RtmpPacket>,
        is_header: bool,
        gop_cache_len: usize,
    ) {
        if !self.publishing {
            return;
        }

        if let Some(pid) = self.publisher_id {
            if pid != publisher_id {
                return; // Not the publisher session
            }
        }

        let publish_status_mu = match &self.publish_status {
            Some(s) => s.clone(),
            None => {
                return;
            }
        };

        // Prune players whose session went away

        self.players.retain(|_, p| !p.message_sender.is_closed());

        if is_header {
            // Sequence headers go to started players only. Late joiners
            // receive the stored headers in their start burst.
            for player in self.players.values() {
                if !player.started {
                    continue;
                }

                send_to_player(
                    &player.message_sender,
                    RtmpSessionMessage::PlayPacket {
                        packet: packet.clone(),
                    },
                );
            }

            return;
        }

        let mut publish_status = publish_status_mu.lock().await;

        // Send the start burst to players that joined since the last packet.
        // The burst is built before the current packet enters the cache.

        for player in self.players.values_mut() {
            if !player.started {
                send_to_player(&player.message_sender, publish_status.get_play_start_message());
                player.started = true;
            }
        }

        // Save to the GOP cache

        publish_status.save_gop(&packet, gop_cache_len);

        drop(publish_status);

        // Fan out the packet

        for player in self.players.values() {
            if packet.header.packet_type == RTMP_TYPE_AUDIO && !player.receive_audio {
                continue;
            }

            if packet.header.packet_type == RTMP_TYPE_VIDEO && !player.receive_video {
                continue;
            }

            send_to_player(
                &player.message_sender,
                RtmpSessionMessage::PlayPacket {
                    packet: packet.clone(),
                },
            );
        }
    }

    /// Sends updated metadata to the started players
    ///
    /// # Arguments
    ///
    /// * `metadata` - The encoded metadata
    pub fn send_metadata(&self, metadata: Arc<Vec<u8>>) {
        for player in self.players.values() {
            if !player.started {
                continue;
            }

            send_to_player(
                &player.message_sender,
                RtmpSessionMessage::PlayMetadata {
                    metadata: metadata.clone(),
                },
            );
        }
    }
}

impl Default for RtmpChannelStatus {
    fn default() -> Self {
        Self::new()
    }
}
