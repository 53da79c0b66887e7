// RTMP server status model

mod add_player;
mod channel_status;
mod player_set_receive;
mod remove_player;
mod remove_publisher;
mod set_channel_metadata;
mod set_publisher;
mod sweep;
mod try_clear_channel;

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

pub use add_player::*;
pub use channel_status::*;
pub use player_set_receive::*;
pub use remove_player::*;
pub use remove_publisher::*;
pub use set_channel_metadata::*;
pub use set_publisher::*;
pub use sweep::*;
pub use try_clear_channel::*;

/// RTMP server status
pub struct RtmpServerStatus {
    /// Channels, by stream path
    pub channels: HashMap<String, Arc<Mutex<RtmpChannelStatus>>>,
}

impl RtmpServerStatus {
    /// Creates a new instance of RtmpServerStatus
    pub fn new() -> RtmpServerStatus {
        RtmpServerStatus {
            channels: HashMap::new(),
        }
    }
}

impl Default for RtmpServerStatus {
    fn default() -> Self {
        Self::new()
    }
}
