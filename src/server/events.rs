// Server events

/// Event notified to the embedder of the server
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RtmpServerEvent {
    /// A publisher started publishing on a stream path
    PublishStart { stream_path: String },

    /// A publisher stopped publishing
    PublishStop { stream_path: String },

    /// A player started playing a stream path
    PlayStart { stream_path: String },

    /// A player stopped playing
    PlayStop { stream_path: String },
}

impl RtmpServerEvent {
    /// Gets the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            RtmpServerEvent::PublishStart { .. } => "publish.start",
            RtmpServerEvent::PublishStop { .. } => "publish.stop",
            RtmpServerEvent::PlayStart { .. } => "play.start",
            RtmpServerEvent::PlayStop { .. } => "play.stop",
        }
    }

    /// Gets the stream path the event refers to
    pub fn stream_path(&self) -> &str {
        match self {
            RtmpServerEvent::PublishStart { stream_path } => stream_path,
            RtmpServerEvent::PublishStop { stream_path } => stream_path,
            RtmpServerEvent::PlayStart { stream_path } => stream_path,
            RtmpServerEvent::PlayStop { stream_path } => stream_path,
        }
    }
}
