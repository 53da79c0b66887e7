// Context types to group server parameters

use std::sync::Arc;

use tokio::sync::{mpsc::Sender, Mutex};

use super::{RtmpServerConfiguration, RtmpServerEvent, RtmpServerStatus, SessionIdGenerator};

/// Server context
#[derive(Clone)]
pub struct RtmpServerContext {
    /// Server configuration
    pub config: Arc<RtmpServerConfiguration>,

    /// Server status
    pub status: Arc<Mutex<RtmpServerStatus>>,

    /// Sender for server events
    pub event_sender: Option<Sender<RtmpServerEvent>>,
}

impl RtmpServerContext {
    /// Notifies a server event to the embedder, never blocking
    pub fn notify_event(&self, event: RtmpServerEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.try_send(event);
        }
    }
}

/// Extended server context, for the accepting task
#[derive(Clone)]
pub struct RtmpServerContextExtended {
    /// Server context
    pub context: RtmpServerContext,

    /// Generator of session IDs
    pub session_id_generator: Arc<Mutex<SessionIdGenerator>>,
}
