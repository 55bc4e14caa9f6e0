use tokio::sync::broadcast;

const DEFAULT_BUS_CAPACITY: usize = 256;

/// Notifications published by the core. Consumers re-read store state;
/// events carry ids and counts, never the data itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    SessionConnected { address: String, inbox_id: String },
    SessionClosed { address: String },
    MessageSent { conversation_id: String },
    ConversationCreated { conversation_id: String },
    MembershipChanged { conversation_id: String },
    /// A message arrived on the live feed of the open conversation
    LiveMessage { conversation_id: String, message_id: String },
    ConversationsUpdated { count: usize },
    MessagesUpdated { conversation_id: String, count: usize },
}

impl CoreEvent {
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            CoreEvent::MessageSent { conversation_id }
            | CoreEvent::ConversationCreated { conversation_id }
            | CoreEvent::MembershipChanged { conversation_id }
            | CoreEvent::LiveMessage { conversation_id, .. }
            | CoreEvent::MessagesUpdated { conversation_id, .. } => Some(conversation_id),
            _ => None,
        }
    }
}

/// In-process pub/sub over a tokio broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: CoreEvent) {
        tracing::debug!(?event, "publish");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
