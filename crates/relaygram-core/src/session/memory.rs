//! Loopback messaging network.
//!
//! Every session created from one [`LocalNetwork`] shares the same state, so
//! two identities can message each other inside a single process. Used by
//! the test-suite and by the terminal client's demo mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;

use super::{MessageFeed, MessagingNetwork, MessagingSession, SessionOptions, WalletSigner};
use crate::error::{NetworkError, SessionError};
use crate::models::{
    address, Conversation, ConversationKind, GroupMetadata, Message, MessageContent,
};

const FEED_CAPACITY: usize = 128;
const OFFLINE: &str = "network unreachable";

type FeedItem = Result<Message, NetworkError>;

struct StoredConversation {
    id: String,
    is_group: bool,
    metadata: GroupMetadata,
    members: Vec<String>,
    created_at_ns: i64,
    messages: Vec<Message>,
}

impl StoredConversation {
    fn view_for(&self, viewer: &str) -> Conversation {
        let kind = if self.is_group {
            ConversationKind::Group(self.metadata.clone())
        } else {
            let peer = self
                .members
                .iter()
                .find(|m| m.as_str() != viewer)
                .cloned()
                .unwrap_or_else(|| viewer.to_string());
            ConversationKind::Direct {
                peer_inbox_id: peer,
            }
        };
        let last = self.messages.iter().max_by_key(|m| m.sent_at_ns);

        Conversation {
            id: self.id.clone(),
            kind,
            members: self.members.clone(),
            created_at_ns: Some(self.created_at_ns),
            last_message_at_ns: last.map(|m| m.sent_at_ns),
            last_message_preview: last.map(|m| m.content.preview_text()),
        }
    }
}

#[derive(Default)]
struct NetworkState {
    /// normalized address -> inbox id
    inboxes: HashMap<String, String>,
    /// Listing order is creation order
    conversations: Vec<StoredConversation>,
    feeds: HashMap<String, broadcast::Sender<FeedItem>>,
    offline: bool,
    latency: Duration,
    last_ns: i64,
    pinned_ns: Option<i64>,
    sessions_created: usize,
    send_calls: usize,
    sync_calls: usize,
}

impl NetworkState {
    fn now_ns(&mut self) -> i64 {
        if let Some(pinned) = self.pinned_ns {
            return pinned;
        }
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or_default();
        self.last_ns = wall.max(self.last_ns + 1);
        self.last_ns
    }

    fn conversation(&self, id: &str) -> Result<&StoredConversation, NetworkError> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| NetworkError::ConversationNotFound(id.to_string()))
    }

    fn conversation_mut(&mut self, id: &str) -> Result<&mut StoredConversation, NetworkError> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| NetworkError::ConversationNotFound(id.to_string()))
    }

    fn is_known_inbox(&self, inbox_id: &str) -> bool {
        self.inboxes.values().any(|id| id == inbox_id)
    }

    fn feed(&mut self, conversation_id: &str) -> broadcast::Sender<FeedItem> {
        self.feeds
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .clone()
    }

    fn append(&mut self, conversation_id: &str, sender: &str, body: &str) -> Result<Message, NetworkError> {
        let sent_at_ns = self.now_ns();
        let message = Message {
            id: uuid::Uuid::new_v4().simple().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_inbox_id: sender.to_string(),
            sent_at_ns,
            content: MessageContent::decode(body),
        };
        self.conversation_mut(conversation_id)?
            .messages
            .push(message.clone());
        let _ = self.feed(conversation_id).send(Ok(message.clone()));
        Ok(message)
    }
}

/// Deterministic inbox id for an address.
pub fn inbox_id_for(addr: &str) -> String {
    let digest = Sha256::digest(format!("inbox:{}", address::normalize_address(addr)).as_bytes());
    hex::encode(digest)
}

/// In-process network shared by all sessions created from it.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an address reachable without opening a session for it.
    pub fn register(&self, addr: &str) -> String {
        let inbox_id = inbox_id_for(addr);
        self.state
            .lock()
            .inboxes
            .insert(address::normalize_address(addr), inbox_id.clone());
        inbox_id
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Pin the clock so every new message and conversation gets `ns`.
    /// `None` resumes the monotonic wall clock.
    pub fn pin_clock(&self, ns: Option<i64>) {
        let mut state = self.state.lock();
        if let Some(ns) = ns {
            state.last_ns = state.last_ns.max(ns);
        }
        state.pinned_ns = ns;
    }

    /// Post a message as another member, as if it arrived from a remote peer.
    pub fn deliver_as(
        &self,
        sender_inbox_id: &str,
        conversation_id: &str,
        body: &str,
    ) -> Result<Message, NetworkError> {
        let mut state = self.state.lock();
        if !state.conversation(conversation_id)?.members.iter().any(|m| m == sender_inbox_id) {
            return Err(NetworkError::Send(format!(
                "{sender_inbox_id} is not a member of {conversation_id}"
            )));
        }
        state.append(conversation_id, sender_inbox_id, body)
    }

    pub fn inject_feed_error(&self, conversation_id: &str, error: NetworkError) {
        let _ = self.state.lock().feed(conversation_id).send(Err(error));
    }

    /// Open feeds are closed, so subscribers see end-of-stream.
    pub fn close_feeds(&self) {
        self.state.lock().feeds.clear();
    }

    pub fn sessions_created(&self) -> usize {
        self.state.lock().sessions_created
    }

    pub fn send_calls(&self) -> usize {
        self.state.lock().send_calls
    }

    pub fn sync_calls(&self) -> usize {
        self.state.lock().sync_calls
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().conversations.len()
    }

    async fn delay(&self) {
        let latency = self.state.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl MessagingNetwork for LocalNetwork {
    async fn create_session(
        &self,
        signer: Arc<dyn WalletSigner>,
        options: SessionOptions,
    ) -> Result<Arc<dyn MessagingSession>, SessionError> {
        self.delay().await;
        if self.state.lock().offline {
            return Err(SessionError::Init(OFFLINE.to_string()));
        }

        let addr = signer.address();
        let inbox_id = inbox_id_for(&addr);
        signer
            .sign_message(&format!("relaygram identity: {inbox_id}"))
            .await?;

        {
            let mut state = self.state.lock();
            state
                .inboxes
                .insert(address::normalize_address(&addr), inbox_id.clone());
            state.sessions_created += 1;
        }
        tracing::debug!(
            address = %addr,
            env = %options.env,
            db_path = %options.db_path.display(),
            "Local session created"
        );

        Ok(Arc::new(LocalSession {
            network: self.clone(),
            address: addr,
            inbox_id,
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct LocalSession {
    network: LocalNetwork,
    address: String,
    inbox_id: String,
    closed: AtomicBool,
}

impl LocalSession {
    /// Latency, then closed/offline checks. `offline` maps to the caller's error kind.
    async fn enter(&self, offline: fn(String) -> NetworkError) -> Result<(), NetworkError> {
        self.network.delay().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(NetworkError::Closed);
        }
        if self.network.state.lock().offline {
            return Err(offline(OFFLINE.to_string()));
        }
        Ok(())
    }

    fn require_member(&self, conversation: &StoredConversation) -> Result<(), NetworkError> {
        if conversation.members.iter().any(|m| *m == self.inbox_id) {
            Ok(())
        } else {
            Err(NetworkError::ConversationNotFound(conversation.id.clone()))
        }
    }

    fn require_group<'a>(
        &self,
        state: &'a mut NetworkState,
        conversation_id: &str,
    ) -> Result<&'a mut StoredConversation, NetworkError> {
        let conversation = state.conversation_mut(conversation_id)?;
        self.require_member(conversation)?;
        if !conversation.is_group {
            return Err(NetworkError::Membership(format!(
                "{conversation_id} is not a group"
            )));
        }
        Ok(conversation)
    }
}

#[async_trait]
impl MessagingSession for LocalSession {
    fn inbox_id(&self) -> String {
        self.inbox_id.clone()
    }

    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sync_conversations(&self) -> Result<(), NetworkError> {
        self.network.state.lock().sync_calls += 1;
        self.enter(NetworkError::Sync).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, NetworkError> {
        self.enter(NetworkError::Sync).await?;
        let state = self.network.state.lock();
        Ok(state
            .conversations
            .iter()
            .filter(|c| c.members.iter().any(|m| *m == self.inbox_id))
            .map(|c| c.view_for(&self.inbox_id))
            .collect())
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, NetworkError> {
        self.enter(NetworkError::Sync).await?;
        let state = self.network.state.lock();
        let conversation = state.conversation(conversation_id)?;
        self.require_member(conversation)?;
        Ok(conversation.view_for(&self.inbox_id))
    }

    async fn sync_conversation(&self, conversation_id: &str) -> Result<(), NetworkError> {
        self.enter(NetworkError::Sync).await?;
        let state = self.network.state.lock();
        self.require_member(state.conversation(conversation_id)?)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, NetworkError> {
        self.enter(NetworkError::Sync).await?;
        let state = self.network.state.lock();
        let conversation = state.conversation(conversation_id)?;
        self.require_member(conversation)?;
        Ok(conversation.messages.clone())
    }

    async fn send(&self, conversation_id: &str, body: &str) -> Result<String, NetworkError> {
        self.network.state.lock().send_calls += 1;
        self.enter(NetworkError::Send).await?;
        let mut state = self.network.state.lock();
        self.require_member(state.conversation(conversation_id)?)?;
        let message = state.append(conversation_id, &self.inbox_id, body)?;
        Ok(message.id)
    }

    async fn subscribe(&self, conversation_id: &str) -> Result<MessageFeed, NetworkError> {
        self.enter(NetworkError::Subscription).await?;
        let rx = {
            let mut state = self.network.state.lock();
            self.require_member(state.conversation(conversation_id)?)?;
            state.feed(conversation_id).subscribe()
        };

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(item) => return Some((item, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Live feed lagged, skipped {} messages", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn can_message(&self, addr: &str) -> Result<bool, NetworkError> {
        self.enter(NetworkError::Lookup).await?;
        Ok(self
            .network
            .state
            .lock()
            .inboxes
            .contains_key(&address::normalize_address(addr)))
    }

    async fn find_inbox_id(&self, addr: &str) -> Result<Option<String>, NetworkError> {
        self.enter(NetworkError::Lookup).await?;
        Ok(self
            .network
            .state
            .lock()
            .inboxes
            .get(&address::normalize_address(addr))
            .cloned())
    }

    async fn new_dm(&self, peer_inbox_id: &str) -> Result<Conversation, NetworkError> {
        self.enter(NetworkError::Create).await?;
        let mut state = self.network.state.lock();
        if !state.is_known_inbox(peer_inbox_id) {
            return Err(NetworkError::Create(format!("unknown inbox {peer_inbox_id}")));
        }

        let existing = state.conversations.iter().find(|c| {
            !c.is_group
                && c.members.iter().any(|m| *m == self.inbox_id)
                && c.members.iter().any(|m| m == peer_inbox_id)
        });
        if let Some(existing) = existing {
            return Ok(existing.view_for(&self.inbox_id));
        }

        let created_at_ns = state.now_ns();
        let conversation = StoredConversation {
            id: uuid::Uuid::new_v4().simple().to_string(),
            is_group: false,
            metadata: GroupMetadata::default(),
            members: vec![self.inbox_id.clone(), peer_inbox_id.to_string()],
            created_at_ns,
            messages: Vec::new(),
        };
        let view = conversation.view_for(&self.inbox_id);
        state.conversations.push(conversation);
        Ok(view)
    }

    async fn new_group(
        &self,
        member_inbox_ids: &[String],
        metadata: GroupMetadata,
    ) -> Result<Conversation, NetworkError> {
        self.enter(NetworkError::Create).await?;
        let mut state = self.network.state.lock();
        if let Some(unknown) = member_inbox_ids.iter().find(|id| !state.is_known_inbox(id)) {
            return Err(NetworkError::Create(format!("unknown inbox {unknown}")));
        }

        let mut members = vec![self.inbox_id.clone()];
        for id in member_inbox_ids {
            if !members.contains(id) {
                members.push(id.clone());
            }
        }

        let created_at_ns = state.now_ns();
        let conversation = StoredConversation {
            id: uuid::Uuid::new_v4().simple().to_string(),
            is_group: true,
            metadata,
            members,
            created_at_ns,
            messages: Vec::new(),
        };
        let view = conversation.view_for(&self.inbox_id);
        state.conversations.push(conversation);
        Ok(view)
    }

    async fn add_members(&self, conversation_id: &str, inbox_ids: &[String]) -> Result<(), NetworkError> {
        self.enter(NetworkError::Membership).await?;
        let mut state = self.network.state.lock();
        if let Some(unknown) = inbox_ids.iter().find(|id| !state.is_known_inbox(id)) {
            return Err(NetworkError::Membership(format!("unknown inbox {unknown}")));
        }
        let group = self.require_group(&mut state, conversation_id)?;
        for id in inbox_ids {
            if !group.members.contains(id) {
                group.members.push(id.clone());
            }
        }
        Ok(())
    }

    async fn remove_members(&self, conversation_id: &str, inbox_ids: &[String]) -> Result<(), NetworkError> {
        self.enter(NetworkError::Membership).await?;
        let mut state = self.network.state.lock();
        let group = self.require_group(&mut state, conversation_id)?;
        group.members.retain(|m| !inbox_ids.contains(m));
        Ok(())
    }

    async fn update_group_name(&self, conversation_id: &str, name: &str) -> Result<(), NetworkError> {
        self.enter(NetworkError::Membership).await?;
        let mut state = self.network.state.lock();
        let group = self.require_group(&mut state, conversation_id)?;
        group.metadata.name = Some(name.to_string());
        Ok(())
    }

    async fn update_group_description(
        &self,
        conversation_id: &str,
        description: &str,
    ) -> Result<(), NetworkError> {
        self.enter(NetworkError::Membership).await?;
        let mut state = self.network.state.lock();
        let group = self.require_group(&mut state, conversation_id)?;
        group.metadata.description = Some(description.to_string());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!(address = %self.address, "Local session closed");
    }
}

/// Development signer: a hash over the address and the message.
/// Not a real wallet signature.
pub struct DevSigner {
    address: String,
}

impl DevSigner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.trim().to_string(),
        }
    }
}

#[async_trait]
impl WalletSigner for DevSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn sign_message(&self, message: &str) -> Result<Vec<u8>, SessionError> {
        let mut hasher = Sha256::new();
        hasher.update(self.address.to_lowercase().as_bytes());
        hasher.update(message.as_bytes());
        Ok(hasher.finalize().to_vec())
    }
}
