//! Identity and messaging-network session.
//!
//! The wallet and the network SDK are external capabilities, expressed as
//! traits. [`memory::LocalNetwork`] is a loopback implementation used by
//! tests and the offline demo.

pub mod memory;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::Mutex;

use crate::config::{CoreConfig, NetworkEnv};
use crate::error::{NetworkError, SessionError};
use crate::events::{CoreEvent, EventBus};
use crate::models::{address, Conversation, GroupMetadata, Message};

/// Incoming messages for one conversation.
pub type MessageFeed = BoxStream<'static, Result<Message, NetworkError>>;

/// Signs on behalf of the connected wallet.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> String;

    async fn sign_message(&self, message: &str) -> Result<Vec<u8>, SessionError>;
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub env: NetworkEnv,
    pub app_version: String,
    pub db_path: PathBuf,
}

impl SessionOptions {
    pub fn from_config(config: &CoreConfig, address: &str) -> Self {
        Self {
            env: config.env,
            app_version: config.app_version.clone(),
            db_path: config.session_db_path(address),
        }
    }
}

/// Entry point of a messaging network SDK.
#[async_trait]
pub trait MessagingNetwork: Send + Sync {
    async fn create_session(
        &self,
        signer: Arc<dyn WalletSigner>,
        options: SessionOptions,
    ) -> Result<Arc<dyn MessagingSession>, SessionError>;
}

/// One authenticated identity on the network.
#[async_trait]
pub trait MessagingSession: Send + Sync {
    fn inbox_id(&self) -> String;
    fn address(&self) -> String;

    async fn sync_conversations(&self) -> Result<(), NetworkError>;
    async fn list_conversations(&self) -> Result<Vec<Conversation>, NetworkError>;
    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, NetworkError>;

    async fn sync_conversation(&self, conversation_id: &str) -> Result<(), NetworkError>;
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, NetworkError>;
    /// Returns the id of the sent message.
    async fn send(&self, conversation_id: &str, body: &str) -> Result<String, NetworkError>;
    async fn subscribe(&self, conversation_id: &str) -> Result<MessageFeed, NetworkError>;

    async fn can_message(&self, address: &str) -> Result<bool, NetworkError>;
    async fn find_inbox_id(&self, address: &str) -> Result<Option<String>, NetworkError>;

    async fn new_dm(&self, peer_inbox_id: &str) -> Result<Conversation, NetworkError>;
    async fn new_group(
        &self,
        member_inbox_ids: &[String],
        metadata: GroupMetadata,
    ) -> Result<Conversation, NetworkError>;
    async fn add_members(
        &self,
        conversation_id: &str,
        inbox_ids: &[String],
    ) -> Result<(), NetworkError>;
    async fn remove_members(
        &self,
        conversation_id: &str,
        inbox_ids: &[String],
    ) -> Result<(), NetworkError>;
    async fn update_group_name(&self, conversation_id: &str, name: &str)
        -> Result<(), NetworkError>;
    async fn update_group_description(
        &self,
        conversation_id: &str,
        description: &str,
    ) -> Result<(), NetworkError>;

    async fn close(&self);
}

/// A connected identity. Cloning shares the same network handle.
#[derive(Clone)]
pub struct Session {
    pub address: String,
    pub inbox_id: String,
    handle: Arc<dyn MessagingSession>,
    live: Arc<AtomicBool>,
}

impl Session {
    pub fn new(handle: Arc<dyn MessagingSession>) -> Self {
        Self {
            address: handle.address(),
            inbox_id: handle.inbox_id(),
            handle,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn handle(&self) -> &Arc<dyn MessagingSession> {
        &self.handle
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.handle.close().await;
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("inbox_id", &self.inbox_id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Owns the single live session. Connects are serialized, so concurrent
/// calls for the same address share one session.
pub struct SessionProvider {
    network: Arc<dyn MessagingNetwork>,
    config: CoreConfig,
    events: EventBus,
    current: Mutex<Option<Session>>,
}

impl SessionProvider {
    pub fn new(network: Arc<dyn MessagingNetwork>, config: CoreConfig, events: EventBus) -> Self {
        Self {
            network,
            config,
            events,
            current: Mutex::new(None),
        }
    }

    pub async fn connect(
        &self,
        signer: Option<Arc<dyn WalletSigner>>,
    ) -> Result<Session, SessionError> {
        let signer = signer.ok_or(SessionError::WalletNotConnected)?;
        let address = signer.address();
        if !address::is_valid_address(address.trim()) {
            return Err(SessionError::SignerUnavailable(format!(
                "signer reported an invalid address: {address}"
            )));
        }

        let mut current = self.current.lock().await;

        if let Some(existing) = current.as_ref() {
            if existing.is_live() && address::addresses_equal(&existing.address, &address) {
                tracing::debug!(address = %existing.address, "Reusing live session");
                return Ok(existing.clone());
            }
        }

        if let Some(previous) = current.take() {
            tracing::info!(address = %previous.address, "Closing session for previous identity");
            previous.close().await;
            self.events.publish(CoreEvent::SessionClosed {
                address: previous.address.clone(),
            });
        }

        let options = SessionOptions::from_config(&self.config, &address);
        let handle = self
            .network
            .create_session(signer, options)
            .await
            .map_err(|err| {
                tracing::error!("Failed to create session for {}: {}", address, err);
                err
            })?;

        let session = Session::new(handle);
        tracing::info!(
            address = %session.address,
            inbox_id = %session.inbox_id,
            env = %self.config.env,
            "Messaging session ready"
        );
        self.events.publish(CoreEvent::SessionConnected {
            address: session.address.clone(),
            inbox_id: session.inbox_id.clone(),
        });

        *current = Some(session.clone());
        Ok(session)
    }

    pub async fn disconnect(&self) {
        let mut current = self.current.lock().await;
        if let Some(session) = current.take() {
            session.close().await;
            tracing::info!(address = %session.address, "Session disconnected");
            self.events.publish(CoreEvent::SessionClosed {
                address: session.address,
            });
        }
    }

    pub async fn current(&self) -> Option<Session> {
        self.current
            .lock()
            .await
            .as_ref()
            .filter(|s| s.is_live())
            .cloned()
    }

    pub async fn require(&self) -> Result<Session, SessionError> {
        self.current().await.ok_or(SessionError::Closed)
    }
}
