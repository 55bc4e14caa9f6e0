use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::RwLock;

use crate::error::NetworkError;
use crate::models::Conversation;
use crate::session::Session;

/// A conversation together with the key it is ordered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedConversation {
    pub conversation: Conversation,
    pub recency_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { count: usize },
    /// Another refresh was already in flight; nothing was fetched
    Coalesced,
    Failed(String),
}

impl RefreshOutcome {
    pub fn is_refreshed(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }
}

#[derive(Default)]
struct IndexState {
    conversations: Vec<IndexedConversation>,
    loading: bool,
    loaded: bool,
    last_error: Option<String>,
    last_refreshed: Option<Instant>,
}

/// Resets the syncing flag on every exit path.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Recency-ordered list of the session's conversations.
pub struct ConversationIndex {
    session: Session,
    state: RwLock<IndexState>,
    syncing: AtomicBool,
}

impl ConversationIndex {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            state: RwLock::new(IndexState::default()),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ===== Getters =====

    pub fn list(&self) -> Vec<IndexedConversation> {
        self.state.read().conversations.clone()
    }

    pub fn get(&self, conversation_id: &str) -> Option<Conversation> {
        self.state
            .read()
            .conversations
            .iter()
            .find(|c| c.conversation.id == conversation_id)
            .map(|c| c.conversation.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn last_refreshed(&self) -> Option<Instant> {
        self.state.read().last_refreshed
    }

    // ===== Refresh =====

    /// Ask the network to pull the conversation set. Does not touch local state.
    pub async fn sync(&self) -> Result<(), NetworkError> {
        self.session
            .handle()
            .sync_conversations()
            .await
            .map_err(|err| {
                tracing::warn!("Conversation sync failed: {}", err);
                err
            })
    }

    /// Initial load. `is_loading` is true while it runs.
    pub async fn load(&self) -> RefreshOutcome {
        self.refresh(true).await
    }

    /// Background refresh. Never toggles `is_loading`.
    pub async fn refetch(&self) -> RefreshOutcome {
        self.refresh(false).await
    }

    async fn refresh(&self, initial: bool) -> RefreshOutcome {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Conversation refresh already in flight, coalescing");
            return RefreshOutcome::Coalesced;
        }
        let _guard = SyncGuard(&self.syncing);

        if initial {
            self.state.write().loading = true;
        }

        let result = self.fetch().await;

        let mut state = self.state.write();
        if initial {
            state.loading = false;
        }
        match result {
            Ok(conversations) => {
                let count = conversations.len();
                state.conversations = conversations;
                state.loaded = true;
                state.last_error = None;
                state.last_refreshed = Some(Instant::now());
                tracing::debug!("Conversation index refreshed: {} conversations", count);
                RefreshOutcome::Refreshed { count }
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!("Conversation refresh failed, keeping {} cached: {}", state.conversations.len(), reason);
                state.last_error = Some(reason.clone());
                RefreshOutcome::Failed(reason)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<IndexedConversation>, NetworkError> {
        // failures are logged once, by refresh
        let handle = self.session.handle();
        handle.sync_conversations().await?;
        let conversations = handle.list_conversations().await?;
        let mut indexed: Vec<IndexedConversation> = conversations
            .into_iter()
            .map(|conversation| IndexedConversation {
                recency_ms: conversation.recency_ms(),
                conversation,
            })
            .collect();
        sort_by_recency(&mut indexed);
        Ok(indexed)
    }

    // ===== Mutations =====

    pub fn clear(&self) {
        *self.state.write() = IndexState::default();
    }
}

/// Most recent first. Stable, so ties keep the network's listing order.
pub fn sort_by_recency(conversations: &mut [IndexedConversation]) {
    conversations.sort_by(|a, b| b.recency_ms.cmp(&a.recency_ms));
}
