//! Live message feed for the open conversation.
//!
//! A [`LiveSubscription`] owns one spawned task that forwards feed items to
//! a handler. The task stops when its [`CancellationToken`] fires, when the
//! subscription is dropped, or on the first feed error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::NetworkError;
use crate::models::Message;
use crate::session::Session;

pub struct LiveSubscription {
    conversation_id: String,
    token: CancellationToken,
    active: Arc<AtomicBool>,
    task: Option<JoinHandle<Result<(), NetworkError>>>,
}

impl LiveSubscription {
    pub async fn open<F>(
        session: &Session,
        conversation_id: &str,
        mut handler: F,
    ) -> Result<Self, NetworkError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        let mut feed = session.handle().subscribe(conversation_id).await?;
        let token = CancellationToken::new();
        let active = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn({
            let token = token.clone();
            let active = active.clone();
            let conversation_id = conversation_id.to_string();
            async move {
                let result = loop {
                    tokio::select! {
                        biased;

                        _ = token.cancelled() => break Ok(()),

                        item = feed.next() => match item {
                            Some(Ok(message)) => handler(message),
                            Some(Err(err)) => {
                                tracing::warn!(
                                    conversation_id = %conversation_id,
                                    "Live feed failed: {}",
                                    err
                                );
                                break Err(err);
                            }
                            None => {
                                tracing::debug!(conversation_id = %conversation_id, "Live feed ended");
                                break Ok(());
                            }
                        },
                    }
                };
                active.store(false, Ordering::SeqCst);
                result
            }
        });

        tracing::debug!(conversation_id = %conversation_id, "Live subscription opened");
        Ok(Self {
            conversation_id: conversation_id.to_string(),
            token,
            active,
            task: Some(task),
        })
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the task to finish. Returns the feed error if that is what stopped it.
    pub async fn join(mut self) -> Result<(), NetworkError> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|err| NetworkError::Subscription(err.to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Holds at most one live subscription.
#[derive(Default)]
pub struct LiveChannel {
    current: Option<LiveSubscription>,
}

impl LiveChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the feed to `conversation_id`. The previous subscription is
    /// cancelled before the next one opens. Selecting the conversation that
    /// is already live is a no-op.
    pub async fn select<F>(
        &mut self,
        session: &Session,
        conversation_id: &str,
        handler: F,
    ) -> Result<(), NetworkError>
    where
        F: FnMut(Message) + Send + 'static,
    {
        if let Some(current) = &self.current {
            if current.conversation_id() == conversation_id && current.is_active() {
                return Ok(());
            }
        }
        self.clear();

        let subscription = LiveSubscription::open(session, conversation_id, handler).await?;
        self.current = Some(subscription);
        Ok(())
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            tracing::debug!(conversation_id = %previous.conversation_id(), "Live subscription cancelled");
            previous.cancel();
        }
    }

    pub fn active_conversation(&self) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|s| s.is_active())
            .map(|s| s.conversation_id())
    }
}
