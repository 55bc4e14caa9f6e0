use std::time::Duration;

use parking_lot::RwLock;

use crate::constants::MAX_MESSAGE_LENGTH;
use crate::error::{CoreResult, NetworkError, ValidationError};
use crate::events::{CoreEvent, EventBus};
use crate::models::{sort_by_sent_at, FilePayload, Message, MessageContent};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
    Failed(String),
}

/// Rejects blank input and input over the length limit. Length is counted in chars.
pub fn validate_message(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    let length = content.chars().count();
    if length > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::MessageTooLong {
            length,
            max: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(())
}

#[derive(Default)]
struct DetailState {
    messages: Vec<Message>,
    loading: bool,
    send_state: SendState,
    last_error: Option<String>,
}

/// Messages of one open conversation plus its send pipeline.
///
/// No optimistic entries: the list only ever holds what the network returned.
pub struct ConversationDetail {
    conversation_id: String,
    session: Session,
    events: EventBus,
    settle_delay: Duration,
    state: RwLock<DetailState>,
}

impl ConversationDetail {
    pub fn new(
        conversation_id: impl Into<String>,
        session: Session,
        events: EventBus,
        settle_delay: Duration,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            session,
            events,
            settle_delay,
            state: RwLock::new(DetailState::default()),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn own_inbox_id(&self) -> &str {
        &self.session.inbox_id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.read().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn send_state(&self) -> SendState {
        self.state.read().send_state.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    /// Sync then re-list. On failure the current list stays as it was.
    pub async fn refresh(&self) -> Result<usize, NetworkError> {
        self.state.write().loading = true;
        let result = self.fetch().await;

        let mut state = self.state.write();
        state.loading = false;
        match result {
            Ok(messages) => {
                let count = messages.len();
                state.messages = messages;
                state.last_error = None;
                drop(state);
                self.events.publish(CoreEvent::MessagesUpdated {
                    conversation_id: self.conversation_id.clone(),
                    count,
                });
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id,
                    "Failed to load messages: {}",
                    err
                );
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Message>, NetworkError> {
        let handle = self.session.handle();
        handle.sync_conversation(&self.conversation_id).await?;
        let mut messages = handle.list_messages(&self.conversation_id).await?;
        sort_by_sent_at(&mut messages);
        Ok(messages)
    }

    pub async fn send(&self, content: &str) -> CoreResult<String> {
        validate_message(content)?;
        self.deliver(content.to_string()).await
    }

    pub async fn send_attachment(&self, payload: FilePayload) -> CoreResult<String> {
        let body = MessageContent::File(payload)
            .encode()
            .map_err(|err| NetworkError::Send(err.to_string()))?;
        self.deliver(body).await
    }

    async fn deliver(&self, body: String) -> CoreResult<String> {
        self.state.write().send_state = SendState::Sending;

        let message_id = match self.session.handle().send(&self.conversation_id, &body).await {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(
                    conversation_id = %self.conversation_id,
                    "Failed to send message: {}",
                    err
                );
                self.state.write().send_state = SendState::Failed(err.to_string());
                return Err(err.into());
            }
        };

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        if let Err(err) = self.refresh().await {
            tracing::warn!("Message sent but refresh failed: {}", err);
        }

        self.state.write().send_state = SendState::Idle;
        tracing::info!(conversation_id = %self.conversation_id, message_id = %message_id, "Message sent");
        self.events.publish(CoreEvent::MessageSent {
            conversation_id: self.conversation_id.clone(),
        });
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::CoreError;
    use crate::session::memory::{DevSigner, LocalNetwork};
    use crate::session::{MessagingNetwork, SessionOptions};

    const ME: &str = "0x1000000000000000000000000000000000000001";
    const PEER: &str = "0x2000000000000000000000000000000000000002";

    struct Fixture {
        network: LocalNetwork,
        peer_inbox: String,
        detail: ConversationDetail,
        events: EventBus,
    }

    async fn fixture() -> Fixture {
        let network = LocalNetwork::new();
        let handle = network
            .create_session(
                Arc::new(DevSigner::new(ME)),
                SessionOptions {
                    env: Default::default(),
                    app_version: "test".into(),
                    db_path: "/tmp/unused.db3".into(),
                },
            )
            .await
            .unwrap();
        let session = Session::new(handle);
        let peer_inbox = network.register(PEER);
        let dm = session.handle().new_dm(&peer_inbox).await.unwrap();
        let events = EventBus::new();
        let detail = ConversationDetail::new(dm.id, session, events.clone(), Duration::ZERO);
        Fixture {
            network,
            peer_inbox,
            detail,
            events,
        }
    }

    #[test]
    fn validation_limits() {
        assert_eq!(validate_message(""), Err(ValidationError::EmptyMessage));
        assert_eq!(validate_message(" \n\t"), Err(ValidationError::EmptyMessage));
        assert!(validate_message(&"a".repeat(4000)).is_ok());
        assert_eq!(
            validate_message(&"a".repeat(4001)),
            Err(ValidationError::MessageTooLong {
                length: 4001,
                max: 4000
            })
        );
        // multi-byte chars count once
        assert!(validate_message(&"é".repeat(4000)).is_ok());
    }

    #[tokio::test]
    async fn invalid_sends_never_reach_network() {
        let fx = fixture().await;
        for content in [String::new(), " ".to_string(), "x".repeat(4001)] {
            let err = fx.detail.send(&content).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }
        assert_eq!(fx.network.send_calls(), 0);
        assert_eq!(fx.detail.send_state(), SendState::Idle);
    }

    #[tokio::test]
    async fn messages_are_oldest_first() {
        let fx = fixture().await;
        let id = fx.detail.conversation_id().to_string();
        for (at, body) in [(3, "third"), (1, "first"), (2, "second")] {
            fx.network.pin_clock(Some(at * 1_000_000_000));
            fx.network.deliver_as(&fx.peer_inbox, &id, body).unwrap();
        }

        assert_eq!(fx.detail.refresh().await.unwrap(), 3);
        let bodies: Vec<_> = fx
            .detail
            .messages()
            .into_iter()
            .map(|m| m.content.preview_text())
            .collect();
        assert_eq!(bodies, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn successful_send_refreshes_and_publishes() {
        let fx = fixture().await;
        let mut rx = fx.events.subscribe();

        fx.detail.send("hello").await.unwrap();

        assert_eq!(fx.detail.send_state(), SendState::Idle);
        assert_eq!(fx.detail.messages().len(), 1);
        let mut sent = false;
        while let Ok(event) = rx.try_recv() {
            sent |= matches!(event, CoreEvent::MessageSent { .. });
        }
        assert!(sent);
    }

    #[tokio::test]
    async fn failed_send_sets_failed_then_recovers() {
        let fx = fixture().await;
        fx.network.set_offline(true);

        let err = fx.detail.send("hello").await.unwrap_err();
        assert!(matches!(err, CoreError::Network(NetworkError::Send(_))));
        assert!(matches!(fx.detail.send_state(), SendState::Failed(_)));
        assert!(fx.detail.messages().is_empty());

        fx.network.set_offline(false);
        fx.detail.send("hello again").await.unwrap();
        assert_eq!(fx.detail.send_state(), SendState::Idle);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_messages() {
        let fx = fixture().await;
        fx.detail.send("kept").await.unwrap();

        fx.network.set_offline(true);
        assert!(fx.detail.refresh().await.is_err());
        assert_eq!(fx.detail.messages().len(), 1);
        assert!(fx.detail.last_error().is_some());
        assert!(!fx.detail.is_loading());
    }

    #[tokio::test]
    async fn attachment_goes_out_as_file_payload() {
        let fx = fixture().await;
        let payload = FilePayload {
            cid: "abc".into(),
            name: "notes.txt".into(),
            size: 12,
            mime_type: "text/plain".into(),
            caption: None,
        };

        fx.detail.send_attachment(payload.clone()).await.unwrap();
        let messages = fx.detail.messages();
        assert_eq!(messages[0].content, MessageContent::File(payload));
    }
}
