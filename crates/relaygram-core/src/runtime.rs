use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::attachments::{prepare_attachment, FileHost, MemoryFileHost};
use crate::config::CoreConfig;
use crate::error::{CoreResult, ValidationError};
use crate::events::{CoreEvent, EventBus};
use crate::membership::MembershipService;
use crate::models::{Conversation, Message};
use crate::session::{MessagingNetwork, Session, SessionProvider, WalletSigner};
use crate::store::{
    display_title, ConversationDetail, ConversationIndex, DisplayNameCache, DisplayOverride,
    IndexedConversation, RefreshOutcome,
};
use crate::streaming::LiveChannel;

/// Why the conversation index is being refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Initial,
    Poll,
    MessageSent,
    ConversationCreated,
    MembershipChanged,
    LiveMessage,
    /// Explicit user refresh, or recovery after missed events
    Resync,
}

impl RefreshTrigger {
    pub fn from_event(event: &CoreEvent) -> Option<Self> {
        match event {
            CoreEvent::MessageSent { .. } => Some(RefreshTrigger::MessageSent),
            CoreEvent::ConversationCreated { .. } => Some(RefreshTrigger::ConversationCreated),
            CoreEvent::MembershipChanged { .. } => Some(RefreshTrigger::MembershipChanged),
            CoreEvent::LiveMessage { .. } => Some(RefreshTrigger::LiveMessage),
            _ => None,
        }
    }
}

/// Single path through which the conversation index gets refreshed.
pub struct Reconciler {
    index: Arc<ConversationIndex>,
    events: EventBus,
    poll_interval: Duration,
    /// A push/local trigger was coalesced into an in-flight refresh that may predate it
    pending: AtomicBool,
}

impl Reconciler {
    pub fn new(index: Arc<ConversationIndex>, events: EventBus, poll_interval: Duration) -> Self {
        Self {
            index,
            events,
            poll_interval,
            pending: AtomicBool::new(false),
        }
    }

    /// Returns `None` when a poll tick was skipped because the index is fresh.
    pub async fn reconcile(&self, trigger: RefreshTrigger) -> Option<RefreshOutcome> {
        if trigger == RefreshTrigger::Poll && self.is_fresh() {
            tracing::debug!("Poll skipped, index refreshed recently");
            return None;
        }

        let mut outcome = match trigger {
            RefreshTrigger::Initial => self.index.load().await,
            _ => self.index.refetch().await,
        };

        match &outcome {
            RefreshOutcome::Coalesced if trigger != RefreshTrigger::Poll => {
                self.pending.store(true, Ordering::SeqCst);
            }
            RefreshOutcome::Refreshed { .. } => {
                while self.pending.swap(false, Ordering::SeqCst) {
                    tracing::debug!("Re-running refresh for a coalesced trigger");
                    outcome = self.index.refetch().await;
                }
            }
            _ => {}
        }

        match &outcome {
            RefreshOutcome::Refreshed { count } => {
                tracing::debug!(?trigger, count, "Conversations reconciled");
                self.events
                    .publish(CoreEvent::ConversationsUpdated { count: *count });
            }
            RefreshOutcome::Failed(reason) => {
                tracing::debug!(?trigger, "Reconcile failed: {}", reason);
            }
            RefreshOutcome::Coalesced => {}
        }
        Some(outcome)
    }

    /// Refreshed within the last half poll interval.
    fn is_fresh(&self) -> bool {
        self.index
            .last_refreshed()
            .is_some_and(|at| at.elapsed() < self.poll_interval / 2)
    }

    pub async fn run(self: Arc<Self>, token: CancellationToken, mut rx: broadcast::Receiver<CoreEvent>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval fires immediately; the initial load already ran
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => break,

                event = rx.recv() => match event {
                    Ok(event) => {
                        if let Some(trigger) = RefreshTrigger::from_event(&event) {
                            self.reconcile(trigger).await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Reconciler lagged by {} events, resyncing", skipped);
                        self.reconcile(RefreshTrigger::Resync).await;
                    }
                    Err(RecvError::Closed) => break,
                },

                _ = ticker.tick() => {
                    self.reconcile(RefreshTrigger::Poll).await;
                }
            }
        }
        tracing::debug!("Reconciler stopped");
    }
}

/// A connected client: session, stores, reconciler, and the open conversation.
pub struct CoreRuntime {
    config: CoreConfig,
    events: EventBus,
    provider: SessionProvider,
    session: Session,
    index: Arc<ConversationIndex>,
    reconciler: Arc<Reconciler>,
    membership: MembershipService,
    display_names: Arc<Mutex<DisplayNameCache>>,
    file_host: Arc<dyn FileHost>,
    /// Shared with the live handler, which always refreshes whatever is open now
    active: Arc<RwLock<Option<Arc<ConversationDetail>>>>,
    live: tokio::sync::Mutex<LiveChannel>,
    shutdown: CancellationToken,
    reconciler_task: Mutex<Option<JoinHandle<()>>>,
}

impl CoreRuntime {
    pub async fn connect(
        config: CoreConfig,
        network: Arc<dyn MessagingNetwork>,
        signer: Option<Arc<dyn WalletSigner>>,
    ) -> CoreResult<Self> {
        Self::connect_with_host(config, network, signer, Arc::new(MemoryFileHost::new())).await
    }

    pub async fn connect_with_host(
        config: CoreConfig,
        network: Arc<dyn MessagingNetwork>,
        signer: Option<Arc<dyn WalletSigner>>,
        file_host: Arc<dyn FileHost>,
    ) -> CoreResult<Self> {
        let events = EventBus::new();
        let provider = SessionProvider::new(network, config.clone(), events.clone());
        let session = provider.connect(signer).await?;

        let index = Arc::new(ConversationIndex::new(session.clone()));
        let reconciler = Arc::new(Reconciler::new(
            index.clone(),
            events.clone(),
            config.poll_interval,
        ));
        let membership = MembershipService::new(session.clone(), events.clone());
        let display_names = Arc::new(Mutex::new(DisplayNameCache::open(&config.data_dir)));

        // subscribe before the initial load so nothing published during it is missed
        let rx = events.subscribe();
        reconciler.reconcile(RefreshTrigger::Initial).await;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(reconciler.clone().run(shutdown.clone(), rx));

        Ok(Self {
            config,
            events,
            provider,
            session,
            index,
            reconciler,
            membership,
            display_names,
            file_host,
            active: Arc::new(RwLock::new(None)),
            live: tokio::sync::Mutex::new(LiveChannel::new()),
            shutdown,
            reconciler_task: Mutex::new(Some(task)),
        })
    }

    // ===== Getters =====

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn index(&self) -> &Arc<ConversationIndex> {
        &self.index
    }

    pub fn membership(&self) -> &MembershipService {
        &self.membership
    }

    pub fn conversations(&self) -> Vec<IndexedConversation> {
        self.index.list()
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        self.index.get(conversation_id)
    }

    pub fn title_for(&self, conversation: &Conversation) -> String {
        let names = self.display_names.lock();
        display_title(conversation, names.get(&conversation.id))
    }

    pub fn active_detail(&self) -> Option<Arc<ConversationDetail>> {
        self.active.read().clone()
    }

    pub async fn reconcile(&self, trigger: RefreshTrigger) -> Option<RefreshOutcome> {
        self.reconciler.reconcile(trigger).await
    }

    // ===== Conversation selection =====

    /// Make `conversation_id` the open conversation: load its messages and
    /// move the live feed to it. Re-opening the open conversation keeps its
    /// detail. The detail stays selected even when the load fails, so a
    /// later refresh can recover it.
    pub async fn open_conversation(&self, conversation_id: &str) -> CoreResult<Arc<ConversationDetail>> {
        let detail = {
            let mut active = self.active.write();
            let open = active
                .as_ref()
                .filter(|current| current.conversation_id() == conversation_id)
                .cloned();
            match open {
                Some(current) => current,
                None => {
                    let detail = Arc::new(ConversationDetail::new(
                        conversation_id,
                        self.session.clone(),
                        self.events.clone(),
                        self.config.send_settle_delay,
                    ));
                    *active = Some(detail.clone());
                    detail
                }
            }
        };

        let active = Arc::downgrade(&self.active);
        let events = self.events.clone();
        let handler = move |message: Message| {
            events.publish(CoreEvent::LiveMessage {
                conversation_id: message.conversation_id.clone(),
                message_id: message.id.clone(),
            });
            let Some(slot) = active.upgrade() else {
                return;
            };
            let open = slot
                .read()
                .clone()
                .filter(|detail| detail.conversation_id() == message.conversation_id);
            if let Some(detail) = open {
                tokio::spawn(async move {
                    if let Err(err) = detail.refresh().await {
                        tracing::warn!("Refresh after live message failed: {}", err);
                    }
                });
            }
        };
        self.live
            .lock()
            .await
            .select(&self.session, conversation_id, handler)
            .await?;

        detail.refresh().await?;
        tracing::info!(conversation_id = %conversation_id, "Conversation opened");
        Ok(detail)
    }

    pub async fn close_conversation(&self) {
        self.live.lock().await.clear();
        *self.active.write() = None;
    }

    fn require_active(&self) -> CoreResult<Arc<ConversationDetail>> {
        self.active_detail()
            .ok_or_else(|| ValidationError::NoConversation.into())
    }

    pub async fn send_message(&self, content: &str) -> CoreResult<String> {
        self.require_active()?.send(content).await
    }

    pub async fn send_file(&self, path: &Path, caption: Option<String>) -> CoreResult<String> {
        let detail = self.require_active()?;
        let payload = prepare_attachment(self.file_host.as_ref(), path, caption).await?;
        detail.send_attachment(payload).await
    }

    // ===== Display names =====

    pub fn display_override(&self, conversation_id: &str) -> Option<DisplayOverride> {
        self.display_names.lock().get(conversation_id).cloned()
    }

    pub fn set_display_label(&self, conversation_id: &str, label: &str) -> CoreResult<()> {
        self.display_names.lock().set_label(conversation_id, label)
    }

    pub fn set_display_address(&self, conversation_id: &str, address: &str) -> CoreResult<()> {
        self.display_names.lock().set_address(conversation_id, address)
    }

    pub fn clear_display_override(&self, conversation_id: &str) -> CoreResult<bool> {
        self.display_names.lock().remove(conversation_id)
    }

    // ===== Lifecycle =====

    /// Stop the reconciler and live feed, then close the session.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.reconciler_task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::warn!("Reconciler task ended abnormally: {}", err);
            }
        }
        self.close_conversation().await;
        self.provider.disconnect().await;
        self.index.clear();
        tracing::info!(address = %self.session.address, "Runtime shut down");
    }
}

impl Drop for CoreRuntime {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::session::memory::{DevSigner, LocalNetwork};
    use tempfile::{tempdir, TempDir};

    const ME: &str = "0x1000000000000000000000000000000000000001";
    const PEERS: [&str; 3] = [
        "0x2000000000000000000000000000000000000002",
        "0x3000000000000000000000000000000000000003",
        "0x4000000000000000000000000000000000000004",
    ];

    async fn runtime(network: &LocalNetwork) -> (CoreRuntime, TempDir) {
        let dir = tempdir().unwrap();
        let config = CoreConfig::new(dir.path())
            .with_poll_interval(Duration::from_secs(3600))
            .with_send_settle_delay(Duration::ZERO);
        let runtime = CoreRuntime::connect(
            config,
            Arc::new(network.clone()),
            Some(Arc::new(DevSigner::new(ME))),
        )
        .await
        .unwrap();
        (runtime, dir)
    }

    async fn eventually(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn new_identity_starts_with_empty_list() {
        let network = LocalNetwork::new();
        let (runtime, _dir) = runtime(&network).await;
        assert!(runtime.conversations().is_empty());
        assert!(runtime.index().is_loaded());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn connect_without_wallet_fails() {
        let network = LocalNetwork::new();
        let err = CoreRuntime::connect(CoreConfig::new("/tmp/unused"), Arc::new(network), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Session(_)));
    }

    #[tokio::test]
    async fn reachable_dm_appears_in_list() {
        let network = LocalNetwork::new();
        network.register(PEERS[0]);
        let (runtime, _dir) = runtime(&network).await;

        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        assert!(eventually(|| runtime.conversation(&dm.id).is_some()).await);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn sent_conversation_moves_to_top() {
        let network = LocalNetwork::new();
        for peer in PEERS {
            network.register(peer);
        }
        let (runtime, _dir) = runtime(&network).await;
        let mut ids = Vec::new();
        for peer in PEERS {
            ids.push(runtime.membership().start_direct(peer).await.unwrap().id);
        }
        runtime.reconcile(RefreshTrigger::Resync).await;
        assert_eq!(runtime.conversations()[0].conversation.id, ids[2]);

        runtime.open_conversation(&ids[0]).await.unwrap();
        runtime.send_message("hello").await.unwrap();

        let outcome = runtime.reconcile(RefreshTrigger::MessageSent).await;
        assert!(matches!(outcome, Some(RefreshOutcome::Refreshed { count: 3 })));
        assert_eq!(runtime.conversations()[0].conversation.id, ids[0]);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn background_reconciler_reacts_to_send() {
        let network = LocalNetwork::new();
        for peer in PEERS {
            network.register(peer);
        }
        let (runtime, _dir) = runtime(&network).await;
        let mut ids = Vec::new();
        for peer in PEERS {
            ids.push(runtime.membership().start_direct(peer).await.unwrap().id);
        }

        runtime.open_conversation(&ids[0]).await.unwrap();
        runtime.send_message("bump").await.unwrap();

        assert!(
            eventually(|| runtime
                .conversations()
                .first()
                .is_some_and(|c| c.conversation.id == ids[0]))
            .await
        );
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn failed_poll_keeps_existing_list() {
        let network = LocalNetwork::new();
        for peer in PEERS {
            network.register(peer);
        }
        let (runtime, _dir) = runtime(&network).await;
        for peer in PEERS {
            runtime.membership().start_direct(peer).await.unwrap();
        }
        runtime.reconcile(RefreshTrigger::Resync).await;
        assert_eq!(runtime.conversations().len(), 3);

        network.set_offline(true);
        let outcome = runtime.reconcile(RefreshTrigger::Resync).await;
        assert!(matches!(outcome, Some(RefreshOutcome::Failed(_))));
        assert_eq!(runtime.conversations().len(), 3);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn poll_is_skipped_while_fresh() {
        let network = LocalNetwork::new();
        let (runtime, _dir) = runtime(&network).await;
        let before = network.sync_calls();

        assert!(runtime.reconcile(RefreshTrigger::Poll).await.is_none());
        assert_eq!(network.sync_calls(), before);
        assert!(runtime.reconcile(RefreshTrigger::LiveMessage).await.is_some());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn too_long_message_never_sent() {
        let network = LocalNetwork::new();
        network.register(PEERS[0]);
        let (runtime, _dir) = runtime(&network).await;
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        runtime.open_conversation(&dm.id).await.unwrap();

        let err = runtime.send_message(&"x".repeat(4001)).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(network.send_calls(), 0);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn send_without_open_conversation_fails() {
        let network = LocalNetwork::new();
        let (runtime, _dir) = runtime(&network).await;
        let err = runtime.send_message("hi").await.unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::NoConversation));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn live_message_refreshes_open_conversation() {
        let network = LocalNetwork::new();
        let peer = network.register(PEERS[0]);
        let (runtime, _dir) = runtime(&network).await;
        let mut rx = runtime.events().subscribe();
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        let detail = runtime.open_conversation(&dm.id).await.unwrap();

        network.deliver_as(&peer, &dm.id, "ping").unwrap();

        assert!(eventually(|| detail.messages().len() == 1).await);
        let mut saw_live = false;
        while let Ok(event) = rx.try_recv() {
            saw_live |= matches!(event, CoreEvent::LiveMessage { .. });
        }
        assert!(saw_live);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn reopening_open_conversation_keeps_live_refresh() {
        let network = LocalNetwork::new();
        let peer = network.register(PEERS[0]);
        let (runtime, _dir) = runtime(&network).await;
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        let first = runtime.open_conversation(&dm.id).await.unwrap();

        // starting a chat with the same peer yields the same conversation
        let again = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        assert_eq!(again.id, dm.id);
        let detail = runtime.open_conversation(&again.id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &detail));
        drop(first);

        network.deliver_as(&peer, &dm.id, "ping").unwrap();
        assert!(eventually(|| detail.messages().len() == 1).await);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn live_refresh_follows_newly_opened_detail() {
        let network = LocalNetwork::new();
        let peer = network.register(PEERS[0]);
        let other = network.register(PEERS[1]);
        let (runtime, _dir) = runtime(&network).await;
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        let second = runtime.membership().start_direct(PEERS[1]).await.unwrap();

        runtime.open_conversation(&dm.id).await.unwrap();
        runtime.open_conversation(&second.id).await.unwrap();
        let detail = runtime.open_conversation(&dm.id).await.unwrap();

        network.deliver_as(&other, &second.id, "elsewhere").unwrap();
        network.deliver_as(&peer, &dm.id, "here").unwrap();
        assert!(eventually(|| detail.messages().len() == 1).await);
        assert_eq!(detail.messages()[0].content.preview_text(), "here");
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn coalesced_send_trigger_reruns_refresh() {
        let network = LocalNetwork::new();
        for peer in &PEERS[..2] {
            network.register(peer);
        }
        let (runtime, _dir) = runtime(&network).await;
        let older = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        let newer = runtime.membership().start_direct(PEERS[1]).await.unwrap();
        runtime.reconcile(RefreshTrigger::Resync).await;
        assert_eq!(runtime.conversations()[0].conversation.id, newer.id);

        network.set_latency(Duration::from_millis(200));
        let before = network.sync_calls();
        let (resync, sent) = tokio::join!(runtime.reconcile(RefreshTrigger::Resync), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            runtime.session().handle().send(&older.id, "bump").await.unwrap();
            runtime.reconcile(RefreshTrigger::MessageSent).await
        });

        assert_eq!(sent, Some(RefreshOutcome::Coalesced));
        assert!(matches!(resync, Some(RefreshOutcome::Refreshed { count: 2 })));
        assert_eq!(network.sync_calls(), before + 2);
        assert_eq!(runtime.conversations()[0].conversation.id, older.id);
        network.set_latency(Duration::ZERO);
        runtime.shutdown().await;
    }

    struct WarnCounter(Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn failed_background_refresh_warns_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let warnings = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(WarnCounter(warnings.clone())),
        );
        let network = LocalNetwork::new();
        let (runtime, _dir) = runtime(&network).await;
        assert_eq!(warnings.load(Ordering::SeqCst), 0);

        network.set_offline(true);
        let outcome = runtime.reconcile(RefreshTrigger::Resync).await;
        assert!(matches!(outcome, Some(RefreshOutcome::Failed(_))));
        assert_eq!(warnings.load(Ordering::SeqCst), 1);

        network.set_offline(false);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn closing_conversation_stops_live_updates() {
        let network = LocalNetwork::new();
        let peer = network.register(PEERS[0]);
        let (runtime, _dir) = runtime(&network).await;
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        let detail = runtime.open_conversation(&dm.id).await.unwrap();
        runtime.close_conversation().await;
        assert!(runtime.active_detail().is_none());

        network.deliver_as(&peer, &dm.id, "ignored").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(detail.messages().is_empty());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn display_override_changes_title() {
        let network = LocalNetwork::new();
        network.register(PEERS[0]);
        let (runtime, _dir) = runtime(&network).await;
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();

        runtime.set_display_address(&dm.id, PEERS[0]).unwrap();
        assert_eq!(runtime.title_for(&dm), "0x2000...0002");
        runtime.set_display_label(&dm.id, "Alice").unwrap();
        assert_eq!(runtime.title_for(&dm), "Alice");
        assert_eq!(
            runtime.display_override(&dm.id).and_then(|o| o.label),
            Some("Alice".to_string())
        );
        assert!(runtime.clear_display_override(&dm.id).unwrap());
        assert!(runtime.display_override(&dm.id).is_none());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn send_file_delivers_payload() {
        let network = LocalNetwork::new();
        network.register(PEERS[0]);
        let (runtime, dir) = runtime(&network).await;
        let dm = runtime.membership().start_direct(PEERS[0]).await.unwrap();
        let detail = runtime.open_conversation(&dm.id).await.unwrap();

        let path = dir.path().join("photo.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        runtime.send_file(&path, None).await.unwrap();

        let messages = detail.messages();
        assert!(matches!(
            &messages[0].content,
            crate::models::MessageContent::File(p) if p.name == "photo.png"
        ));
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_session() {
        let network = LocalNetwork::new();
        let (runtime, _dir) = runtime(&network).await;
        let session = runtime.session().clone();
        runtime.shutdown().await;
        assert!(!session.is_live());
        assert!(runtime.conversations().is_empty());
    }
}
