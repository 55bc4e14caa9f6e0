//! Demo mode: seeds the loopback network with contacts who answer back.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use tokio::task::JoinHandle;

use relaygram_core::models::{GroupMetadata, MessageContent};
use relaygram_core::session::memory::{DevSigner, LocalNetwork};
use relaygram_core::session::{
    MessageFeed, MessagingNetwork, MessagingSession, SessionOptions, WalletSigner,
};
use relaygram_core::store::DisplayNameCache;
use relaygram_core::CoreConfig;

/// Prefilled on the connect screen in demo mode
pub const DEMO_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

const REPLY_DELAY: Duration = Duration::from_millis(600);

struct Contact {
    address: &'static str,
    label: &'static str,
    greeting: &'static str,
}

const CONTACTS: [Contact; 3] = [
    Contact {
        address: "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
        label: "Alice",
        greeting: "Hey! Welcome to Relaygram.",
    },
    Contact {
        address: "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
        label: "Bob",
        greeting: "gm",
    },
    Contact {
        address: "0x90f79bf6eb2c4f870365e785982e1f101e93b906",
        label: "Carol",
        greeting: "Did you get the invoice I sent?",
    },
];

/// Reply tasks for the demo contacts. Dropping stops them.
pub struct DemoBots {
    tasks: Vec<JoinHandle<()>>,
}

impl DemoBots {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for DemoBots {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Register `own_address`, open a DM from each contact plus one group, and
/// label the DMs in the local display-name cache.
pub async fn seed(network: &LocalNetwork, config: &CoreConfig, own_address: &str) -> Result<DemoBots> {
    let own_inbox = network.register(own_address);
    let mut display_names = DisplayNameCache::open(&config.data_dir);
    let mut sessions: Vec<Arc<dyn MessagingSession>> = Vec::new();
    let mut tasks = Vec::new();

    for contact in &CONTACTS {
        let signer: Arc<dyn WalletSigner> = Arc::new(DevSigner::new(contact.address));
        let session = network
            .create_session(signer, SessionOptions::from_config(config, contact.address))
            .await?;
        let dm = session.new_dm(&own_inbox).await?;
        session.send(&dm.id, contact.greeting).await?;
        display_names.set_label(&dm.id, contact.label)?;

        // subscribe here so the contact hears anything sent once seeding returns
        let feed = session.subscribe(&dm.id).await?;
        tasks.push(tokio::spawn(reply_loop(
            session.clone(),
            feed,
            dm.id.clone(),
            contact.label,
        )));
        sessions.push(session);
    }

    let members = vec![own_inbox, sessions[1].inbox_id()];
    let group = sessions[0]
        .new_group(
            &members,
            GroupMetadata {
                name: Some("Weekend plans".to_string()),
                description: Some("Who's in for Saturday?".to_string()),
            },
        )
        .await?;
    sessions[0].send(&group.id, "Hike on Saturday?").await?;
    sessions[1].send(&group.id, "I'm in!").await?;

    tracing::info!(contacts = CONTACTS.len(), "Demo network seeded");
    Ok(DemoBots { tasks })
}

async fn reply_loop(
    session: Arc<dyn MessagingSession>,
    mut feed: MessageFeed,
    conversation_id: String,
    name: &'static str,
) {
    let own = session.inbox_id();

    while let Some(item) = feed.next().await {
        let message = match item {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("Demo contact {} feed ended: {}", name, err);
                break;
            }
        };
        if message.is_from(&own) {
            continue;
        }
        tokio::time::sleep(REPLY_DELAY).await;
        let reply = match &message.content {
            MessageContent::Text(text) => format!("{name} here. You said: {text}"),
            MessageContent::File(file) => format!("Thanks for {}", file.name),
        };
        if let Err(err) = session.send(&conversation_id, &reply).await {
            tracing::warn!("Demo contact {} failed to reply: {}", name, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaygram_core::runtime::CoreRuntime;
    use relaygram_core::CoreEvent;

    #[tokio::test]
    async fn seeded_network_has_labelled_conversations_and_replies() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::new(dir.path())
            .with_poll_interval(Duration::from_secs(3600))
            .with_send_settle_delay(Duration::ZERO);
        let network = LocalNetwork::new();
        let bots = seed(&network, &config, DEMO_ADDRESS).await.unwrap();
        assert_eq!(bots.len(), 3);

        let signer: Arc<dyn WalletSigner> = Arc::new(DevSigner::new(DEMO_ADDRESS));
        let runtime = CoreRuntime::connect(config, Arc::new(network.clone()), Some(signer))
            .await
            .unwrap();
        let conversations = runtime.conversations();
        assert_eq!(conversations.len(), 4);

        let titles: Vec<String> = conversations
            .iter()
            .map(|c| runtime.title_for(&c.conversation))
            .collect();
        assert!(titles.contains(&"Alice".to_string()));
        assert!(titles.contains(&"Weekend plans".to_string()));

        let alice = conversations
            .iter()
            .find(|c| runtime.title_for(&c.conversation) == "Alice")
            .unwrap()
            .conversation
            .id
            .clone();
        let mut events = runtime.events().subscribe();
        runtime.open_conversation(&alice).await.unwrap();
        let sent_id = runtime.send_message("ping").await.unwrap();

        let arrived = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Ok(CoreEvent::LiveMessage {
                        conversation_id,
                        message_id,
                    }) if conversation_id == alice && message_id != sent_id => return,
                    Ok(_) => {}
                    Err(err) => panic!("event bus failed: {err}"),
                }
            }
        })
        .await;
        assert!(arrived.is_ok());

        let detail = runtime.active_detail().unwrap();
        detail.refresh().await.unwrap();
        assert!(detail.messages().iter().any(|m| matches!(
            &m.content,
            MessageContent::Text(t) if t == "Alice here. You said: ping"
        )));
        runtime.shutdown().await;
    }
}
