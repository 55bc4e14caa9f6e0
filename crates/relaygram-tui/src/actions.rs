//! Work the UI hands to the core.
//!
//! Key handlers produce an [`Action`]; the [`Dispatcher`] runs it on a
//! background task and reports an [`ActionOutcome`] back to the event loop,
//! so a slow network call never blocks rendering.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use relaygram_core::models::{address, GroupMetadata};
use relaygram_core::runtime::{CoreRuntime, RefreshTrigger};
use relaygram_core::session::memory::DevSigner;
use relaygram_core::session::{MessagingNetwork, WalletSigner};
use relaygram_core::store::RefreshOutcome;
use relaygram_core::{CoreConfig, CoreError};

use crate::ui::modal::ModalState;
use crate::ui::notifications::Notification;
use crate::ui::{App, Focus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Connect { address: String },
    OpenConversation { conversation_id: String },
    SendMessage { content: String },
    SendFile { path: PathBuf, caption: Option<String> },
    StartDirect { address: String },
    CreateGroup { addresses: Vec<String>, metadata: GroupMetadata },
    AddMembers { conversation_id: String, addresses: Vec<String> },
    RemoveMember { conversation_id: String, inbox_id: String },
    RenameGroup { conversation_id: String, name: String },
    UpdateDescription { conversation_id: String, description: String },
    LeaveGroup { conversation_id: String },
    SetDisplayOverride { conversation_id: String, label: String, address: String },
    Refresh,
}

pub enum ActionOutcome {
    Connected(Arc<CoreRuntime>),
    ConnectFailed(String),
    Opened { conversation_id: String },
    /// A new conversation exists and should be opened
    Created { conversation_id: String, notice: String },
    Left { conversation_id: String },
    MessageSent,
    SendFailed { content: String, message: String },
    Succeeded { notice: Option<String> },
    Failed { message: String, is_validation: bool },
}

impl ActionOutcome {
    fn failed(err: CoreError) -> Self {
        ActionOutcome::Failed {
            is_validation: err.is_validation(),
            message: err.to_string(),
        }
    }

    fn from_result<T>(result: Result<T, CoreError>, notice: Option<&str>) -> Self {
        match result {
            Ok(_) => ActionOutcome::Succeeded {
                notice: notice.map(str::to_string),
            },
            Err(err) => Self::failed(err),
        }
    }
}

/// Runs actions against the core and reports back over a channel.
pub struct Dispatcher {
    config: CoreConfig,
    network: Arc<dyn MessagingNetwork>,
    tx: mpsc::UnboundedSender<ActionOutcome>,
}

impl Dispatcher {
    pub fn new(
        config: CoreConfig,
        network: Arc<dyn MessagingNetwork>,
    ) -> (Self, mpsc::UnboundedReceiver<ActionOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { config, network, tx }, rx)
    }

    pub fn dispatch(&self, core: Option<Arc<CoreRuntime>>, action: Action) {
        tracing::debug!(?action, "Dispatching action");
        let tx = self.tx.clone();

        if let Action::Connect { address } = action {
            let config = self.config.clone();
            let network = self.network.clone();
            tokio::spawn(async move {
                let signer: Arc<dyn WalletSigner> = Arc::new(DevSigner::new(&address));
                let outcome = match CoreRuntime::connect(config, network, Some(signer)).await {
                    Ok(runtime) => ActionOutcome::Connected(Arc::new(runtime)),
                    Err(err) => {
                        tracing::error!("Connect failed: {}", err);
                        ActionOutcome::ConnectFailed(err.to_string())
                    }
                };
                let _ = tx.send(outcome);
            });
            return;
        }

        let Some(core) = core else {
            tracing::warn!(?action, "Dropping action: not connected");
            return;
        };
        tokio::spawn(async move {
            let outcome = run(&core, action).await;
            let _ = tx.send(outcome);
        });
    }
}

async fn run(core: &CoreRuntime, action: Action) -> ActionOutcome {
    match action {
        // handled before spawning
        Action::Connect { .. } => ActionOutcome::Succeeded { notice: None },
        Action::OpenConversation { conversation_id } => {
            match core.open_conversation(&conversation_id).await {
                Ok(_) => ActionOutcome::Opened { conversation_id },
                Err(err) => ActionOutcome::failed(err),
            }
        }
        Action::SendMessage { content } => match core.send_message(&content).await {
            Ok(_) => ActionOutcome::MessageSent,
            Err(err) => ActionOutcome::SendFailed {
                content,
                message: err.to_string(),
            },
        },
        Action::SendFile { path, caption } => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ActionOutcome::from_result(
                core.send_file(&path, caption).await,
                Some(&format!("Sent {name}")),
            )
        }
        Action::StartDirect { address } => match core.membership().start_direct(&address).await {
            Ok(conversation) => ActionOutcome::Created {
                conversation_id: conversation.id,
                notice: format!("Chat with {} started", address::abbreviate_address(&address)),
            },
            Err(err) => ActionOutcome::failed(err),
        },
        Action::CreateGroup {
            addresses,
            metadata,
        } => match core.membership().create_group(&addresses, metadata).await {
            Ok(conversation) => ActionOutcome::Created {
                conversation_id: conversation.id,
                notice: format!("Group created with {} members", addresses.len() + 1),
            },
            Err(err) => ActionOutcome::failed(err),
        },
        Action::AddMembers {
            conversation_id,
            addresses,
        } => match core.membership().add_members(&conversation_id, &addresses).await {
            Ok(()) => ActionOutcome::Succeeded {
                notice: Some(match addresses.len() {
                    1 => "Member added".to_string(),
                    n => format!("{n} members added"),
                }),
            },
            Err(err) => ActionOutcome::failed(err),
        },
        Action::RemoveMember {
            conversation_id,
            inbox_id,
        } => ActionOutcome::from_result(
            core.membership()
                .remove_inbox_ids(&conversation_id, &[inbox_id])
                .await,
            Some("Member removed"),
        ),
        Action::RenameGroup {
            conversation_id,
            name,
        } => ActionOutcome::from_result(
            core.membership().update_name(&conversation_id, &name).await,
            Some("Group renamed"),
        ),
        Action::UpdateDescription {
            conversation_id,
            description,
        } => ActionOutcome::from_result(
            core.membership()
                .update_description(&conversation_id, &description)
                .await,
            Some("Description updated"),
        ),
        Action::LeaveGroup { conversation_id } => {
            match core.membership().leave(&conversation_id).await {
                Ok(()) => {
                    if core
                        .active_detail()
                        .is_some_and(|d| d.conversation_id() == conversation_id)
                    {
                        core.close_conversation().await;
                    }
                    ActionOutcome::Left { conversation_id }
                }
                Err(err) => ActionOutcome::failed(err),
            }
        }
        Action::SetDisplayOverride {
            conversation_id,
            label,
            address,
        } => ActionOutcome::from_result(
            set_display_override(core, &conversation_id, &label, &address),
            Some("Display name saved"),
        ),
        Action::Refresh => match core.reconcile(RefreshTrigger::Resync).await {
            Some(RefreshOutcome::Failed(reason)) => ActionOutcome::Failed {
                message: reason,
                is_validation: false,
            },
            _ => ActionOutcome::Succeeded { notice: None },
        },
    }
}

/// Blank label and address together reset the override.
fn set_display_override(
    core: &CoreRuntime,
    conversation_id: &str,
    label: &str,
    address: &str,
) -> Result<(), CoreError> {
    let address = address.trim();
    if label.trim().is_empty() && address.is_empty() {
        core.clear_display_override(conversation_id)?;
        return Ok(());
    }
    if !address.is_empty() {
        core.set_display_address(conversation_id, address)?;
    }
    core.set_display_label(conversation_id, label)
}

/// Fold an outcome into UI state. Returns a follow-up action, if any.
pub fn apply_outcome(app: &mut App, outcome: ActionOutcome) -> Option<Action> {
    match outcome {
        ActionOutcome::Connected(core) => {
            app.attach_core(core);
            None
        }
        ActionOutcome::ConnectFailed(message) => {
            app.connecting = false;
            app.notify(Notification::error(message));
            None
        }
        ActionOutcome::Opened { conversation_id } => {
            app.scroll_offset = 0;
            app.sync_from_core();
            tracing::debug!(conversation_id = %conversation_id, "Conversation shown");
            None
        }
        ActionOutcome::Created {
            conversation_id,
            notice,
        } => {
            app.modal_state = ModalState::None;
            app.notify(Notification::success(notice));
            app.focus = Focus::Composer;
            Some(Action::OpenConversation { conversation_id })
        }
        ActionOutcome::Left { conversation_id } => {
            if matches!(&app.modal_state, ModalState::GroupInfo(info) if info.conversation_id == conversation_id)
            {
                app.modal_state = ModalState::None;
            }
            app.focus = Focus::Sidebar;
            app.sync_from_core();
            app.notify(Notification::info("You left the group"));
            None
        }
        ActionOutcome::MessageSent => {
            app.outgoing = None;
            app.sync_from_core();
            None
        }
        ActionOutcome::SendFailed { content, message } => {
            // hand the text back unless the user already typed something new
            if app.composer.is_empty() {
                app.composer.set(&content);
            }
            app.outgoing = None;
            app.sync_from_core();
            app.notify(Notification::error(message));
            None
        }
        ActionOutcome::Succeeded { notice } => {
            app.sync_from_core();
            if let Some(notice) = notice {
                app.notify(Notification::success(notice));
            }
            None
        }
        ActionOutcome::Failed {
            message,
            is_validation,
        } => {
            app.sync_from_core();
            app.notify(if is_validation {
                Notification::warning(message)
            } else {
                Notification::error(message)
            });
            None
        }
    }
}
