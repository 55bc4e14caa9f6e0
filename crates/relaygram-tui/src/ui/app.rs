use std::sync::Arc;

use chrono::{DateTime, Local};

use relaygram_core::constants::MAX_MESSAGE_LENGTH;
use relaygram_core::models::{address, Conversation, Message};
use relaygram_core::runtime::CoreRuntime;
use relaygram_core::store::{IndexedConversation, SendState};
use relaygram_core::CoreEvent;

use crate::ui::format;
use crate::ui::modal::ModalState;
use crate::ui::notifications::{Notification, NotificationQueue};
use crate::ui::text_input::TextInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Connect,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Composer,
}

/// One line of the conversation list, already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub id: String,
    pub title: String,
    pub time_label: String,
    pub preview: String,
    pub is_group: bool,
}

impl ConversationRow {
    pub fn build(entry: &IndexedConversation, title: String, now: DateTime<Local>) -> Self {
        let conversation = &entry.conversation;
        let time_label = if entry.recency_ms > 0 {
            format::conversation_time(entry.recency_ms, now)
        } else {
            String::new()
        };
        Self {
            id: conversation.id.clone(),
            title,
            time_label,
            preview: conversation
                .last_message_preview
                .as_deref()
                .map(format::preview_text)
                .unwrap_or_default(),
            is_group: conversation.is_group(),
        }
    }
}

/// Copy of the open conversation taken from the core on each sync.
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    pub conversation_id: String,
    /// None until the conversation shows up in the index
    pub conversation: Option<Conversation>,
    pub title: String,
    pub messages: Vec<Message>,
    pub own_inbox_id: String,
    pub send_state: SendState,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl ChatSnapshot {
    /// "Group · N members" or "Direct"
    pub fn status_line(&self) -> String {
        match &self.conversation {
            Some(c) if c.is_group() => format!("Group · {} members", c.member_count()),
            Some(_) => "Direct".to_string(),
            None => String::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.conversation.as_ref().is_some_and(Conversation::is_group)
    }
}

pub struct App {
    pub running: bool,
    pub pending_quit: bool,
    pub view: View,
    pub focus: Focus,
    pub modal_state: ModalState,

    pub address_input: TextInput,
    pub connecting: bool,
    pub composer: TextInput,
    /// Text of the send in flight, restored if it fails
    pub outgoing: Option<String>,

    pub rows: Vec<ConversationRow>,
    pub selected: usize,
    pub list_loading: bool,
    pub list_error: Option<String>,

    pub chat: Option<ChatSnapshot>,
    /// Lines scrolled up from the bottom of the message list
    pub scroll_offset: u16,

    notifications: NotificationQueue,
    core: Option<Arc<CoreRuntime>>,
}

impl App {
    pub fn new(address: Option<&str>) -> Self {
        Self {
            running: true,
            pending_quit: false,
            view: View::Connect,
            focus: Focus::Sidebar,
            modal_state: ModalState::None,
            address_input: TextInput::with_text(address.unwrap_or_default()),
            connecting: false,
            composer: TextInput::with_limit(MAX_MESSAGE_LENGTH),
            outgoing: None,
            rows: Vec::new(),
            selected: 0,
            list_loading: false,
            list_error: None,
            chat: None,
            scroll_offset: 0,
            notifications: NotificationQueue::new(),
            core: None,
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    // ===== Core =====

    pub fn core(&self) -> Option<&Arc<CoreRuntime>> {
        self.core.as_ref()
    }

    pub fn attach_core(&mut self, core: Arc<CoreRuntime>) {
        let address = core.session().address.clone();
        self.core = Some(core);
        self.connecting = false;
        self.view = View::Home;
        self.focus = Focus::Sidebar;
        self.sync_from_core();
        self.notify(Notification::success(format!(
            "Connected as {}",
            address::abbreviate_address(&address)
        )));
    }

    pub fn take_core(&mut self) -> Option<Arc<CoreRuntime>> {
        self.core.take()
    }

    pub fn connected_address(&self) -> Option<String> {
        self.core.as_ref().map(|c| c.session().address.clone())
    }

    pub fn own_inbox_id(&self) -> Option<String> {
        self.core.as_ref().map(|c| c.session().inbox_id.clone())
    }

    pub fn on_core_event(&mut self, event: &CoreEvent) {
        if let CoreEvent::SessionClosed { address } = event {
            self.notify(Notification::warning(format!(
                "Session closed for {}",
                address::abbreviate_address(address)
            )));
        }
        self.sync_from_core();
    }

    /// Re-read list and open conversation from the core stores.
    pub fn sync_from_core(&mut self) {
        let Some(core) = self.core.clone() else {
            return;
        };
        let now = Local::now();
        let selected_id = self.selected_row().map(|r| r.id.clone());

        let index = core.index();
        self.rows = core
            .conversations()
            .iter()
            .map(|entry| ConversationRow::build(entry, core.title_for(&entry.conversation), now))
            .collect();
        self.list_loading = index.is_loading() && !index.is_loaded();
        self.list_error = index.last_error();
        self.reselect(selected_id.as_deref());

        self.chat = core.active_detail().map(|detail| {
            let conversation = core.conversation(detail.conversation_id());
            let title = conversation
                .as_ref()
                .map(|c| core.title_for(c))
                .unwrap_or_else(|| "Conversation".to_string());
            ChatSnapshot {
                conversation_id: detail.conversation_id().to_string(),
                conversation,
                title,
                messages: detail.messages(),
                own_inbox_id: detail.own_inbox_id().to_string(),
                send_state: detail.send_state(),
                is_loading: detail.is_loading(),
                last_error: detail.last_error(),
            }
        });

        if let ModalState::GroupInfo(info) = &mut self.modal_state {
            if let Some(conversation) = core.conversation(&info.conversation_id) {
                info.set_members(conversation.members.clone());
            }
        }
    }

    // ===== Conversation list =====

    pub fn selected_row(&self) -> Option<&ConversationRow> {
        self.rows.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + 1).min(self.rows.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep the cursor on the same conversation when the list reorders.
    fn reselect(&mut self, previous: Option<&str>) {
        if let Some(id) = previous {
            if let Some(pos) = self.rows.iter().position(|r| r.id == id) {
                self.selected = pos;
                return;
            }
        }
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.chat.as_ref().map(|c| c.conversation_id.as_str())
    }

    // ===== Notifications =====

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn current_notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    pub fn dismiss_notification(&mut self) {
        self.notifications.dismiss();
    }

    pub fn tick(&mut self) {
        self.notifications.tick();
    }
}
