//! Keyboard handling. Handlers mutate [`App`] and may return an [`Action`]
//! for the event loop to dispatch.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use relaygram_core::models::address;
use relaygram_core::store::validate_message;

use crate::actions::Action;
use crate::ui::modal::{
    AttachState, GroupField, GroupInfoMode, GroupInfoState, MemberDraft, ModalState,
    NewDirectState, NewGroupState, RenameDisplayState,
};
use crate::ui::notifications::Notification;
use crate::ui::text_input::TextInput;
use crate::ui::{App, Focus, View};

/// Shared editing keys. Returns true when the key was consumed.
fn edit_text(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            input.insert_char(c);
        }
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        _ => return false,
    }
    true
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        if app.pending_quit {
            app.quit();
        } else {
            app.pending_quit = true;
            app.notify(Notification::warning("Press Ctrl+C again to quit"));
        }
        return None;
    }
    app.pending_quit = false;

    if app.modal_state.is_open() {
        return handle_modal_key(app, key);
    }
    match app.view {
        View::Connect => handle_connect_key(app, key),
        View::Home => match app.focus {
            Focus::Sidebar => handle_sidebar_key(app, key),
            Focus::Composer => handle_composer_key(app, key),
        },
    }
}

/// Bracketed paste goes to whichever field has focus.
pub fn handle_paste(app: &mut App, text: &str) {
    let accepted = match &mut app.modal_state {
        ModalState::NewDirect(state) => state.address.insert_str(text.trim()),
        ModalState::NewGroup(state) => match state.focus {
            GroupField::Name => state.name.insert_str(text),
            GroupField::Description => state.description.insert_str(text),
            GroupField::Member => state.member.insert_str(text.trim()),
        },
        ModalState::GroupInfo(state) => match &mut state.mode {
            GroupInfoMode::Rename(input)
            | GroupInfoMode::EditDescription(input)
            | GroupInfoMode::AddMembers(MemberDraft { input, .. }) => input.insert_str(text.trim()),
            _ => true,
        },
        ModalState::RenameDisplay(state) => state.focused_input().insert_str(text.trim()),
        ModalState::Attach(state) => state.focused_input().insert_str(text.trim()),
        ModalState::Help => true,
        ModalState::None => match (app.view, app.focus) {
            (View::Connect, _) => app.address_input.insert_str(text.trim()),
            (View::Home, Focus::Composer) => app.composer.insert_str(text),
            _ => true,
        },
    };
    if !accepted {
        app.notify(Notification::warning("Pasted text is too long"));
    }
}

fn handle_connect_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    if app.connecting {
        return None;
    }
    match key.code {
        KeyCode::Esc => {
            app.quit();
            None
        }
        KeyCode::Enter => {
            let entered = app.address_input.as_str().trim().to_string();
            if !address::is_valid_address(&entered) {
                app.notify(Notification::warning("Enter a valid 0x wallet address"));
                return None;
            }
            app.connecting = true;
            Some(Action::Connect { address: entered })
        }
        _ => {
            edit_text(&mut app.address_input, key);
            None
        }
    }
}

fn open_group_info(app: &mut App) {
    match &app.chat {
        Some(chat) if chat.is_group() => {
            let members = chat
                .conversation
                .as_ref()
                .map(|c| c.members.clone())
                .unwrap_or_default();
            app.modal_state =
                ModalState::GroupInfo(GroupInfoState::new(&chat.conversation_id, members));
        }
        Some(_) => app.notify(Notification::info("Not a group conversation")),
        None => {}
    }
}

fn open_rename_display(app: &mut App) {
    let Some(id) = app.selected_row().map(|r| r.id.clone()) else {
        return;
    };
    let current = app.core().and_then(|core| core.display_override(&id));
    let state = RenameDisplayState::new(
        &id,
        current.as_ref().and_then(|o| o.label.as_deref()),
        current.as_ref().and_then(|o| o.address.as_deref()),
    );
    app.modal_state = ModalState::RenameDisplay(state);
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Enter => {
            let id = app.selected_row()?.id.clone();
            app.focus = Focus::Composer;
            if app.active_conversation_id() != Some(id.as_str()) {
                return Some(Action::OpenConversation {
                    conversation_id: id,
                });
            }
        }
        KeyCode::Tab if app.chat.is_some() => app.focus = Focus::Composer,
        KeyCode::Char('n') => app.modal_state = ModalState::NewDirect(NewDirectState::default()),
        KeyCode::Char('g') => app.modal_state = ModalState::NewGroup(NewGroupState::default()),
        KeyCode::Char('i') => open_group_info(app),
        KeyCode::Char('e') => open_rename_display(app),
        KeyCode::Char('r') => return Some(Action::Refresh),
        KeyCode::Char('?') => app.modal_state = ModalState::Help,
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.dismiss_notification(),
        _ => {}
    }
    None
}

fn handle_composer_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc | KeyCode::Tab => app.focus = Focus::Sidebar,
        KeyCode::Char('a') if ctrl => {
            if app.chat.is_some() {
                app.modal_state = ModalState::Attach(AttachState::default());
            }
        }
        KeyCode::Char('g') if ctrl => open_group_info(app),
        KeyCode::PageUp => app.scroll_offset = app.scroll_offset.saturating_add(10),
        KeyCode::PageDown => app.scroll_offset = app.scroll_offset.saturating_sub(10),
        KeyCode::Enter => {
            app.chat.as_ref()?;
            if app.outgoing.is_some() {
                return None;
            }
            if let Err(err) = validate_message(app.composer.as_str()) {
                if !app.composer.as_str().trim().is_empty() {
                    app.notify(Notification::warning(err.to_string()));
                }
                return None;
            }
            let content = app.composer.take();
            app.outgoing = Some(content.clone());
            app.scroll_offset = 0;
            return Some(Action::SendMessage { content });
        }
        KeyCode::Char(c) if !ctrl => {
            if !app.composer.insert_char(c) {
                app.notify(Notification::warning("Message is at the length limit"));
            }
        }
        _ => {
            edit_text(&mut app.composer, key);
        }
    }
    None
}

fn handle_modal_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    if matches!(app.modal_state, ModalState::Help) {
        app.modal_state = ModalState::None;
        return None;
    }
    if key.code == KeyCode::Esc {
        if let ModalState::GroupInfo(info) = &mut app.modal_state {
            if info.mode != GroupInfoMode::Browse {
                info.mode = GroupInfoMode::Browse;
                return None;
            }
        }
        app.modal_state = ModalState::None;
        return None;
    }

    let own_inbox = app.own_inbox_id();
    let mut close = false;
    let action = match &mut app.modal_state {
        ModalState::NewDirect(state) => match key.code {
            KeyCode::Enter => {
                let entered = state.address.as_str().trim().to_string();
                if address::is_valid_address(&entered) {
                    close = true;
                    Some(Action::StartDirect { address: entered })
                } else {
                    state.error = Some(format!("Invalid Ethereum address: {entered}"));
                    None
                }
            }
            _ => {
                edit_text(&mut state.address, key);
                None
            }
        },
        ModalState::NewGroup(state) => new_group_key(state, key, &mut close),
        ModalState::GroupInfo(state) => group_info_key(state, key, own_inbox.as_deref()),
        ModalState::RenameDisplay(state) => match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                state.toggle_focus();
                None
            }
            KeyCode::Enter => {
                let addr = state.address.as_str().trim();
                if !addr.is_empty() && !address::is_valid_address(addr) {
                    state.error = Some(format!("Invalid Ethereum address: {addr}"));
                    None
                } else {
                    close = true;
                    Some(Action::SetDisplayOverride {
                        conversation_id: state.conversation_id.clone(),
                        label: state.label.as_str().to_string(),
                        address: addr.to_string(),
                    })
                }
            }
            _ => {
                edit_text(state.focused_input(), key);
                None
            }
        },
        ModalState::Attach(state) => match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                state.toggle_focus();
                None
            }
            KeyCode::Enter if !state.path.as_str().trim().is_empty() => {
                close = true;
                let caption = state.caption.as_str().trim();
                Some(Action::SendFile {
                    path: PathBuf::from(state.path.as_str().trim()),
                    caption: (!caption.is_empty()).then(|| caption.to_string()),
                })
            }
            _ => {
                edit_text(state.focused_input(), key);
                None
            }
        },
        ModalState::Help | ModalState::None => None,
    };
    if close {
        app.modal_state = ModalState::None;
    }
    action
}

fn new_group_key(state: &mut NewGroupState, key: KeyEvent, close: &mut bool) -> Option<Action> {
    match key.code {
        KeyCode::Tab => state.focus = state.focus.next(),
        KeyCode::Up if state.focus == GroupField::Member => {
            state.selected = state.selected.saturating_sub(1)
        }
        KeyCode::Down if state.focus == GroupField::Member => {
            state.selected = (state.selected + 1).min(state.pending.len().saturating_sub(1))
        }
        KeyCode::Delete if state.focus == GroupField::Member && state.member.is_empty() => {
            state.remove_selected()
        }
        KeyCode::Enter => match state.focus {
            GroupField::Member if !state.member.as_str().trim().is_empty() => state.add_pending(),
            _ => {
                if let Some((addresses, metadata)) = state.submission() {
                    *close = true;
                    return Some(Action::CreateGroup {
                        addresses,
                        metadata,
                    });
                }
            }
        },
        _ => {
            let input = match state.focus {
                GroupField::Name => &mut state.name,
                GroupField::Description => &mut state.description,
                GroupField::Member => &mut state.member,
            };
            edit_text(input, key);
        }
    }
    None
}

fn group_info_key(state: &mut GroupInfoState, key: KeyEvent, own_inbox: Option<&str>) -> Option<Action> {
    let conversation_id = state.conversation_id.clone();
    match &mut state.mode {
        GroupInfoMode::Browse => {
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => state.select_prev(),
                KeyCode::Down | KeyCode::Char('j') => state.select_next(),
                KeyCode::Char('r') => state.mode = GroupInfoMode::Rename(TextInput::new()),
                KeyCode::Char('d') => state.mode = GroupInfoMode::EditDescription(TextInput::new()),
                KeyCode::Char('a') => {
                    state.mode = GroupInfoMode::AddMembers(MemberDraft::for_group(state.members.len()))
                }
                KeyCode::Char('x') => {
                    if let Some(member) = state.selected_member() {
                        if Some(member) != own_inbox {
                            state.mode = GroupInfoMode::ConfirmRemove(member.to_string());
                        }
                    }
                }
                KeyCode::Char('l') => state.mode = GroupInfoMode::ConfirmLeave,
                _ => {}
            }
            None
        }
        GroupInfoMode::Rename(input) => {
            if key.code != KeyCode::Enter {
                edit_text(input, key);
                return None;
            }
            let name = input.take();
            state.mode = GroupInfoMode::Browse;
            Some(Action::RenameGroup {
                conversation_id,
                name,
            })
        }
        GroupInfoMode::EditDescription(input) => {
            if key.code != KeyCode::Enter {
                edit_text(input, key);
                return None;
            }
            let description = input.take();
            state.mode = GroupInfoMode::Browse;
            Some(Action::UpdateDescription {
                conversation_id,
                description,
            })
        }
        GroupInfoMode::AddMembers(draft) => {
            match key.code {
                // Enter queues the typed address; on an empty field it submits the queue
                KeyCode::Enter if !draft.input.as_str().trim().is_empty() => draft.add_pending(),
                KeyCode::Enter => {
                    let addresses = draft.submission()?;
                    state.mode = GroupInfoMode::Browse;
                    return Some(Action::AddMembers {
                        conversation_id,
                        addresses,
                    });
                }
                KeyCode::Delete if draft.input.is_empty() => draft.remove_last(),
                _ => {
                    edit_text(&mut draft.input, key);
                }
            }
            None
        }
        GroupInfoMode::ConfirmRemove(inbox_id) => {
            let inbox_id = inbox_id.clone();
            state.mode = GroupInfoMode::Browse;
            matches!(key.code, KeyCode::Char('y') | KeyCode::Enter).then_some(Action::RemoveMember {
                conversation_id,
                inbox_id,
            })
        }
        GroupInfoMode::ConfirmLeave => {
            state.mode = GroupInfoMode::Browse;
            matches!(key.code, KeyCode::Char('y') | KeyCode::Enter)
                .then_some(Action::LeaveGroup { conversation_id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{ChatSnapshot, ConversationRow};
    use relaygram_core::models::{Conversation, ConversationKind, GroupMetadata};
    use relaygram_core::store::SendState;

    const ADDR: &str = "0x1000000000000000000000000000000000000001";

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            handle_key(app, key(KeyCode::Char(c)));
        }
    }

    fn home_with_group() -> App {
        let mut app = App::new(None);
        app.view = View::Home;
        app.rows = vec![ConversationRow {
            id: "g1".into(),
            title: "Group Chat".into(),
            time_label: String::new(),
            preview: String::new(),
            is_group: true,
        }];
        app.chat = Some(ChatSnapshot {
            conversation_id: "g1".into(),
            conversation: Some(Conversation {
                id: "g1".into(),
                kind: ConversationKind::Group(GroupMetadata::default()),
                members: vec!["me".into(), "peer".into(), "other".into()],
                created_at_ns: None,
                last_message_at_ns: None,
                last_message_preview: None,
            }),
            title: "Group Chat".into(),
            messages: vec![],
            own_inbox_id: "me".into(),
            send_state: SendState::Idle,
            is_loading: false,
            last_error: None,
        });
        app
    }

    #[test]
    fn ctrl_c_twice_quits() {
        let mut app = App::new(None);
        handle_key(&mut app, ctrl('c'));
        assert!(app.running);
        handle_key(&mut app, ctrl('c'));
        assert!(!app.running);
    }

    #[test]
    fn connect_requires_valid_address() {
        let mut app = App::new(None);
        type_str(&mut app, "0x12");
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
        assert!(!app.connecting);

        app.address_input.set(ADDR);
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::Connect {
                address: ADDR.into()
            })
        );
        assert!(app.connecting);
        // ignored while connecting
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
    }

    #[test]
    fn enter_on_sidebar_opens_selected() {
        let mut app = home_with_group();
        app.chat = None;
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::OpenConversation {
                conversation_id: "g1".into()
            })
        );
        assert_eq!(app.focus, Focus::Composer);
    }

    #[test]
    fn composer_sends_and_blocks_empty() {
        let mut app = home_with_group();
        app.focus = Focus::Composer;

        type_str(&mut app, "   ");
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);

        app.composer.clear();
        type_str(&mut app, "hi there");
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::SendMessage {
                content: "hi there".into()
            })
        );
        assert!(app.composer.is_empty());
        assert_eq!(app.outgoing.as_deref(), Some("hi there"));

        // a second send waits for the first
        type_str(&mut app, "again");
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
    }

    #[test]
    fn composer_refuses_input_past_limit() {
        let mut app = home_with_group();
        app.focus = Focus::Composer;
        app.composer.set(&"x".repeat(4000));
        handle_key(&mut app, key(KeyCode::Char('y')));
        assert_eq!(app.composer.char_count(), 4000);
        assert!(app.current_notification().is_some());
    }

    #[test]
    fn new_group_flow() {
        let mut app = home_with_group();
        handle_key(&mut app, key(KeyCode::Char('g')));
        assert!(matches!(app.modal_state, ModalState::NewGroup(_)));

        let a = "0x000000000000000000000000000000000000000a";
        let b = "0x000000000000000000000000000000000000000b";
        type_str(&mut app, a);
        handle_key(&mut app, key(KeyCode::Enter));
        // one member is not enough yet
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
        type_str(&mut app, b);
        handle_key(&mut app, key(KeyCode::Enter));

        handle_key(&mut app, key(KeyCode::Tab));
        type_str(&mut app, "Crew");
        let action = handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::CreateGroup {
                addresses: vec![a.into(), b.into()],
                metadata: GroupMetadata {
                    name: Some("Crew".into()),
                    description: None,
                },
            })
        );
        assert!(!app.modal_state.is_open());
    }

    #[test]
    fn group_info_remove_and_leave() {
        let mut app = home_with_group();
        handle_key(&mut app, key(KeyCode::Char('i')));
        assert!(matches!(app.modal_state, ModalState::GroupInfo(_)));

        handle_key(&mut app, key(KeyCode::Down));
        handle_key(&mut app, key(KeyCode::Char('x')));
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Char('y'))),
            Some(Action::RemoveMember {
                conversation_id: "g1".into(),
                inbox_id: "peer".into(),
            })
        );

        handle_key(&mut app, key(KeyCode::Char('l')));
        assert_eq!(handle_key(&mut app, key(KeyCode::Char('n'))), None);
        handle_key(&mut app, key(KeyCode::Char('l')));
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::LeaveGroup {
                conversation_id: "g1".into()
            })
        );
    }

    #[test]
    fn group_info_rename_then_escape_steps_back() {
        let mut app = home_with_group();
        handle_key(&mut app, key(KeyCode::Char('i')));
        handle_key(&mut app, key(KeyCode::Char('r')));
        type_str(&mut app, "New name");
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::RenameGroup {
                conversation_id: "g1".into(),
                name: "New name".into(),
            })
        );

        handle_key(&mut app, key(KeyCode::Char('d')));
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(matches!(
            &app.modal_state,
            ModalState::GroupInfo(info) if info.mode == GroupInfoMode::Browse
        ));
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(!app.modal_state.is_open());
    }

    #[test]
    fn group_info_adds_members_in_one_request() {
        let a = "0x3000000000000000000000000000000000000003";
        let b = "0x4000000000000000000000000000000000000004";
        let mut app = home_with_group();
        handle_key(&mut app, key(KeyCode::Char('i')));
        handle_key(&mut app, key(KeyCode::Char('a')));

        // nothing queued yet
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
        type_str(&mut app, a);
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
        type_str(&mut app, b);
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);

        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::AddMembers {
                conversation_id: "g1".into(),
                addresses: vec![a.into(), b.into()],
            })
        );
        assert!(matches!(
            &app.modal_state,
            ModalState::GroupInfo(info) if info.mode == GroupInfoMode::Browse
        ));
    }

    #[test]
    fn attach_builds_send_file() {
        let mut app = home_with_group();
        app.focus = Focus::Composer;
        handle_key(&mut app, ctrl('a'));
        type_str(&mut app, "/tmp/photo.png");
        handle_key(&mut app, key(KeyCode::Tab));
        type_str(&mut app, "look");
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Action::SendFile {
                path: PathBuf::from("/tmp/photo.png"),
                caption: Some("look".into()),
            })
        );
    }

    #[test]
    fn paste_into_composer_respects_limit() {
        let mut app = home_with_group();
        app.focus = Focus::Composer;
        handle_paste(&mut app, "line one\nline two");
        assert_eq!(app.composer.as_str(), "line one line two");

        handle_paste(&mut app, &"z".repeat(4000));
        assert_eq!(app.composer.as_str(), "line one line two");
    }

    #[test]
    fn new_direct_rejects_bad_address_inline() {
        let mut app = home_with_group();
        handle_key(&mut app, key(KeyCode::Char('n')));
        type_str(&mut app, "0xnope");
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
        assert!(matches!(
            &app.modal_state,
            ModalState::NewDirect(state) if state.error.is_some()
        ));
    }
}
