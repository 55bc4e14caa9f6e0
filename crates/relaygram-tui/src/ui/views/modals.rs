use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use relaygram_core::constants::{MAX_GROUP_MEMBERS, MIN_GROUP_MEMBERS};
use relaygram_core::models::address;

use crate::ui::components::{modal_area, render_modal_background, render_modal_header, ModalSize};
use crate::ui::modal::{
    AttachField, AttachState, DisplayField, GroupField, GroupInfoMode, GroupInfoState, MemberDraft,
    ModalState, NewDirectState, NewGroupState, RenameDisplayState,
};
use crate::ui::views::render_input;
use crate::ui::{theme, App};

fn error_line(error: Option<&str>) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        error.unwrap_or_default().to_string(),
        theme::error(),
    )))
    .wrap(Wrap { trim: true })
}

fn open_modal(f: &mut Frame, size: ModalSize, title: &str, hint: &str) -> Rect {
    let area = modal_area(f.area(), &size);
    render_modal_background(f, area);
    render_modal_header(f, area, title, hint)
}

fn render_new_direct(f: &mut Frame, state: &NewDirectState) {
    let body = open_modal(
        f,
        ModalSize {
            height: 9,
            ..ModalSize::default()
        },
        "New chat",
        "Enter start · Esc cancel",
    );
    let chunks = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(body);
    render_input(f, chunks[0], "Wallet address", &state.address, true);
    f.render_widget(error_line(state.error.as_deref()), chunks[1]);
}

fn render_new_group(f: &mut Frame, state: &NewGroupState) {
    let body = open_modal(
        f,
        ModalSize {
            height: 24,
            ..ModalSize::default()
        },
        "New group",
        "Tab field · Enter add/create · Esc",
    );
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(2),
    ])
    .split(body);

    render_input(f, chunks[0], "Name (optional)", &state.name, state.focus == GroupField::Name);
    render_input(
        f,
        chunks[1],
        "Description (optional)",
        &state.description,
        state.focus == GroupField::Description,
    );
    render_input(f, chunks[2], "Add member address", &state.member, state.focus == GroupField::Member);

    let count_style = if state.pending.is_ready() {
        theme::text_muted()
    } else {
        theme::warning()
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            format!(
                "{} members incl. you (min {}, max {}) · Del removes",
                state.pending.group_size(),
                MIN_GROUP_MEMBERS,
                MAX_GROUP_MEMBERS
            ),
            count_style,
        )),
        chunks[3],
    );

    let items: Vec<ListItem> = state
        .pending
        .as_slice()
        .iter()
        .map(|addr| ListItem::new(Span::styled(addr.clone(), theme::text_primary())))
        .collect();
    let mut list_state = ListState::default()
        .with_selected((!state.pending.is_empty()).then_some(state.selected));
    f.render_stateful_widget(
        List::new(items).highlight_style(theme::selected()),
        chunks[4],
        &mut list_state,
    );
    f.render_widget(error_line(state.error.as_deref()), chunks[5]);
}

fn render_group_info(f: &mut Frame, app: &App, state: &GroupInfoState) {
    let (title, description) = app
        .chat
        .as_ref()
        .filter(|chat| chat.conversation_id == state.conversation_id)
        .map(|chat| {
            let description = chat
                .conversation
                .as_ref()
                .and_then(|c| c.group_metadata())
                .and_then(|m| m.description.clone());
            (chat.title.clone(), description)
        })
        .unwrap_or_else(|| ("Group".to_string(), None));

    let hint = match &state.mode {
        GroupInfoMode::Browse => "r a d x l · Esc",
        GroupInfoMode::ConfirmRemove(_) | GroupInfoMode::ConfirmLeave => "y confirm · n cancel",
        _ => "Enter save · Esc back",
    };
    let body = open_modal(
        f,
        ModalSize {
            height: 22,
            ..ModalSize::default()
        },
        &title,
        hint,
    );
    let footer = match state.mode {
        GroupInfoMode::AddMembers(_) => 6,
        _ => 3,
    };
    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(footer),
    ])
    .split(body);

    f.render_widget(
        Paragraph::new(Span::styled(
            description.unwrap_or_else(|| "No description".to_string()),
            theme::text_muted(),
        ))
        .wrap(Wrap { trim: true }),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("{} members", state.members.len()),
            theme::text_dim(),
        )),
        chunks[1],
    );

    let own = app.own_inbox_id().unwrap_or_default();
    let items: Vec<ListItem> = state
        .members
        .iter()
        .map(|member| {
            let mut spans = vec![Span::styled(
                address::abbreviate_inbox_id(member),
                theme::text_primary(),
            )];
            if *member == own {
                spans.push(Span::styled("  (you)", theme::text_dim()));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(
        List::new(items).highlight_style(theme::selected()),
        chunks[2],
        &mut list_state,
    );

    match &state.mode {
        GroupInfoMode::Browse => {
            let help = "r rename · d description · a add · x remove · l leave";
            f.render_widget(
                Paragraph::new(Span::styled(help, theme::text_dim())).wrap(Wrap { trim: true }),
                chunks[3],
            );
        }
        GroupInfoMode::Rename(input) => render_input(f, chunks[3], "Group name", input, true),
        GroupInfoMode::EditDescription(input) => {
            render_input(f, chunks[3], "Description", input, true)
        }
        GroupInfoMode::AddMembers(draft) => render_member_draft(f, chunks[3], draft),
        GroupInfoMode::ConfirmRemove(inbox_id) => {
            f.render_widget(
                Paragraph::new(Span::styled(
                    format!("Remove {} from the group?", address::abbreviate_inbox_id(inbox_id)),
                    theme::warning(),
                )),
                chunks[3],
            );
        }
        GroupInfoMode::ConfirmLeave => {
            f.render_widget(
                Paragraph::new(Span::styled("Leave this group?", theme::warning())),
                chunks[3],
            );
        }
    }
}

fn render_member_draft(f: &mut Frame, area: Rect, draft: &MemberDraft) {
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .split(area);
    render_input(f, rows[0], "Member address", &draft.input, true);

    let queued = draft
        .pending
        .as_slice()
        .iter()
        .map(|addr| address::abbreviate_address(addr))
        .collect::<Vec<_>>()
        .join(", ");
    let summary = if draft.pending.is_empty() {
        "Enter queues an address".to_string()
    } else {
        format!(
            "{} queued, group of {} · Enter on empty submits",
            draft.pending.len(),
            draft.pending.group_size()
        )
    };
    f.render_widget(
        Paragraph::new(Span::styled(summary, theme::text_dim())),
        rows[1],
    );
    f.render_widget(
        Paragraph::new(Span::styled(queued, theme::text_primary())),
        rows[2],
    );
    f.render_widget(error_line(draft.error.as_deref()), rows[3]);
}

fn render_rename_display(f: &mut Frame, state: &RenameDisplayState) {
    let body = open_modal(
        f,
        ModalSize {
            height: 13,
            ..ModalSize::default()
        },
        "Display name",
        "Tab field · Enter save · Esc",
    );
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(body);
    render_input(f, chunks[0], "Label", &state.label, state.focus == DisplayField::Label);
    render_input(
        f,
        chunks[1],
        "Wallet address",
        &state.address,
        state.focus == DisplayField::Address,
    );
    f.render_widget(
        Paragraph::new(Span::styled("Leave both blank to reset", theme::text_dim())),
        chunks[2],
    );
    f.render_widget(error_line(state.error.as_deref()), chunks[3]);
}

fn render_attach(f: &mut Frame, state: &AttachState) {
    let body = open_modal(
        f,
        ModalSize {
            height: 12,
            ..ModalSize::default()
        },
        "Attach file",
        "Tab field · Enter send · Esc",
    );
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .split(body);
    render_input(f, chunks[0], "Path", &state.path, state.focus == AttachField::Path);
    render_input(
        f,
        chunks[1],
        "Caption (optional)",
        &state.caption,
        state.focus == AttachField::Caption,
    );
    f.render_widget(
        Paragraph::new(Span::styled(
            "Images up to 5 MB · PDF and text up to 10 MB",
            theme::text_dim(),
        )),
        chunks[2],
    );
}

const HELP: &[(&str, &str)] = &[
    ("↑/↓ j/k", "move in the chat list"),
    ("Enter", "open chat / send message"),
    ("Tab", "switch list and composer"),
    ("n", "new direct chat"),
    ("g", "new group"),
    ("i / Ctrl+G", "group info"),
    ("e", "edit display name"),
    ("Ctrl+A", "attach file"),
    ("PgUp/PgDn", "scroll messages"),
    ("r", "refresh"),
    ("Ctrl+C twice", "quit"),
];

fn render_help(f: &mut Frame) {
    let body = open_modal(
        f,
        ModalSize {
            max_width: 52,
            height: HELP.len() as u16 + 4,
        },
        "Keys",
        "any key closes",
    );
    let lines: Vec<Line> = HELP
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<14}"), Style::default().fg(theme::ACCENT_PRIMARY)),
                Span::styled(*what, theme::text_muted()),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), body);
}

pub fn render_modal(f: &mut Frame, app: &App) {
    match &app.modal_state {
        ModalState::None => {}
        ModalState::NewDirect(state) => render_new_direct(f, state),
        ModalState::NewGroup(state) => render_new_group(f, state),
        ModalState::GroupInfo(state) => render_group_info(f, app, state),
        ModalState::RenameDisplay(state) => render_rename_display(f, state),
        ModalState::Attach(state) => render_attach(f, state),
        ModalState::Help => render_help(f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::views::buffer_text;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| render_modal(f, app)).unwrap();
        buffer_text(&terminal)
    }

    #[test]
    fn new_direct_shows_error() {
        let mut app = App::new(None);
        app.modal_state = ModalState::NewDirect(NewDirectState {
            error: Some("Invalid Ethereum address: 0x12".into()),
            ..NewDirectState::default()
        });
        let text = draw(&app);
        assert!(text.contains("New chat"));
        assert!(text.contains("Invalid Ethereum address"));
    }

    #[test]
    fn new_group_lists_pending_members() {
        let mut app = App::new(None);
        let mut state = NewGroupState::default();
        state.member.set("0x1111111111111111111111111111111111111111");
        state.add_pending();
        app.modal_state = ModalState::NewGroup(state);

        let text = draw(&app);
        assert!(text.contains("2 members incl. you (min 2, max 250)"));
        assert!(text.contains("0x1111111111111111111111111111111111111111"));
    }

    #[test]
    fn group_info_shows_members_and_confirm() {
        let mut app = App::new(None);
        let mut state = GroupInfoState::new(
            "g1",
            vec!["aaaaaaaa0000000000000000bbbbbb".into(), "cc".into()],
        );
        state.mode = GroupInfoMode::ConfirmLeave;
        app.modal_state = ModalState::GroupInfo(state);

        let text = draw(&app);
        assert!(text.contains("aaaaaaaa...bbbbbb"));
        assert!(text.contains("2 members"));
        assert!(text.contains("Leave this group?"));
    }

    #[test]
    fn group_info_lists_queued_additions() {
        let mut app = App::new(None);
        let mut state = GroupInfoState::new("g1", vec!["aa".into(), "bb".into(), "cc".into()]);
        let mut draft = MemberDraft::for_group(state.members.len());
        draft.input.set("0x1111111111111111111111111111111111111111");
        draft.add_pending();
        state.mode = GroupInfoMode::AddMembers(draft);
        app.modal_state = ModalState::GroupInfo(state);

        let text = draw(&app);
        assert!(text.contains("1 queued, group of 4"));
        assert!(text.contains("0x1111...1111"));
    }

    #[test]
    fn help_lists_keys() {
        let mut app = App::new(None);
        app.modal_state = ModalState::Help;
        assert!(draw(&app).contains("new direct chat"));
    }
}
