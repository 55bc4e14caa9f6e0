use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::format::truncate_with_ellipsis;
use crate::ui::{theme, App, ConversationRow, Focus};

const GROUP_MARKER: &str = "◆ ";

fn row_item(row: &ConversationRow, width: usize) -> ListItem<'static> {
    let marker = if row.is_group { GROUP_MARKER } else { "" };
    let time_width = row.time_label.width();
    let title_room = width.saturating_sub(time_width + marker.width() + 1);
    let title = truncate_with_ellipsis(&row.title, title_room);
    let gap = width.saturating_sub(marker.width() + title.width() + time_width);

    let first = Line::from(vec![
        Span::styled(marker.to_string(), Style::default().fg(theme::ACCENT_PRIMARY)),
        Span::styled(title, theme::title()),
        Span::raw(" ".repeat(gap)),
        Span::styled(row.time_label.clone(), theme::text_muted()),
    ]);
    let second = Line::from(Span::styled(
        truncate_with_ellipsis(&row.preview, width),
        theme::text_muted(),
    ));
    ListItem::new(vec![first, second])
}

pub fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Sidebar && !app.modal_state.is_open();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border(focused))
        .title(Span::styled(" Chats ", theme::title()))
        .style(Style::default().bg(theme::BG_SIDEBAR));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(inner);

    if app.rows.is_empty() {
        let lines = if app.list_loading {
            vec![Line::from(Span::styled("Loading conversations...", theme::text_muted()))]
        } else {
            vec![
                Line::from(Span::styled("No conversations yet", theme::text_muted())),
                Line::from(""),
                Line::from(Span::styled("n  new chat", theme::text_dim())),
                Line::from(Span::styled("g  new group", theme::text_dim())),
            ]
        };
        f.render_widget(Paragraph::new(lines), chunks[0]);
    } else {
        let width = chunks[0].width.saturating_sub(1) as usize;
        let items: Vec<ListItem> = app.rows.iter().map(|row| row_item(row, width)).collect();
        let list = List::new(items).highlight_style(theme::selected());
        let mut state = ListState::default().with_selected(Some(app.selected));
        f.render_stateful_widget(list, chunks[0], &mut state);
    }

    let footer = match &app.list_error {
        Some(err) => Span::styled(truncate_with_ellipsis(err, chunks[1].width as usize), theme::error()),
        None => Span::styled("? help", theme::text_dim()),
    };
    f.render_widget(Paragraph::new(Line::from(footer)), chunks[1]);
}
