use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use relaygram_core::constants::{MAX_MESSAGE_LENGTH, MESSAGE_COUNTER_THRESHOLD};
use relaygram_core::models::{address, ns_to_ms, MessageContent};
use relaygram_core::store::SendState;

use crate::ui::format;
use crate::ui::views::input_window;
use crate::ui::{theme, App, ChatSnapshot, Focus};

/// Initials plus a space
const AVATAR_WIDTH: usize = 3;

/// Greedy word wrap by display width. Words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;
        for word in raw.split(' ') {
            let word_width = word.width();
            let sep = usize::from(!current.is_empty());
            if current_width + sep + word_width <= width {
                if sep == 1 {
                    current.push(' ');
                }
                current.push_str(word);
                current_width += sep + word_width;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if current_width + ch_width > width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(ch);
                current_width += ch_width;
            }
        }
        lines.push(current);
    }
    lines
}

fn message_body(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::File(file) => {
            let head = format!("[file] {} ({})", file.name, format::file_size(file.size));
            match &file.caption {
                Some(caption) => format!("{head}\n{caption}"),
                None => head,
            }
        }
    }
}

fn date_separator(label: &str, width: usize) -> Line<'static> {
    let text = format!(" {label} ");
    let side = width.saturating_sub(text.width()) / 2;
    Line::from(vec![
        Span::styled("─".repeat(side), theme::text_dim()),
        Span::styled(text, theme::text_muted()),
        Span::styled("─".repeat(side), theme::text_dim()),
    ])
    .alignment(Alignment::Center)
}

/// Pre-wrapped lines for the message list.
///
/// A date separator precedes the first message of each day. Peer messages
/// carry the sender's initials on the last message of a consecutive run.
pub fn message_lines(chat: &ChatSnapshot, width: u16, now: DateTime<Local>) -> Vec<Line<'static>> {
    let width = width as usize;
    let bubble_max = (width * 3 / 4).clamp(8, width.saturating_sub(AVATAR_WIDTH).max(8));
    let mut lines = Vec::new();
    let mut last_day = None;

    for (i, message) in chat.messages.iter().enumerate() {
        let ms = ns_to_ms(message.sent_at_ns);
        let day = format::message_day(ms);
        if day != last_day {
            lines.push(date_separator(&format::message_date(ms, now), width));
            last_day = day;
        }

        let own = message.is_from(&chat.own_inbox_id);
        let last_of_run = chat
            .messages
            .get(i + 1)
            .map_or(true, |next| next.sender_inbox_id != message.sender_inbox_id);
        let time = format::message_time(ms);

        // one column of padding on each side of the text
        let wrapped = wrap_text(&message_body(&message.content), bubble_max - 2);
        let inner_width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);
        let bubble_style = Style::default()
            .bg(if own {
                theme::BG_BUBBLE_OWN
            } else {
                theme::BG_BUBBLE_PEER
            })
            .fg(theme::TEXT_PRIMARY);
        let count = wrapped.len();

        for (n, text) in wrapped.into_iter().enumerate() {
            let is_last = n + 1 == count;
            let pad = inner_width - text.width();
            let bubble = Span::styled(format!(" {}{} ", text, " ".repeat(pad)), bubble_style);
            let stamp = if is_last {
                Span::styled(format!(" {time} "), theme::text_dim())
            } else {
                Span::raw(" ".repeat(time.width() + 2))
            };

            let line = if own {
                Line::from(vec![stamp, bubble]).alignment(Alignment::Right)
            } else {
                let avatar = if is_last && last_of_run {
                    Span::styled(
                        format!("{:<2} ", address::id_initials(&message.sender_inbox_id)),
                        Style::default()
                            .fg(theme::avatar_color(&message.sender_inbox_id))
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(" ".repeat(AVATAR_WIDTH))
                };
                Line::from(vec![avatar, bubble, stamp])
            };
            lines.push(line);
        }
    }
    lines
}

fn render_header(f: &mut Frame, chat: &ChatSnapshot, area: Rect) {
    let mut status = vec![Span::styled(chat.status_line(), theme::text_muted())];
    if chat.is_loading {
        status.push(Span::styled("  loading...", theme::text_dim()));
    }
    if let Some(err) = &chat.last_error {
        status.push(Span::styled(format!("  {err}"), theme::error()));
    }
    let lines = vec![
        Line::from(Span::styled(chat.title.clone(), theme::title())),
        Line::from(status),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn render_messages(f: &mut Frame, app: &App, chat: &ChatSnapshot, area: Rect) {
    if chat.messages.is_empty() {
        let hint = if chat.is_loading {
            "Loading messages..."
        } else {
            "No messages yet. Say hello!"
        };
        f.render_widget(
            Paragraph::new(hint)
                .style(theme::text_muted())
                .alignment(Alignment::Center),
            Rect {
                y: area.y + area.height / 2,
                height: 1.min(area.height),
                ..area
            },
        );
        return;
    }

    let lines = message_lines(chat, area.width, Local::now());
    let total = lines.len() as u16;
    let top = total
        .saturating_sub(area.height)
        .saturating_sub(app.scroll_offset);
    f.render_widget(Paragraph::new(lines).scroll((top, 0)), area);
}

fn render_composer(f: &mut Frame, app: &App, chat: &ChatSnapshot, area: Rect) {
    let focused = app.focus == Focus::Composer && !app.modal_state.is_open();
    let count = app.composer.char_count();

    let (label, label_style) = match &chat.send_state {
        SendState::Idle => (" Message ".to_string(), theme::text_muted()),
        SendState::Sending => (" Sending... ".to_string(), theme::warning()),
        SendState::Failed(err) => (format!(" {err} "), theme::error()),
    };
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border(focused))
        .title(Span::styled(label, label_style));
    if count > MESSAGE_COUNTER_THRESHOLD {
        let style = if count >= MAX_MESSAGE_LENGTH {
            theme::error()
        } else {
            theme::warning()
        };
        block = block.title_top(
            Line::from(Span::styled(format!(" {count}/{MAX_MESSAGE_LENGTH} "), style))
                .alignment(Alignment::Right),
        );
    }

    let inner = block.inner(area);
    let (visible, cursor_x) = input_window(&app.composer, inner.width);
    let body = if app.composer.is_empty() && !focused {
        Span::styled("Tab to write · Ctrl+A attach", theme::text_dim())
    } else {
        Span::styled(visible, theme::text_primary())
    };
    f.render_widget(
        Paragraph::new(Line::from(body))
            .block(block)
            .style(Style::default().bg(theme::BG_INPUT)),
        area,
    );
    if focused {
        f.set_cursor_position(Position::new(inner.x + cursor_x, inner.y));
    }
}

pub fn render_chat(f: &mut Frame, app: &App, area: Rect) {
    let Some(chat) = &app.chat else {
        f.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled("Select a conversation", theme::text_muted())),
                Line::from(Span::styled("Enter open · n new chat · g new group", theme::text_dim())),
            ])
            .alignment(Alignment::Center),
            Rect {
                y: area.y + area.height / 2,
                height: 2.min(area.height),
                ..area
            },
        );
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .split(area);
    let header = Rect {
        x: chunks[0].x + 1,
        width: chunks[0].width.saturating_sub(2),
        ..chunks[0]
    };
    render_header(f, chat, header);
    render_messages(f, app, chat, chunks[1]);
    render_composer(f, app, chat, chunks[2]);
}
