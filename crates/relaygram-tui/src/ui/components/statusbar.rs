// Bottom status bar: current notification on the left, connected wallet on the right

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use relaygram_core::models::address;

use crate::ui::format::truncate_with_ellipsis;
use crate::ui::notifications::{Notification, NotificationLevel};
use crate::ui::theme;

fn level_color(level: NotificationLevel) -> ratatui::style::Color {
    match level {
        NotificationLevel::Info => theme::ACCENT_PRIMARY,
        NotificationLevel::Success => theme::ACCENT_SUCCESS,
        NotificationLevel::Warning => theme::ACCENT_WARNING,
        NotificationLevel::Error => theme::ACCENT_ERROR,
    }
}

fn wallet_label(connected_address: Option<&str>) -> String {
    match connected_address {
        Some(addr) => format!("● {} ", address::abbreviate_address(addr)),
        None => "○ not connected ".to_string(),
    }
}

pub fn render_statusbar(
    f: &mut Frame,
    area: Rect,
    notification: Option<&Notification>,
    connected_address: Option<&str>,
) {
    let wallet = wallet_label(connected_address);
    let wallet_width = (wallet.width() + 1) as u16;

    let chunks = Layout::horizontal([Constraint::Min(0), Constraint::Length(wallet_width)])
        .split(area);

    if let Some(notification) = notification {
        let color = level_color(notification.level);
        // icon + two spaces
        let room = (chunks[0].width as usize).saturating_sub(4);
        let line = Line::from(vec![
            Span::styled(format!(" {} ", notification.level.icon()), Style::default().fg(color)),
            Span::styled(
                truncate_with_ellipsis(&notification.message, room),
                Style::default().fg(color),
            ),
        ]);
        f.render_widget(
            Paragraph::new(line).style(Style::default().bg(theme::BG_APP)),
            chunks[0],
        );
    }

    let wallet_color = if connected_address.is_some() {
        theme::ACCENT_SUCCESS
    } else {
        theme::TEXT_MUTED
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(wallet, Style::default().fg(wallet_color))))
            .alignment(ratatui::layout::Alignment::Right)
            .style(Style::default().bg(theme::BG_APP)),
        chunks[1],
    );
}
