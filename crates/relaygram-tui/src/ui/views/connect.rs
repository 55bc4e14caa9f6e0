use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use relaygram_core::models::address;

use crate::ui::views::render_input;
use crate::ui::{theme, App};

pub fn render_connect(f: &mut Frame, app: &App, area: Rect) {
    let width = area.width.min(60);
    let column = Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    };
    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Fill(1),
    ])
    .split(column);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled("Relaygram", theme::title())))
            .alignment(Alignment::Center),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new("Enter your wallet address to connect")
            .style(theme::text_muted())
            .alignment(Alignment::Center),
        chunks[2],
    );

    render_input(f, chunks[3], "Wallet address", &app.address_input, !app.connecting);

    let entered = app.address_input.as_str().trim();
    let hint = if app.connecting {
        Span::styled("Connecting...", theme::warning())
    } else if !entered.is_empty() && !address::is_valid_address(entered) {
        Span::styled("Not a valid 0x address", theme::error())
    } else {
        Span::styled("Enter connect · Esc quit", theme::text_dim())
    };
    f.render_widget(
        Paragraph::new(Line::from(hint)).alignment(Alignment::Center),
        chunks[4],
    );
}
