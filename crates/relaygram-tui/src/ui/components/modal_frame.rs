use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::ui::theme;

pub struct ModalSize {
    /// Capped by terminal width - 4
    pub max_width: u16,
    pub height: u16,
}

impl Default for ModalSize {
    fn default() -> Self {
        Self {
            max_width: 64,
            height: 14,
        }
    }
}

/// Centered area for a modal, clipped to the terminal.
pub fn modal_area(terminal_area: Rect, size: &ModalSize) -> Rect {
    let width = size.max_width.min(terminal_area.width.saturating_sub(4));
    let height = size.height.min(terminal_area.height.saturating_sub(2));
    let x = terminal_area.x + terminal_area.width.saturating_sub(width) / 2;
    let y = terminal_area.y + terminal_area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

pub fn render_modal_background(f: &mut Frame, area: Rect) {
    f.render_widget(Clear, area);
    let block = Block::default().style(Style::default().bg(theme::BG_MODAL));
    f.render_widget(block, area);
}

/// Title on the left, key hint on the right. Returns the area below the header.
pub fn render_modal_header(f: &mut Frame, area: Rect, title: &str, hint: &str) -> Rect {
    let chunks = Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).split(area);
    let header = Rect {
        x: chunks[0].x + 2,
        width: chunks[0].width.saturating_sub(4),
        ..chunks[0]
    };
    let parts = Layout::horizontal([Constraint::Min(0), Constraint::Length(hint.width() as u16)])
        .split(header);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(title.to_string(), theme::title()))),
        parts[0],
    );
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(hint.to_string(), theme::text_dim()))),
        parts[1],
    );
    Rect {
        x: chunks[1].x + 2,
        width: chunks[1].width.saturating_sub(4),
        ..chunks[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_area_is_centered_and_clipped() {
        let area = modal_area(Rect::new(0, 0, 100, 40), &ModalSize::default());
        assert_eq!(area, Rect::new(18, 13, 64, 14));

        let small = modal_area(Rect::new(0, 0, 30, 10), &ModalSize::default());
        assert_eq!(small.width, 26);
        assert_eq!(small.height, 8);
    }
}
