pub mod chat;
pub mod connect;
pub mod modals;
pub mod sidebar;

use ratatui::{
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::text_input::TextInput;
use crate::ui::theme;

pub use chat::render_chat;
pub use connect::render_connect;
pub use modals::render_modal;
pub use sidebar::render_sidebar;

/// Slice of the input that fits `width` columns, keeping the cursor visible.
/// Returns the visible text and the cursor column within it.
pub fn input_window(input: &TextInput, width: u16) -> (String, u16) {
    let width = width as usize;
    if width == 0 {
        return (String::new(), 0);
    }
    let cursor = input.cursor();
    let start = cursor.saturating_sub(width - 1);
    let visible: String = input.as_str().chars().skip(start).take(width).collect();
    (visible, (cursor - start) as u16)
}

/// Bordered single-line field. Places the terminal cursor when focused.
pub fn render_input(f: &mut Frame, area: Rect, label: &str, input: &TextInput, focused: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border(focused))
        .title(Span::styled(format!(" {label} "), theme::text_muted()));
    let inner = block.inner(area);
    let (visible, cursor_x) = input_window(input, inner.width);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(visible, theme::text_primary())))
            .block(block)
            .style(Style::default().bg(theme::BG_INPUT)),
        area,
    );
    if focused {
        f.set_cursor_position(Position::new(inner.x + cursor_x, inner.y));
    }
}

/// All cells of a test terminal, row by row.
#[cfg(test)]
pub(crate) fn buffer_text(terminal: &ratatui::Terminal<ratatui::backend::TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_follows_cursor() {
        let input = TextInput::with_text("abcdefghij");
        let (visible, x) = input_window(&input, 5);
        assert_eq!(visible, "ghij");
        assert_eq!(x, 4);

        let mut input = input;
        input.move_home();
        let (visible, x) = input_window(&input, 5);
        assert_eq!(visible, "abcde");
        assert_eq!(x, 0);
    }
}
