use ratatui::{
    layout::{Constraint, Layout},
    style::Style,
    widgets::Block,
    Frame,
};

use crate::ui;
use crate::ui::components::render_statusbar;
use crate::ui::{App, View};

const SIDEBAR_WIDTH: u16 = 34;

pub(crate) fn render(f: &mut Frame, app: &App) {
    f.render_widget(
        Block::default().style(Style::default().bg(ui::theme::BG_APP)),
        f.area(),
    );

    let chunks = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(f.area());

    match app.view {
        View::Connect => ui::views::render_connect(f, app, chunks[0]),
        View::Home => {
            let panes = Layout::horizontal([
                Constraint::Length(SIDEBAR_WIDTH.min(chunks[0].width / 2)),
                Constraint::Min(0),
            ])
            .split(chunks[0]);
            ui::views::render_sidebar(f, app, panes[0]);
            ui::views::render_chat(f, app, panes[1]);
        }
    }

    let address = app.connected_address();
    render_statusbar(f, chunks[1], app.current_notification(), address.as_deref());

    ui::views::render_modal(f, app);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::views::buffer_text;
    use crate::ui::ConversationRow;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn connect_screen() {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let app = App::new(Some("0x1000000000000000000000000000000000000001"));
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Relaygram"));
        assert!(text.contains("0x1000000000000000000000000000000000000001"));
        assert!(text.contains("not connected"));
    }

    #[test]
    fn home_without_open_chat() {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        let mut app = App::new(None);
        app.view = View::Home;
        app.rows = vec![ConversationRow {
            id: "c1".into(),
            title: "Alice".into(),
            time_label: "Yesterday".into(),
            preview: "see you".into(),
            is_group: false,
        }];
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Alice"));
        assert!(text.contains("Select a conversation"));
    }
}
