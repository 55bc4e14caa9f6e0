// Color palette and shared styles for the chat client

use ratatui::style::{Color, Modifier, Style};

// -----------------------------------------------------------------------------
// Backgrounds
// -----------------------------------------------------------------------------

pub const BG_APP: Color = Color::Rgb(14, 22, 33);
pub const BG_SIDEBAR: Color = Color::Rgb(23, 33, 43);
pub const BG_SELECTED: Color = Color::Rgb(43, 82, 120);
pub const BG_INPUT: Color = Color::Rgb(23, 33, 43);
pub const BG_MODAL: Color = Color::Rgb(28, 38, 50);

/// Own message bubble
pub const BG_BUBBLE_OWN: Color = Color::Rgb(43, 82, 120);
/// Incoming message bubble
pub const BG_BUBBLE_PEER: Color = Color::Rgb(24, 37, 51);

// -----------------------------------------------------------------------------
// Text
// -----------------------------------------------------------------------------

pub const TEXT_PRIMARY: Color = Color::Rgb(232, 236, 240);
pub const TEXT_MUTED: Color = Color::Rgb(112, 129, 145);
pub const TEXT_DIM: Color = Color::Rgb(80, 94, 108);

// -----------------------------------------------------------------------------
// Accents
// -----------------------------------------------------------------------------

pub const ACCENT_PRIMARY: Color = Color::Rgb(82, 136, 193);
pub const ACCENT_SUCCESS: Color = Color::Rgb(106, 173, 95);
pub const ACCENT_WARNING: Color = Color::Rgb(222, 165, 92);
pub const ACCENT_ERROR: Color = Color::Rgb(236, 104, 104);

pub const BORDER_ACTIVE: Color = ACCENT_PRIMARY;
pub const BORDER_INACTIVE: Color = Color::Rgb(44, 56, 68);

/// Avatar colors, picked deterministically per sender
pub const AVATAR_PALETTE: [Color; 6] = [
    Color::Rgb(229, 115, 115),
    Color::Rgb(255, 183, 77),
    Color::Rgb(129, 199, 132),
    Color::Rgb(100, 181, 246),
    Color::Rgb(186, 104, 200),
    Color::Rgb(77, 182, 172),
];

pub fn avatar_color(id: &str) -> Color {
    let hash: usize = id.bytes().map(|b| b as usize).sum();
    AVATAR_PALETTE[hash % AVATAR_PALETTE.len()]
}

// -----------------------------------------------------------------------------
// Styles
// -----------------------------------------------------------------------------

pub fn text_primary() -> Style {
    Style::default().fg(TEXT_PRIMARY)
}

pub fn text_muted() -> Style {
    Style::default().fg(TEXT_MUTED)
}

pub fn text_dim() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn title() -> Style {
    Style::default()
        .fg(TEXT_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn selected() -> Style {
    Style::default().bg(BG_SELECTED).fg(TEXT_PRIMARY)
}

pub fn border(focused: bool) -> Style {
    Style::default().fg(if focused { BORDER_ACTIVE } else { BORDER_INACTIVE })
}

pub fn error() -> Style {
    Style::default().fg(ACCENT_ERROR)
}

pub fn warning() -> Style {
    Style::default().fg(ACCENT_WARNING)
}
