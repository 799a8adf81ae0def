use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// "Thinking" line shown while a reply for the visible chat is pending
#[derive(Clone, Default)]
pub struct TypingIndicator {
    is_waiting: bool,
}

impl TypingIndicator {
    pub fn new(is_waiting: bool) -> Self {
        Self { is_waiting }
    }

    fn dots() -> &'static str {
        let tick = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
            / 300;
        match tick % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }
}

impl Widget for TypingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.is_waiting || area.height == 0 {
            return;
        }

        let indicator = Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled("Storyline is thinking", Style::default().fg(Color::Green)),
            Span::styled(Self::dots(), Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &indicator, area.width);
    }
}
