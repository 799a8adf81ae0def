//! Conversation message view

use crate::events::{ChatMessage, ConversationRole};
use crate::markdown;
use crate::timefmt::format_time;
use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Rendered message blocks, drawn bottom-anchored
#[derive(Clone)]
pub struct ConversationHistory {
    lines: Vec<Line<'static>>,
    show_timestamps: bool,
    /// Lines scrolled up from the bottom
    scroll_offset: usize,
}

impl ConversationHistory {
    pub fn new(show_timestamps: bool) -> Self {
        Self {
            lines: Vec::new(),
            show_timestamps,
            scroll_offset: 0,
        }
    }

    pub fn from_messages(messages: &[ChatMessage], show_timestamps: bool) -> Self {
        let mut history = Self::new(show_timestamps);
        for message in messages {
            match message.role {
                ConversationRole::System => history.add_notice(&message.content),
                role => history.render_message(
                    &message.content,
                    role == ConversationRole::User,
                    message.timestamp,
                ),
            }
        }
        history
    }

    pub fn with_scroll(mut self, scroll_offset: usize) -> Self {
        self.scroll_offset = scroll_offset;
        self
    }

    /// Append a message block.
    ///
    /// User text is shown verbatim; assistant text goes through the markdown formatter.
    pub fn render_message(&mut self, content: &str, is_user: bool, timestamp: Option<DateTime<Local>>) {
        let (icon, name, style) = if is_user {
            ("👤", "You", Style::default().fg(Color::Blue))
        } else {
            ("🤖", "Storyline", Style::default().fg(Color::Green))
        };

        let mut header = vec![Span::styled(
            format!("{icon} {name}"),
            style.add_modifier(Modifier::BOLD),
        )];
        if self.show_timestamps {
            header.push(Span::styled(
                format!(" {} ", format_time(timestamp)),
                Style::default().fg(Color::DarkGray),
            ));
        }
        self.lines.push(Line::from(header));

        if is_user {
            for text in content.lines() {
                self.lines.push(indent(Line::from(Span::styled(text.to_string(), style))));
            }
        } else {
            for line in markdown::parse(content).to_lines(style) {
                self.lines.push(indent(line));
            }
        }

        self.lines.push(Line::default());
    }

    /// Append a client-side notice such as help output
    pub fn add_notice(&mut self, content: &str) {
        let style = Style::default().fg(Color::Yellow);
        self.lines.push(Line::from(Span::styled("⚙️ Notice", style.add_modifier(Modifier::BOLD))));
        for text in content.lines() {
            self.lines.push(indent(Line::from(Span::styled(text.to_string(), style))));
        }
        self.lines.push(Line::default());
    }
}

impl Widget for ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation")
            .border_style(Style::default().fg(Color::Gray));

        let inner_area = block.inner(area);
        block.render(area, buf);

        let width = inner_area.width as usize;
        let wrapped: Vec<Line<'static>> = self
            .lines
            .iter()
            .flat_map(|line| wrap_line(line, width))
            .collect();

        let height = inner_area.height as usize;
        let total = wrapped.len();
        let max_offset = total.saturating_sub(height);
        let end = total - self.scroll_offset.min(max_offset);
        let start = end.saturating_sub(height);

        for (i, line) in wrapped[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn indent(mut line: Line<'static>) -> Line<'static> {
    line.spans.insert(0, Span::raw("  "));
    line
}

/// Word-wrap a styled line to `width` columns, keeping span styles
pub fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![line.clone()];
    }

    let mut wrapped = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for span in &line.spans {
        for token in split_words(&span.content) {
            let piece = Span::styled(token.to_string(), span.style);
            let piece_width = piece.width();

            if current_width + piece_width > width && current_width > 0 {
                wrapped.push(Line::from(std::mem::take(&mut current)));
                current_width = 0;
                if token.trim().is_empty() {
                    continue;
                }
            }

            current_width += piece_width;
            current.push(piece);
        }
    }

    wrapped.push(Line::from(current));
    wrapped
}

/// Split into alternating runs of whitespace and non-whitespace
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (index, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        if in_space.is_some_and(|previous| previous != is_space) {
            tokens.push(&text[start..index]);
            start = index;
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}
