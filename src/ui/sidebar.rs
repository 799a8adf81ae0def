//! Conversation list grouped by recency

use crate::backend::ConversationSummary;
use crate::history::{group_conversations, EMPTY_HISTORY};
use chrono::{DateTime, Local};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Conversation ids in the order the sidebar lists them
pub fn display_order(conversations: &[ConversationSummary], now: DateTime<Local>) -> Vec<String> {
    group_conversations(conversations, now)
        .into_iter()
        .flat_map(|group| group.conversations)
        .map(|conversation| conversation.conversation_id.clone())
        .collect()
}

/// Build the sidebar lines.
///
/// Returns the lines together with the line index of the selected entry.
pub fn render_history_sidebar(
    conversations: &[ConversationSummary],
    active_id: Option<&str>,
    selected: Option<usize>,
    now: DateTime<Local>,
) -> (Vec<Line<'static>>, Option<usize>) {
    let groups = group_conversations(conversations, now);
    if groups.is_empty() {
        let placeholder = Line::from(Span::styled(EMPTY_HISTORY, Style::default().fg(Color::DarkGray)));
        return (vec![placeholder], None);
    }

    let mut lines = Vec::new();
    let mut selected_line = None;
    let mut entry_index = 0;

    for group in groups {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::from(Span::styled(
            group.bucket.label(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
        )));

        for conversation in group.conversations {
            let is_active = active_id == Some(conversation.conversation_id.as_str());
            let is_selected = selected == Some(entry_index);

            let mut style = if is_active {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            if is_selected {
                style = style.bg(Color::DarkGray);
                selected_line = Some(lines.len());
            }

            let title = if conversation.last_message.trim().is_empty() {
                conversation.conversation_id.clone()
            } else {
                first_line(&conversation.last_message)
            };

            lines.push(Line::from(vec![
                Span::styled(if is_active { "▶ " } else { "💬 " }, style),
                Span::styled(title, style),
            ]));
            entry_index += 1;
        }
    }

    (lines, selected_line)
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

/// Sidebar widget
pub struct HistorySidebar<'a> {
    conversations: &'a [ConversationSummary],
    active_id: Option<&'a str>,
    selected: Option<usize>,
    has_focus: bool,
    now: DateTime<Local>,
}

impl<'a> HistorySidebar<'a> {
    pub fn new(conversations: &'a [ConversationSummary], active_id: Option<&'a str>) -> Self {
        Self {
            conversations,
            active_id,
            selected: None,
            has_focus: false,
            now: Local::now(),
        }
    }

    pub fn selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn focused(mut self, has_focus: bool) -> Self {
        self.has_focus = has_focus;
        self
    }
}

impl Widget for HistorySidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("📚 Chats")
            .border_style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        let selected = if self.has_focus { self.selected } else { None };
        let (lines, selected_line) =
            render_history_sidebar(self.conversations, self.active_id, selected, self.now);

        // Scroll just enough to keep the selected entry visible
        let height = inner_area.height as usize;
        let start = match selected_line {
            Some(line) if line >= height => line + 1 - height,
            _ => 0,
        };

        for (i, line) in lines.iter().skip(start).take(height).enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}
