//! Terminal presentation layer

pub mod conversation;
pub mod sidebar;

use crate::config::UiConfig;
use crate::session::{AppState, Phase};
use conversation::ConversationManager;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use sidebar::HistorySidebar;

/// Which pane receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Sidebar,
}

/// View-only state: focus, selection and scroll. Never persisted.
pub struct ChatView {
    pub focus: Focus,
    pub selected: usize,
    pub conversation: ConversationManager,
    pub ui: UiConfig,
}

impl ChatView {
    pub fn new(ui: UiConfig) -> Self {
        Self {
            focus: Focus::Composer,
            selected: 0,
            conversation: ConversationManager::new(ui.show_timestamps),
            ui,
        }
    }

    pub fn focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.conversation.set_focus(focus == Focus::Composer);
    }
}

/// Draw the whole screen
pub fn draw(frame: &mut Frame, state: &AppState, view: &ChatView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(1)])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(view.ui.sidebar_width), Constraint::Min(20)])
        .split(rows[0]);

    frame.render_widget(
        HistorySidebar::new(&state.conversations, state.current_chat_id.as_deref())
            .selected(Some(view.selected))
            .focused(view.focus == Focus::Sidebar),
        columns[0],
    );

    view.conversation.render(columns[1], frame.buffer_mut(), state);

    frame.render_widget(Paragraph::new(status_line(state, view.focus)), rows[1]);
}

fn status_line(state: &AppState, focus: Focus) -> Line<'static> {
    let phase = match state.phase {
        Phase::Uninitialized | Phase::Loading => Span::styled("loading ", Style::default().fg(Color::Yellow)),
        Phase::Ready => Span::styled("ready ", Style::default().fg(Color::Green)),
    };

    let chat = state
        .current_chat_id
        .clone()
        .unwrap_or_else(|| "no chat".to_string());

    let hint = match focus {
        Focus::Composer => "Enter send · Tab chats · /help",
        Focus::Sidebar => "↑↓ move · Enter open · d delete · n new · Tab back",
    };

    let mut spans = vec![
        phase,
        Span::styled(format!("{chat} "), Style::default().fg(Color::DarkGray)),
        Span::styled(hint, Style::default().fg(Color::Gray)),
    ];
    if let Some(status) = &state.status {
        spans.push(Span::styled(format!("  {status}"), Style::default().fg(Color::Yellow)));
    }

    Line::from(spans)
}
