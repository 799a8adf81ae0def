use crate::prompts::COMPOSER_PLACEHOLDER;
use crate::session::AppState;
use crate::ui::conversation::composer::ComposerResult;
use crate::ui::conversation::{ConversationComposer, ConversationHistory, ParsedCommand, SlashCommand, TypingIndicator};
use crossterm::event::KeyEvent;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    widgets::Widget,
};

/// Actions requested from the conversation pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Submit(String),
    NewChat,
    /// Delete the given conversation, or the active one
    DeleteChat(Option<String>),
    Refresh,
    ShowHelp,
    Exit,
}

/// Message view plus composer
pub struct ConversationManager {
    composer: ConversationComposer,
    scroll_offset: usize,
    show_timestamps: bool,
}

impl ConversationManager {
    pub fn new(show_timestamps: bool) -> Self {
        Self {
            composer: ConversationComposer::new(COMPOSER_PLACEHOLDER),
            scroll_offset: 0,
            show_timestamps,
        }
    }

    /// Handle key input while the composer has focus
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => {
                self.scroll_to_bottom();
                ConversationAction::Submit(input)
            }
            ComposerResult::Command(command) => Self::command_action(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    fn command_action(command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::New => ConversationAction::NewChat,
            SlashCommand::Delete => ConversationAction::DeleteChat(command.argument),
            SlashCommand::Refresh => ConversationAction::Refresh,
            SlashCommand::Help => ConversationAction::ShowHelp,
            SlashCommand::Bye => ConversationAction::Exit,
        }
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.composer.set_focus(has_focus);
    }

    /// The composer wants Tab and Esc for itself while its palette is open
    pub fn captures_navigation(&self) -> bool {
        self.composer.is_palette_open()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Render the conversation pane for the current state
    pub fn render(&self, area: Rect, buf: &mut Buffer, state: &AppState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History
                Constraint::Length(1), // Typing indicator
                Constraint::Length(3), // Composer
            ])
            .split(area);

        ConversationHistory::from_messages(&state.messages, self.show_timestamps)
            .with_scroll(self.scroll_offset)
            .render(chunks[0], buf);

        TypingIndicator::new(state.is_waiting()).render(chunks[1], buf);

        (&self.composer).render(chunks[2], buf);
    }
}
