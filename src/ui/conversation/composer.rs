use crate::prompts::COMPOSER_TITLE;
use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, ParsedCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Outcome of a key press in the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    Command(ParsedCommand),
    None,
}

/// Slash-command suggestions shown above the composer while typing `/...`
#[derive(Debug, Clone)]
struct CommandPalette {
    entries: Vec<CommandEntry>,
    matches: Vec<CommandEntry>,
    selected: Option<usize>,
    open: bool,
}

impl CommandPalette {
    fn new() -> Self {
        Self {
            entries: command_entries(),
            matches: Vec::new(),
            selected: None,
            open: false,
        }
    }

    fn open(&mut self, input: &str) {
        self.open = true;
        self.selected = Some(0);
        self.filter(input);
    }

    fn close(&mut self) {
        self.open = false;
        self.matches.clear();
        self.selected = None;
    }

    /// Keep the palette in step with the input after an edit
    fn sync(&mut self, input: &str) {
        if !self.open {
            if input == "/" {
                self.open(input);
            }
            return;
        }
        if input.starts_with('/') && !input.contains(char::is_whitespace) {
            self.filter(input);
        } else {
            self.close();
        }
    }

    fn filter(&mut self, input: &str) {
        let prefix = input.trim_start_matches('/').to_lowercase();
        self.matches = self
            .entries
            .iter()
            .filter(|entry| entry.keyword.starts_with(&prefix))
            .copied()
            .collect();
        self.selected = match self.matches.len() {
            0 => None,
            len => Some(self.selected.unwrap_or(0).min(len - 1)),
        };
    }

    fn step(&mut self, delta: isize) {
        let len = self.matches.len() as isize;
        if len == 0 {
            self.selected = None;
            return;
        }
        let current = self.selected.unwrap_or(0) as isize;
        self.selected = Some((current + delta).rem_euclid(len) as usize);
    }

    fn take_selected(&mut self) -> Option<CommandEntry> {
        let entry = self.selected.and_then(|index| self.matches.get(index).copied());
        self.close();
        entry
    }

    fn render(&self, composer_area: Rect, buf: &mut Buffer) {
        let height = (self.matches.len().min(5) + 2) as u16;
        let area = Rect {
            x: composer_area.x,
            y: composer_area.y.saturating_sub(height),
            width: composer_area.width,
            height: height.min(composer_area.y),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Commands")
            .style(Style::default().fg(Color::Blue));
        let inner = block.inner(area);
        block.render(area, buf);

        for (row, entry) in self.matches.iter().take(inner.height as usize).enumerate() {
            let keyword_style = if self.selected == Some(row) {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let line = Line::from(vec![
                Span::styled(format!("/{}", entry.keyword), keyword_style),
                Span::styled(" - ", Style::default().fg(Color::DarkGray)),
                Span::styled(entry.description, Style::default().fg(Color::Gray)),
            ]);
            buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
        }
    }
}

/// Single-message input box with a slash-command palette.
///
/// `cursor` is a byte offset that always sits on a char boundary.
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    input: String,
    cursor: usize,
    placeholder: String,
    has_focus: bool,
    palette: CommandPalette,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            has_focus: true,
            palette: CommandPalette::new(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => self.insert('\n'),
            KeyCode::Enter if self.palette.open => self.complete_command(),
            KeyCode::Enter => return self.submit(),
            KeyCode::Up if self.palette.open => self.palette.step(-1),
            KeyCode::Down if self.palette.open => self.palette.step(1),
            KeyCode::Tab if self.palette.open => self.complete_command(),
            KeyCode::Esc => self.palette.close(),
            KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => {}
            KeyCode::Char(c) => {
                self.insert(c);
                self.palette.sync(&self.input);
            }
            KeyCode::Backspace => {
                if let Some(ch) = self.char_before_cursor() {
                    self.cursor -= ch.len_utf8();
                    self.input.remove(self.cursor);
                    self.palette.sync(&self.input);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.input.len() {
                    self.input.remove(self.cursor);
                    self.palette.sync(&self.input);
                }
            }
            KeyCode::Left => {
                if let Some(ch) = self.char_before_cursor() {
                    self.cursor -= ch.len_utf8();
                }
            }
            KeyCode::Right => {
                if let Some(ch) = self.input[self.cursor..].chars().next() {
                    self.cursor += ch.len_utf8();
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.input.len(),
            _ => {}
        }

        ComposerResult::None
    }

    fn submit(&mut self) -> ComposerResult {
        if self.input.trim().is_empty() {
            return ComposerResult::None;
        }
        let input = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.palette.close();
        match parse_slash_command(&input) {
            Some(command) => ComposerResult::Command(command),
            None => ComposerResult::Submitted(input),
        }
    }

    fn insert(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn char_before_cursor(&self) -> Option<char> {
        self.input[..self.cursor].chars().next_back()
    }

    fn complete_command(&mut self) {
        if let Some(entry) = self.palette.take_selected() {
            self.input = format!("/{} ", entry.keyword);
            self.cursor = self.input.len();
        }
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    pub fn is_palette_open(&self) -> bool {
        self.palette.open
    }

    pub fn get_content(&self) -> &str {
        &self.input
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if self.has_focus { Color::Green } else { Color::Gray };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(COMPOSER_TITLE)
            .style(Style::default().fg(border));
        let inner = block.inner(area);
        block.render(area, buf);

        if self.input.is_empty() {
            let placeholder = Line::from(Span::styled(
                self.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, inner.y, &placeholder, inner.width);
        } else {
            let mut text = self.input.clone();
            if self.has_focus {
                text.insert(self.cursor, '▌');
            }

            // show the tail when the input is taller than the box
            let rows: Vec<&str> = text.split('\n').collect();
            let skip = rows.len().saturating_sub(inner.height as usize);
            for (offset, row) in rows.into_iter().skip(skip).enumerate() {
                buf.set_line(inner.x, inner.y + offset as u16, &Line::from(row), inner.width);
            }
        }

        if self.palette.open {
            self.palette.render(area, buf);
        }
    }
}
