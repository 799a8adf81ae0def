//! Terminal setup and the key-driven event loop

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::App;
use crate::config::Config;
use crate::store::ConversationStore;
use crate::ui::conversation::ConversationAction;
use crate::ui::sidebar::display_order;
use crate::ui::{self, ChatView, Focus};

type Tui = Terminal<CrosstermBackend<Stdout>>;

const TICK: Duration = Duration::from_millis(100);
const SCROLL_STEP: usize = 5;

/// Run the interactive client until the user quits
pub async fn run(config: &Config, store: ConversationStore) -> Result<()> {
    let mut terminal = enter_terminal()?;
    let result = event_loop(&mut terminal, config, store).await;
    leave_terminal(&mut terminal)?;
    result
}

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn leave_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

async fn event_loop(terminal: &mut Tui, config: &Config, store: ConversationStore) -> Result<()> {
    let mut app = App::new(store);
    let mut view = ChatView::new(config.ui.clone());

    terminal
        .draw(|frame| ui::draw(frame, app.state(), &view))
        .context("Failed to draw")?;
    app.initialize().await;
    info!("Client ready against {}", config.backend_url);

    loop {
        app.process_events().await;
        terminal
            .draw(|frame| ui::draw(frame, app.state(), &view))
            .context("Failed to draw")?;

        if !event::poll(TICK).context("Failed to poll terminal events")? {
            continue;
        }

        if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !handle_key(&mut app, &mut view, key).await {
                break;
            }
        }
    }

    Ok(())
}

/// Route one key press; `false` means quit
async fn handle_key(app: &mut App, view: &mut ChatView, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return false,
            KeyCode::Char('n') => {
                app.new_chat().await;
                view.conversation.scroll_to_bottom();
                view.focus(Focus::Composer);
                return true;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::PageUp => {
            view.conversation.scroll_up(SCROLL_STEP);
            return true;
        }
        KeyCode::PageDown => {
            view.conversation.scroll_down(SCROLL_STEP);
            return true;
        }
        _ => {}
    }

    match view.focus {
        Focus::Composer => {
            if key.code == KeyCode::Tab && !view.conversation.captures_navigation() {
                select_active(app, view);
                view.focus(Focus::Sidebar);
                return true;
            }
            let action = view.conversation.handle_key(key);
            apply_action(app, view, action).await
        }
        Focus::Sidebar => {
            handle_sidebar_key(app, view, key).await;
            true
        }
    }
}

async fn apply_action(app: &mut App, view: &mut ChatView, action: ConversationAction) -> bool {
    match action {
        ConversationAction::None => {}
        ConversationAction::Submit(text) => {
            app.submit_query(&text);
        }
        ConversationAction::NewChat => {
            app.new_chat().await;
            view.conversation.scroll_to_bottom();
        }
        ConversationAction::DeleteChat(target) => {
            let target = target.or_else(|| app.state().current_chat_id.clone());
            if let Some(id) = target {
                app.delete_chat(&id).await;
            }
        }
        ConversationAction::Refresh => app.refresh_conversations().await,
        ConversationAction::ShowHelp => {
            app.show_help();
            view.conversation.scroll_to_bottom();
        }
        ConversationAction::Exit => return false,
    }
    true
}

async fn handle_sidebar_key(app: &mut App, view: &mut ChatView, key: KeyEvent) {
    let order = display_order(&app.state().conversations, Local::now());

    match key.code {
        KeyCode::Tab | KeyCode::Esc => view.focus(Focus::Composer),
        KeyCode::Up | KeyCode::Char('k') => {
            view.selected = view.selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if view.selected + 1 < order.len() {
                view.selected += 1;
            }
        }
        KeyCode::Enter => {
            if let Some(id) = order.get(view.selected) {
                app.open_chat(id).await;
                view.conversation.scroll_to_bottom();
                view.focus(Focus::Composer);
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = order.get(view.selected) {
                if app.delete_chat(id).await {
                    let remaining = app.state().conversations.len();
                    view.selected = view.selected.min(remaining.saturating_sub(1));
                }
            }
        }
        KeyCode::Char('n') => {
            app.new_chat().await;
            view.conversation.scroll_to_bottom();
            view.focus(Focus::Composer);
        }
        KeyCode::Char('r') => app.refresh_conversations().await,
        _ => {}
    }
}

/// Point the sidebar selection at the active chat when there is one
fn select_active(app: &App, view: &mut ChatView) {
    let order = display_order(&app.state().conversations, Local::now());
    if let Some(position) = app
        .state()
        .current_chat_id
        .as_deref()
        .and_then(|active| order.iter().position(|id| id == active))
    {
        view.selected = position;
    }
}
