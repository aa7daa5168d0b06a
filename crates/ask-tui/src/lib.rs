//! ask-tui: Terminal UI for the ask chat client
//!
//! This crate provides the TUI layer for ask, including:
//! - The chat screen with transcript, input box and status bar
//! - Clear and quit confirmation overlays, help overlay
//! - Key handling and the event loop driving the conversation controller

mod app;
mod event;
mod screens;
#[cfg(test)]
pub mod test_utils;
mod ui;

use screens::Screen as ScreenTrait;

pub use app::{App, Controller, Screen, TranscriptScroll};
pub use ask_engine;
pub use event::{Action, Event, EventHandler};

use crossterm::{
    cursor::Show as ShowCursor,
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, buffer::Buffer, layout::Rect, Terminal};
use std::io::{self, stdout};
use tracing::info;

/// RAII guard for terminal state restoration.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableMouseCapture, LeaveAlternateScreen, ShowCursor);
    }
}

/// Run the TUI application.
///
/// Sets up the terminal, runs the event loop until the user quits, and
/// restores the terminal on exit.
pub async fn run_tui(mut app: App) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;

    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // 4 Hz tick rate drives the spinner and notification expiry
    let mut events = EventHandler::new(250);

    info!(endpoint = %app.endpoint, "Starting TUI");
    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            render_app(app, area, frame.buffer_mut());
        })?;

        if let Some(event) = events.next().await {
            match event {
                Event::Key(key) => {
                    if !handle_chat_key(app, key) {
                        app.handle_action(event::key_to_action(key));
                    }
                }
                Event::Mouse(mouse) => {
                    use crossterm::event::MouseEventKind;
                    match mouse.kind {
                        MouseEventKind::ScrollUp => app.scroll.scroll_up(app::SCROLL_SPEED),
                        MouseEventKind::ScrollDown => app.scroll.scroll_down(app::SCROLL_SPEED),
                        _ => {}
                    }
                }
                Event::Tick => app.tick(),
                Event::Resize(_, _) => {
                    // Terminal will handle resize automatically
                }
            }
        }

        app.poll_response().await;

        if app.should_quit {
            info!("Quitting TUI");
            break;
        }
    }

    Ok(())
}

/// Render the current screen and any overlay.
fn render_app(app: &App, area: Rect, buf: &mut Buffer) {
    match app.screen {
        Screen::Chat => screens::chat::ChatScreen.render(app, area, buf),
        Screen::ClearConfirm => screens::chat::ClearConfirmScreen.render(app, area, buf),
        Screen::QuitConfirm => screens::chat::QuitConfirmScreen.render(app, area, buf),
    }

    if app.show_help {
        screens::render_help_overlay(area, buf);
    }
}

/// Handle key input for the chat input box.
/// Returns true if the key was handled (should not be processed as action).
///
/// The input only takes keys on the chat screen, with no overlay showing
/// and no request in flight.
fn handle_chat_key(app: &mut App, key: KeyEvent) -> bool {
    if app.screen != Screen::Chat || app.show_help || app.is_pending() {
        return false;
    }

    // Let the action handler deal with Ctrl+C, Ctrl+L
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }

    match key.code {
        KeyCode::Enter => {
            app.submit_input();
            true
        }
        KeyCode::Char(c) => {
            app.input_state.insert(c);
            true
        }
        KeyCode::Backspace => {
            app.input_state.backspace();
            true
        }
        KeyCode::Delete => {
            app.input_state.delete();
            true
        }
        KeyCode::Left => {
            app.input_state.move_left();
            true
        }
        KeyCode::Right => {
            app.input_state.move_right();
            true
        }
        KeyCode::Home => {
            app.input_state.move_home();
            true
        }
        KeyCode::End => {
            app.input_state.move_end();
            app.scroll.follow();
            true
        }
        KeyCode::Up if app.input_state.is_empty() || app.input_state.is_recalling() => {
            app.input_state.history_prev();
            true
        }
        KeyCode::Down if app.input_state.is_recalling() => {
            app.input_state.history_next();
            true
        }
        // Up/Down while typing scroll the transcript
        _ => false,
    }
}

/// Get the TUI version.
pub fn tui_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
