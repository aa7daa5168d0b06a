//! Test utilities for rendering and driving the ask TUI.
//!
//! Provides a scripted [`AskClient`], app constructors with preloaded
//! history, and buffer-to-string helpers for asserting on rendered output.

use crate::app::App;
use crate::screens::Screen as ScreenTrait;
use ask_engine::message::encode_conversation;
use ask_engine::{AskClient, AskError, HistoryStore, Message, MemoryStore};
use async_trait::async_trait;
use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Terminal};
use std::sync::Arc;

/// Default terminal width for tests.
pub const TEST_WIDTH: u16 = 80;

/// Default terminal height for tests.
pub const TEST_HEIGHT: u16 = 24;

/// Client that answers every question with a fixed outcome.
#[derive(Debug, Clone)]
pub enum ScriptedClient {
    Answer(String),
    Fail { status: u16, reason: String },
}

impl ScriptedClient {
    pub fn answering(answer: &str) -> Self {
        Self::Answer(answer.to_string())
    }

    pub fn failing(status: u16, reason: &str) -> Self {
        Self::Fail {
            status,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl AskClient for ScriptedClient {
    async fn ask(&self, _question: &str) -> Result<String, AskError> {
        match self {
            Self::Answer(answer) => Ok(answer.clone()),
            Self::Fail { status, reason } => Err(AskError::Status {
                status: *status,
                reason: reason.clone(),
            }),
        }
    }
}

/// Create a test terminal with custom dimensions.
pub fn create_test_terminal_sized(width: u16, height: u16) -> Terminal<TestBackend> {
    let backend = TestBackend::new(width, height);
    Terminal::new(backend).expect("Failed to create test terminal")
}

/// Create a test app with an empty in-memory history.
pub fn create_test_app(client: ScriptedClient) -> App {
    App::new_for_test(MemoryStore::new(), Arc::new(client))
}

/// Create a test app whose store already holds the given `(role, content)`
/// turns. Roles are `"user"` or `"agent"`.
pub fn create_test_app_with_history(mut store: MemoryStore, turns: &[(&str, &str)]) -> App {
    let messages: Vec<Message> = turns
        .iter()
        .map(|(role, content)| match *role {
            "user" => Message::user(*content),
            _ => Message::agent(*content),
        })
        .collect();
    store
        .write(&encode_conversation(&messages).unwrap())
        .unwrap();
    App::new_for_test(store, Arc::new(ScriptedClient::answering("unused")))
}

/// Convert a buffer to a string, one line per row with trailing spaces
/// trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut result = String::new();

    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            let cell = buffer.cell((x, y)).unwrap();
            result.push_str(cell.symbol());
        }
        while result.ends_with(' ') {
            result.pop();
        }
        result.push('\n');
    }

    // Trailing blank rows carry no information
    while result.ends_with('\n') {
        result.pop();
    }

    result
}

/// Render a screen at the default size and return it as a string.
pub fn render_screen_to_string<S: ScreenTrait>(screen: &S, app: &App) -> String {
    render_screen_to_string_sized(screen, app, TEST_WIDTH, TEST_HEIGHT)
}

/// Render a screen with custom dimensions and return it as a string.
pub fn render_screen_to_string_sized<S: ScreenTrait>(
    screen: &S,
    app: &App,
    width: u16,
    height: u16,
) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buffer = Buffer::empty(area);
    screen.render(app, area, &mut buffer);
    buffer_to_string(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_terminal() {
        let terminal = create_test_terminal_sized(TEST_WIDTH, TEST_HEIGHT);
        let size = terminal.size().unwrap();
        assert_eq!(size.width, TEST_WIDTH);
        assert_eq!(size.height, TEST_HEIGHT);
    }

    #[test]
    fn test_create_test_app_with_history() {
        let app = create_test_app_with_history(
            MemoryStore::new(),
            &[("user", "hi"), ("agent", "hello")],
        );
        assert_eq!(app.controller.messages().len(), 2);
        assert_eq!(app.controller.messages()[1].content, "hello");
    }

    #[test]
    fn test_buffer_to_string() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buffer = Buffer::empty(area);
        buffer.set_string(0, 0, "Hello", ratatui::style::Style::default());
        buffer.set_string(0, 1, "World", ratatui::style::Style::default());

        assert_eq!(buffer_to_string(&buffer), "Hello\nWorld");
    }
}
