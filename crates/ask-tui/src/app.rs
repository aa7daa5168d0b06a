//! Application state and update logic for the ask TUI.

use crate::event::Action;
use crate::ui::widgets::TextInputState;
use ask_engine::{ChatController, HistoryStore, InFlight};
use std::cell::Cell;
use tracing::debug;

/// Lines scrolled per PageUp/PageDown.
pub const SCROLL_PAGE: usize = 10;

/// Lines scrolled per mouse wheel tick.
pub const SCROLL_SPEED: usize = 3;

/// Ticks a notification stays visible (4 Hz tick rate).
const NOTIFICATION_TICKS: usize = 12;

/// Controller type used by the TUI.
pub type Controller = ChatController<Box<dyn HistoryStore>>;

/// The current screen being displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Chat,
    ClearConfirm,
    QuitConfirm,
}

/// Scroll position of the transcript, in wrapped lines.
///
/// While following, the transcript is pinned to its last line. The render
/// pass records the largest valid offset so scrolling can start from the
/// bottom without knowing the terminal size.
#[derive(Debug)]
pub struct TranscriptScroll {
    offset: usize,
    follow: bool,
    max_offset: Cell<usize>,
}

impl Default for TranscriptScroll {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptScroll {
    /// Create a scroll state that follows the newest message.
    pub fn new() -> Self {
        Self {
            offset: 0,
            follow: true,
            max_offset: Cell::new(0),
        }
    }

    /// Whether the view is pinned to the newest message.
    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Jump to the newest message and keep following.
    pub fn follow(&mut self) {
        self.follow = true;
    }

    /// Offset of the first visible line as last rendered.
    pub fn offset(&self) -> usize {
        if self.follow {
            self.max_offset.get()
        } else {
            self.offset.min(self.max_offset.get())
        }
    }

    /// Scroll towards older messages. Stops following.
    pub fn scroll_up(&mut self, amount: usize) {
        self.offset = self.offset().saturating_sub(amount);
        self.follow = false;
    }

    /// Scroll towards newer messages. Reaching the bottom resumes following.
    pub fn scroll_down(&mut self, amount: usize) {
        if self.follow {
            return;
        }
        let max = self.max_offset.get();
        self.offset = (self.offset + amount).min(max);
        if self.offset >= max {
            self.follow = true;
        }
    }

    /// Record the laid-out size and return the offset to draw at.
    pub fn layout(&self, total_lines: usize, height: usize) -> usize {
        self.max_offset.set(total_lines.saturating_sub(height));
        self.offset()
    }
}

/// Application state.
pub struct App {
    /// Whether the app should quit.
    pub should_quit: bool,

    /// Whether the help overlay is visible.
    pub show_help: bool,

    /// Current screen.
    pub screen: Screen,

    /// Conversation controller.
    pub controller: Controller,

    /// Text input state for the chat input.
    pub input_state: TextInputState,

    /// Transcript scroll position.
    pub scroll: TranscriptScroll,

    /// Tick counter for animations.
    pub tick: usize,

    /// Endpoint the questions are sent to (shown in the status bar).
    pub endpoint: String,

    /// Notification message (displayed temporarily, cleared after some ticks).
    pub notification: Option<String>,

    /// Ticks remaining until notification is cleared.
    notification_ttl: usize,

    /// The request currently in flight, if any.
    in_flight: Option<InFlight>,
}

impl App {
    /// Create the app and restore persisted history.
    pub fn new(mut controller: Controller, endpoint: impl Into<String>) -> Self {
        controller.initialize();
        Self {
            should_quit: false,
            show_help: false,
            screen: Screen::Chat,
            controller,
            input_state: TextInputState::new(),
            scroll: TranscriptScroll::new(),
            tick: 0,
            endpoint: endpoint.into(),
            notification: None,
            notification_ttl: 0,
            in_flight: None,
        }
    }

    /// Create an app backed by an in-memory store, for tests.
    #[cfg(test)]
    pub fn new_for_test(
        store: ask_engine::MemoryStore,
        client: std::sync::Arc<dyn ask_engine::AskClient>,
    ) -> Self {
        let store: Box<dyn HistoryStore> = Box::new(store);
        Self::new(ChatController::new(store, client), "http://127.0.0.1:3000/api/ask")
    }

    /// Whether a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.controller.is_pending()
    }

    /// Handle an action.
    pub fn handle_action(&mut self, action: Action) {
        // Global actions
        match action {
            Action::Quit => {
                if self.show_help {
                    self.show_help = false;
                } else if self.screen == Screen::QuitConfirm {
                    self.should_quit = true;
                } else {
                    self.screen = Screen::QuitConfirm;
                }
                return;
            }
            Action::Help => {
                self.show_help = !self.show_help;
                return;
            }
            _ => {}
        }

        // If help is showing, any key closes it
        if self.show_help {
            self.show_help = false;
            return;
        }

        match self.screen {
            Screen::Chat => self.handle_chat_action(action),
            Screen::ClearConfirm => self.handle_clear_confirm_action(action),
            Screen::QuitConfirm => self.handle_quit_confirm_action(action),
        }
    }

    fn handle_chat_action(&mut self, action: Action) {
        match action {
            Action::Clear => self.request_clear(),
            Action::Back => self.screen = Screen::QuitConfirm,
            Action::Up => self.scroll.scroll_up(1),
            Action::Down => self.scroll.scroll_down(1),
            Action::PageUp => self.scroll.scroll_up(SCROLL_PAGE),
            Action::PageDown => self.scroll.scroll_down(SCROLL_PAGE),
            Action::Bottom => self.scroll.follow(),
            _ => {}
        }
    }

    fn handle_clear_confirm_action(&mut self, action: Action) {
        let confirmed = match action {
            Action::Select | Action::Confirm => true,
            Action::Back | Action::Deny => false,
            _ => return,
        };

        if self.controller.clear(|| confirmed) {
            self.scroll.follow();
            self.set_notification("History cleared");
        }
        self.screen = Screen::Chat;
    }

    fn handle_quit_confirm_action(&mut self, action: Action) {
        match action {
            Action::Select | Action::Confirm => self.should_quit = true,
            Action::Back | Action::Deny => self.screen = Screen::Chat,
            _ => {}
        }
    }

    /// Open the clear confirmation, if there is anything to clear.
    fn request_clear(&mut self) {
        if self.controller.messages().is_empty() {
            self.set_notification("Nothing to clear");
        } else if self.is_pending() {
            self.set_notification("Wait for the answer");
        } else {
            self.screen = Screen::ClearConfirm;
        }
    }

    /// Send the current input. Returns whether a request was started.
    ///
    /// A blank input or a pending request leaves the input untouched.
    pub fn submit_input(&mut self) -> bool {
        self.controller.set_draft(self.input_state.content());
        match self.controller.dispatch() {
            Some(in_flight) => {
                self.input_state.submit();
                self.in_flight = Some(in_flight);
                self.scroll.follow();
                true
            }
            None => {
                debug!("Submission ignored");
                false
            }
        }
    }

    /// Resolve the in-flight request if it has finished.
    pub async fn poll_response(&mut self) {
        if self.in_flight.as_ref().is_some_and(InFlight::is_finished) {
            self.finish_response().await;
        }
    }

    /// Wait for the in-flight request, if any, and append its outcome.
    pub async fn finish_response(&mut self) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        let failed = self.controller.resolve(in_flight).await.is_err();
        self.scroll.follow();
        if failed {
            self.set_notification("Request failed");
        }
    }

    /// Set a temporary notification message.
    fn set_notification(&mut self, msg: impl Into<String>) {
        self.notification = Some(msg.into());
        self.notification_ttl = NOTIFICATION_TICKS;
    }

    /// Increment tick counter and update time-based state.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        if self.notification_ttl > 0 {
            self.notification_ttl -= 1;
            if self.notification_ttl == 0 {
                self.notification = None;
            }
        }
    }
}
