//! Conversation controller.
//!
//! Owns the ordered message history, the draft input and the single-flight
//! `pending` flag. Each submission moves through `Idle -> AwaitingResponse ->
//! Idle`; the request itself runs in a spawned task so a UI can keep drawing
//! while it is suspended.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{AskClient, AskError};
use crate::message::{decode_conversation, encode_conversation, Message};
use crate::storage::HistoryStore;

/// Handle to the one request currently in flight.
///
/// Only [`ChatController::dispatch`] creates one, and it must be handed back
/// to [`ChatController::resolve`] to leave the pending state.
#[derive(Debug)]
pub struct InFlight {
    handle: JoinHandle<Result<String, AskError>>,
}

impl InFlight {
    /// Whether the request has finished and `resolve` will not wait.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// The conversation controller.
pub struct ChatController<S: HistoryStore> {
    messages: Vec<Message>,
    pending: bool,
    draft: String,
    store: S,
    client: Arc<dyn AskClient>,
}

impl<S: HistoryStore> ChatController<S> {
    /// Create a controller with an empty conversation.
    /// Call [`initialize`](Self::initialize) to restore persisted history.
    pub fn new(store: S, client: Arc<dyn AskClient>) -> Self {
        Self {
            messages: Vec::new(),
            pending: false,
            draft: String::new(),
            store,
            client,
        }
    }

    /// Restore the persisted conversation.
    ///
    /// A missing, unreadable or corrupt value leaves the conversation empty;
    /// the problem is logged and never returned.
    pub fn initialize(&mut self) {
        let raw = match self.store.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted conversation");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted conversation");
                return;
            }
        };

        match decode_conversation(&raw) {
            Ok(messages) => {
                info!(count = messages.len(), "Restored conversation");
                self.messages = messages;
            }
            Err(e) => {
                warn!(error = %e, "Discarding corrupt persisted conversation");
                self.messages.clear();
            }
        }
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Current draft input.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the draft input.
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Whether [`dispatch`](Self::dispatch) would accept the current draft.
    pub fn can_submit(&self) -> bool {
        !self.pending && !self.draft.trim().is_empty()
    }

    /// Start a submission of the current draft.
    ///
    /// Appends the user message, clears the draft, enters the pending state
    /// and spawns the request. Returns `None` without touching any state when
    /// the draft is blank or a request is already in flight.
    pub fn dispatch(&mut self) -> Option<InFlight> {
        if !self.can_submit() {
            return None;
        }

        let question = self.draft.trim().to_string();
        self.append(Message::user(question.clone()));
        self.draft.clear();
        self.pending = true;

        let client = Arc::clone(&self.client);
        let handle = tokio::spawn(async move { client.ask(&question).await });
        Some(InFlight { handle })
    }

    /// Finish a submission: append the answer or the failure report, then
    /// leave the pending state. Returns the appended agent message, as
    /// `Ok` for an answer and `Err` for a failure report.
    ///
    /// A request task that panicked or was aborted takes the failure path,
    /// so `pending` is cleared on every exit.
    pub async fn resolve(&mut self, in_flight: InFlight) -> Result<&Message, &Message> {
        let outcome = match in_flight.handle.await {
            Ok(result) => result,
            Err(e) => Err(AskError::Aborted(e.to_string())),
        };

        let failed = outcome.is_err();
        let message = match outcome {
            Ok(answer) => Message::agent(answer),
            Err(e) => {
                warn!(error = %e, "Request failed");
                Message::failure(&e)
            }
        };

        let index = self.messages.len();
        self.append(message);
        self.pending = false;

        let message = &self.messages[index];
        if failed {
            Err(message)
        } else {
            Ok(message)
        }
    }

    /// Submit the current draft and wait for the answer.
    /// Returns `None` when the submission was rejected.
    pub async fn submit(&mut self) -> Option<Result<&Message, &Message>> {
        let in_flight = self.dispatch()?;
        Some(self.resolve(in_flight).await)
    }

    /// Clear the conversation and erase persisted history.
    ///
    /// `confirm` is asked first; nothing happens unless it returns `true`.
    /// Refused while a request is pending. Returns whether history was
    /// cleared.
    pub fn clear(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if self.pending {
            debug!("Clear refused while a request is pending");
            return false;
        }
        if !confirm() {
            return false;
        }

        self.messages.clear();
        if let Err(e) = self.store.erase() {
            warn!(error = %e, "Failed to erase persisted conversation");
        }
        info!("Conversation cleared");
        true
    }

    fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.persist();
    }

    /// Write the whole conversation to the store. Skipped when empty.
    fn persist(&mut self) {
        if self.messages.is_empty() {
            return;
        }

        let encoded = match encode_conversation(&self.messages) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "Failed to encode conversation");
                return;
            }
        };
        if let Err(e) = self.store.write(&encoded) {
            warn!(error = %e, "Failed to persist conversation");
        }
    }
}
