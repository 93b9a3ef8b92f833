//! Page-level orchestration: view gating, the send lifecycle and notices.

use anyhow::Result;

use crate::completion::{CompletionClient, CompletionError};
use crate::credential::CredentialStore;
use crate::state::{Conversation, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    CredentialEntry,
    Conversation,
}

/// User-facing notification raised by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    CredentialRequired,
    RequestFailed,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::CredentialRequired => "API key required",
            Notice::RequestFailed => "Error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Notice::CredentialRequired => "Enter your API key before sending a message.",
            Notice::RequestFailed => "Failed to get response from AI. Please try again.",
        }
    }
}

/// Everything a completion call needs, detached from the controller so it
/// can run on a spawned task.
pub struct PendingTurn {
    session: u64,
    client: CompletionClient,
    history: Vec<Message>,
    text: String,
    credential: String,
}

impl PendingTurn {
    pub async fn run(self) -> TurnOutcome {
        let result = self
            .client
            .complete(&self.history, &self.text, &self.credential)
            .await;
        TurnOutcome {
            session: self.session,
            result,
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }
}

#[derive(Debug)]
pub struct TurnOutcome {
    session: u64,
    result: Result<String, CompletionError>,
}

impl TurnOutcome {
    /// Outcome for a turn whose task died before producing a result.
    pub fn interrupted(session: u64, reason: impl Into<String>) -> Self {
        Self {
            session,
            result: Err(CompletionError::Interrupted(reason.into())),
        }
    }
}

pub struct ChatController {
    store: Box<dyn CredentialStore>,
    client: CompletionClient,
    conversation: Conversation,
    loading: bool,
    // Bumped on credential reset so late replies from the old session are dropped.
    session: u64,
    notices: Vec<Notice>,
    scroll_requested: bool,
}

impl ChatController {
    pub fn new(store: Box<dyn CredentialStore>, client: CompletionClient) -> Self {
        Self {
            store,
            client,
            conversation: Conversation::new(),
            loading: false,
            session: 0,
            notices: Vec::new(),
            scroll_requested: false,
        }
    }

    pub fn view(&self) -> View {
        if self.store.read().is_some() {
            View::Conversation
        } else {
            View::CredentialEntry
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Stores a new credential. Blank input is ignored and leaves the view unchanged.
    pub fn submit_credential(&mut self, text: &str) -> Result<()> {
        let credential = text.trim();
        if credential.is_empty() {
            return Ok(());
        }
        self.store.write(credential)
    }

    /// Clears the credential and drops the in-memory conversation.
    pub fn reset_credential(&mut self) -> Result<()> {
        self.store.clear()?;
        self.conversation = Conversation::new();
        self.session += 1;
        self.scroll_requested = true;
        tracing::info!(session = self.session, "credential reset, conversation discarded");
        Ok(())
    }

    /// Guards, flips loading on and appends the user message. Returns the
    /// request to run, or `None` when the send was refused.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingTurn> {
        let Some(credential) = self.store.read() else {
            tracing::warn!("send attempted without a stored credential");
            self.notices.push(Notice::CredentialRequired);
            return None;
        };

        if self.loading {
            tracing::warn!("send ignored, a request is already in flight");
            return None;
        }

        if text.trim().is_empty() {
            return None;
        }

        self.loading = true;
        let history = self.conversation.messages().to_vec();
        self.conversation.push(Message::user(text));
        self.scroll_requested = true;

        Some(PendingTurn {
            session: self.session,
            client: self.client.clone(),
            history,
            text: text.to_string(),
            credential,
        })
    }

    /// Applies a finished request. Always clears the loading flag.
    pub fn finish_send(&mut self, outcome: TurnOutcome) {
        self.loading = false;

        if outcome.session != self.session || self.store.read().is_none() {
            tracing::info!(
                turn_session = outcome.session,
                current_session = self.session,
                "discarding reply for a reset session"
            );
            return;
        }

        match outcome.result {
            Ok(reply) => {
                tracing::debug!(chars = reply.len(), "reply received");
                self.conversation.push(Message::bot(reply));
                self.scroll_requested = true;
            }
            Err(err) => {
                tracing::error!(error = %err, "completion request failed");
                self.notices.push(Notice::RequestFailed);
            }
        }
    }

    /// Runs a whole turn in place: begin, await the endpoint, finish.
    pub async fn send(&mut self, text: &str) {
        if let Some(turn) = self.begin_send(text) {
            let outcome = turn.run().await;
            self.finish_send(outcome);
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// True once after each conversation change.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}
