use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::controller::{ChatController, Notice, TurnOutcome, View};
use crate::input::ChatInput;

/// How many ticks a toast stays on screen.
const TOAST_TICKS: u8 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub ticks_left: u8,
}

impl From<Notice> for Toast {
    fn from(notice: Notice) -> Self {
        Self {
            title: notice.title().to_string(),
            description: notice.description().to_string(),
            ticks_left: TOAST_TICKS,
        }
    }
}

/// The completion call currently running on a tokio task.
struct PendingRequest {
    session: u64,
    handle: JoinHandle<TurnOutcome>,
}

pub struct App {
    pub should_quit: bool,
    pub controller: ChatController,

    // Inputs
    pub input: ChatInput,
    pub credential_input: ChatInput,

    // Chat scroll state
    pub chat_scroll: u16,
    pub max_chat_scroll: u16,
    pub follow_tail: bool,

    // Notification shown over the page
    pub toast: Option<Toast>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Chat area for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    pending: Option<PendingRequest>,
}

impl App {
    pub fn new(controller: ChatController) -> Self {
        Self {
            should_quit: false,
            controller,
            input: ChatInput::new(),
            credential_input: ChatInput::single_line(),
            chat_scroll: 0,
            max_chat_scroll: 0,
            follow_tail: true,
            toast: None,
            animation_frame: 0,
            chat_area: None,
            pending: None,
        }
    }

    pub fn view(&self) -> View {
        self.controller.view()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    /// Starts a turn and spawns its completion call.
    pub fn send(&mut self, text: &str) {
        if let Some(turn) = self.controller.begin_send(text) {
            let session = turn.session();
            let handle = tokio::spawn(turn.run());
            self.pending = Some(PendingRequest { session, handle });
        }
        self.sync();
    }

    /// Applies the outstanding request's result once its task has finished.
    pub async fn poll_pending(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .map(|p| p.handle.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(PendingRequest { session, handle }) = self.pending.take() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => TurnOutcome::interrupted(session, err.to_string()),
            };
            self.controller.finish_send(outcome);
            self.sync();
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn submit_credential(&mut self, text: &str) {
        if let Err(err) = self.controller.submit_credential(text) {
            tracing::error!(error = %err, "failed to store credential");
            self.show_error(format!("Could not save API key: {err}"));
        }
        self.sync();
    }

    pub fn reset_credential(&mut self) {
        if let Err(err) = self.controller.reset_credential() {
            tracing::error!(error = %err, "failed to clear credential");
            self.show_error(format!("Could not clear API key: {err}"));
        }
        self.input.clear();
        self.credential_input.clear();
        self.chat_scroll = 0;
        self.sync();
    }

    fn show_error(&mut self, description: String) {
        self.toast = Some(Toast {
            title: "Error".to_string(),
            description,
            ticks_left: TOAST_TICKS,
        });
    }

    /// Pulls controller side effects into view state.
    fn sync(&mut self) {
        self.input.set_disabled(self.controller.is_loading());
        if let Some(notice) = self.controller.take_notices().pop() {
            self.toast = Some(notice.into());
        }
        if self.controller.take_scroll_request() {
            self.follow_tail = true;
        }
    }

    pub fn dismiss_toast(&mut self) {
        self.toast = None;
    }

    /// Tick animation frame and toast timeout (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if let Some(toast) = self.toast.as_mut() {
            toast.ticks_left = toast.ticks_left.saturating_sub(1);
            if toast.ticks_left == 0 {
                self.toast = None;
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_chat_scroll);
        if self.chat_scroll == self.max_chat_scroll {
            self.follow_tail = true;
        }
    }

    /// Called during render with the wrapped height of the chat and its viewport.
    pub fn update_scroll_bounds(&mut self, content_height: u16, viewport_height: u16) {
        self.max_chat_scroll = content_height.saturating_sub(viewport_height);
        if self.follow_tail {
            self.chat_scroll = self.max_chat_scroll;
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_chat_scroll);
        }
    }
}
