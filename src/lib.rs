pub mod app;
pub mod completion;
pub mod config;
pub mod controller;
pub mod credential;
pub mod handler;
pub mod input;
pub mod render;
pub mod state;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use completion::{ChatEndpoint, CompletionClient, CompletionError, GroqEndpoint, FALLBACK_REPLY};
pub use config::Config;
pub use controller::{ChatController, Notice, View};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use state::{Conversation, Message};
