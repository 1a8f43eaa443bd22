#![deny(unsafe_code)]

/// Single-window chat client for Gemini, styled for e-ink readers.
pub mod app;
/// Conversation state, send workflow and the chat widgets.
pub mod chat;
pub mod palette;
