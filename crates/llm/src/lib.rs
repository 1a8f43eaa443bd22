use std::sync::Arc;

mod config;
mod error;
mod gemini;
mod provider;
mod session;

pub use config::{API_KEY_ENV, DEFAULT_GEMINI_MODEL, GatewayConfig, SYSTEM_INSTRUCTION};
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use gemini::{GEMINI_PROVIDER_ID, GeminiProvider};
pub use provider::{
    LlmProvider, ProviderEventStream, ProviderMessage, ProviderStreamHandle, ProviderWorker,
    Role, SendId, StreamEvent, StreamEventPayload, StreamFailure, StreamRequest,
    make_event_stream,
};
pub use session::ChatSession;

/// Opens the single chat session backed by Gemini.
///
/// Call this at startup: a missing or unusable credential is reported here, not on
/// the first send.
pub fn create_session(config: &GatewayConfig) -> GatewayResult<ChatSession> {
    let provider = GeminiProvider::new(config)?;
    tracing::info!(
        provider = %provider.name(),
        model_id = %config.model_id,
        "chat session created"
    );
    Ok(ChatSession::new(Arc::new(provider), config))
}
