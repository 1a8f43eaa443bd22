use rig::completion::CompletionError;
use snafu::Snafu;

/// Coarse failure classes surfaced to the chat workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or unusable credentials at startup.
    Configuration,
    /// Network, HTTP or request construction failure.
    Transport,
    /// The service or model rejected or aborted the request.
    Remote,
    /// The caller broke the gateway contract.
    Contract,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GatewayError {
    #[snafu(display("API_KEY environment variable not set"))]
    MissingApiKey { stage: &'static str },
    #[snafu(display("failed to load gateway configuration on `{stage}`: {source}"))]
    LoadConfig {
        stage: &'static str,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: rig::http_client::Error,
    },
    #[snafu(display("refusing to send an empty message"))]
    EmptyPrompt { stage: &'static str },
    // The banner shows this text verbatim, so keep the provider's own wording.
    #[snafu(display("{source}"))]
    CompletionsFailed {
        stage: &'static str,
        source: CompletionError,
    },
    #[snafu(display("the response stream ended before the model finished responding"))]
    StreamInterrupted { stage: &'static str },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingApiKey { .. } | Self::LoadConfig { .. } | Self::HttpClient { .. } => {
                ErrorKind::Configuration
            }
            Self::EmptyPrompt { .. } => ErrorKind::Contract,
            Self::CompletionsFailed { source, .. } => completion_error_kind(source),
            Self::StreamInterrupted { .. } => ErrorKind::Transport,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingApiKey { stage }
            | Self::LoadConfig { stage, .. }
            | Self::HttpClient { stage, .. }
            | Self::EmptyPrompt { stage }
            | Self::CompletionsFailed { stage, .. }
            | Self::StreamInterrupted { stage } => stage,
        }
    }
}

/// Splits rig completion failures into wire-level and service-level problems.
pub fn completion_error_kind(error: &CompletionError) -> ErrorKind {
    match error {
        CompletionError::HttpError(_) | CompletionError::RequestError(_) => ErrorKind::Transport,
        _ => ErrorKind::Remote,
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
