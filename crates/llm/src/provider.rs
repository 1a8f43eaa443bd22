use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};

use crate::error::{ErrorKind, GatewayError, GatewayResult};

/// Identifier for one send; changes on every submit so stale events can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendId(pub u64);

impl SendId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Speaker role at the provider boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMessage {
    pub role: Role,
    pub content: String,
}

impl ProviderMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub send_id: SendId,
    pub model_id: String,
    pub messages: Vec<ProviderMessage>,
    pub preamble: Option<String>,
}

impl StreamRequest {
    pub fn new(
        send_id: SendId,
        model_id: impl Into<String>,
        messages: Vec<ProviderMessage>,
    ) -> Self {
        Self {
            send_id,
            model_id: model_id.into(),
            messages,
            preamble: None,
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }
}

/// Terminal failure carried on the event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl StreamFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&GatewayError> for StreamFailure {
    fn from(error: &GatewayError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventPayload {
    Fragment(String),
    Done,
    Failed(StreamFailure),
}

impl StreamEventPayload {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub send_id: SendId,
    pub payload: StreamEventPayload,
}

impl StreamEvent {
    pub fn fragment(send_id: SendId, text: impl Into<String>) -> Self {
        Self {
            send_id,
            payload: StreamEventPayload::Fragment(text.into()),
        }
    }

    pub fn done(send_id: SendId) -> Self {
        Self {
            send_id,
            payload: StreamEventPayload::Done,
        }
    }

    pub fn failed(send_id: SendId, failure: StreamFailure) -> Self {
        Self {
            send_id,
            payload: StreamEventPayload::Failed(failure),
        }
    }
}

pub type ProviderWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Single-consumer receiving end of one send.
pub struct ProviderEventStream {
    send_id: SendId,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// A send in flight: `worker` performs the I/O and must be driven on tokio,
/// `stream` yields its events in arrival order.
pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
    pub worker: ProviderWorker,
}

impl ProviderEventStream {
    pub(crate) fn new(
        send_id: SendId,
        events: mpsc::UnboundedReceiver<StreamEvent>,
        cancel_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            send_id,
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub fn send_id(&self) -> SendId {
        self.send_id
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for ProviderEventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn stream_chat(&self, request: StreamRequest) -> GatewayResult<ProviderStreamHandle>;
}

pub fn make_event_stream(
    send_id: SendId,
) -> (
    mpsc::UnboundedSender<StreamEvent>,
    ProviderEventStream,
    oneshot::Receiver<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (
        event_tx,
        ProviderEventStream::new(send_id, event_rx, cancel_tx),
        cancel_rx,
    )
}
