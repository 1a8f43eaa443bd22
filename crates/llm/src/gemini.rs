use futures::StreamExt;
use rig::completion::{CompletionModel, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use rig::streaming::StreamedAssistantContent;
use snafu::{ResultExt, ensure};
use tokio::sync::{mpsc, oneshot};

use crate::config::GatewayConfig;
use crate::error::{
    CompletionsFailedSnafu, EmptyPromptSnafu, GatewayError, GatewayResult, HttpClientSnafu,
    MissingApiKeySnafu,
};
use crate::provider::{
    LlmProvider, ProviderMessage, ProviderStreamHandle, ProviderWorker, Role, SendId,
    StreamEvent, StreamFailure, StreamRequest, make_event_stream,
};

pub const GEMINI_PROVIDER_ID: &str = "gemini";

type GeminiStreamingResponse =
    rig::streaming::StreamingCompletionResponse<gemini::streaming::StreamingCompletionResponse>;

/// Streams chat completions from Google Gemini through rig.
pub struct GeminiProvider {
    client: gemini::Client,
}

impl GeminiProvider {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        ensure!(
            !config.api_key.trim().is_empty(),
            MissingApiKeySnafu {
                stage: "gemini-provider-new",
            }
        );

        // Build eagerly so credential problems surface at startup rather than on first send.
        let client = gemini::Client::builder()
            .api_key(config.api_key.as_str())
            .build()
            .context(HttpClientSnafu {
                stage: "build-client",
            })?;

        Ok(Self { client })
    }

    fn to_rig_message(message: &ProviderMessage) -> RigMessage {
        match message.role {
            Role::User => RigMessage::user(message.content.clone()),
            Role::Assistant => RigMessage::assistant(message.content.clone()),
        }
    }

    async fn open_stream(
        client: &gemini::Client,
        request: &StreamRequest,
    ) -> GatewayResult<GeminiStreamingResponse> {
        let model = client.completion_model(request.model_id.clone());

        let mut messages = request
            .messages
            .iter()
            .map(Self::to_rig_message)
            .collect::<Vec<_>>();

        let Some(prompt) = messages.pop() else {
            tracing::error!(
                send_id = ?request.send_id,
                model_id = %request.model_id,
                "stream request reached the provider without a prompt"
            );
            return EmptyPromptSnafu {
                stage: "open-stream-pop-prompt",
            }
            .fail();
        };

        let mut builder = model.completion_request(prompt).messages(messages);
        if let Some(preamble) = &request.preamble
            && !preamble.trim().is_empty()
        {
            builder = builder.preamble(preamble.clone());
        }

        builder.stream().await.context(CompletionsFailedSnafu {
            stage: "open-stream",
        })
    }

    fn emit_failure(
        event_tx: &mpsc::UnboundedSender<StreamEvent>,
        send_id: SendId,
        error: &GatewayError,
    ) {
        let _ = event_tx.send(StreamEvent::failed(send_id, StreamFailure::from(error)));
    }

    fn map_stream_item<R>(
        send_id: SendId,
        item: StreamedAssistantContent<R>,
    ) -> Option<StreamEvent>
    where
        R: Clone + Unpin,
    {
        match item {
            StreamedAssistantContent::Text(text) if !text.text.is_empty() => {
                Some(StreamEvent::fragment(send_id, text.text))
            }
            // Reasoning, tool calls and the final usage record never reach the page.
            _ => None,
        }
    }

    async fn run_stream_worker(
        client: gemini::Client,
        request: StreamRequest,
        event_tx: mpsc::UnboundedSender<StreamEvent>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let send_id = request.send_id;
        let mut stream = match Self::open_stream(&client, &request).await {
            Ok(stream) => stream,
            Err(error) => {
                tracing::error!(
                    send_id = ?send_id,
                    model_id = %request.model_id,
                    kind = ?error.kind(),
                    error = %error,
                    "failed to open gemini stream"
                );
                Self::emit_failure(&event_tx, send_id, &error);
                return;
            }
        };

        let mut fragment_count = 0usize;

        loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    tracing::debug!(send_id = ?send_id, "gemini stream abandoned by consumer");
                    stream.cancel();
                    return;
                }
                next_item = stream.next() => {
                    match next_item {
                        Some(Ok(item)) => {
                            if let Some(event) = Self::map_stream_item(send_id, item) {
                                fragment_count += 1;
                                if event_tx.send(event).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(source)) => {
                            let error = GatewayError::CompletionsFailed {
                                stage: "stream-chunk",
                                source,
                            };
                            tracing::warn!(
                                send_id = ?send_id,
                                fragment_count,
                                kind = ?error.kind(),
                                error = %error,
                                "gemini stream failed mid-response"
                            );
                            Self::emit_failure(&event_tx, send_id, &error);
                            return;
                        }
                        None => break,
                    }
                }
            }
        }

        tracing::debug!(send_id = ?send_id, fragment_count, "gemini stream finished");
        let _ = event_tx.send(StreamEvent::done(send_id));
    }
}

impl LlmProvider for GeminiProvider {
    fn id(&self) -> &str {
        GEMINI_PROVIDER_ID
    }

    fn name(&self) -> &str {
        "Google Gemini"
    }

    fn stream_chat(&self, request: StreamRequest) -> GatewayResult<ProviderStreamHandle> {
        ensure!(
            !request.messages.is_empty(),
            EmptyPromptSnafu {
                stage: "stream-chat",
            }
        );

        let (event_tx, stream, cancel_rx) = make_event_stream(request.send_id);
        let worker: ProviderWorker = Box::pin(Self::run_stream_worker(
            self.client.clone(),
            request,
            event_tx,
            cancel_rx,
        ));

        Ok(ProviderStreamHandle { stream, worker })
    }
}
