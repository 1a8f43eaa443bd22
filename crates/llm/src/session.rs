use std::sync::Arc;

use arc_swap::ArcSwap;
use snafu::ensure;
use tokio::sync::{mpsc, oneshot};

use crate::config::GatewayConfig;
use crate::error::{EmptyPromptSnafu, GatewayResult};
use crate::provider::{
    LlmProvider, ProviderMessage, ProviderStreamHandle, ProviderWorker, Role, SendId,
    StreamEvent, StreamEventPayload, StreamRequest, make_event_stream,
};

/// The one conversation held with the remote model.
///
/// Completed turns are kept here and replayed on every request, so the model sees
/// the whole exchange. A turn is only recorded once its stream finishes cleanly.
pub struct ChatSession {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
    system_instruction: String,
    history: Arc<ArcSwap<Vec<ProviderMessage>>>,
    next_send_id: u64,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &GatewayConfig) -> Self {
        Self {
            provider,
            model_id: config.model_id.clone(),
            system_instruction: config.system_instruction.clone(),
            history: Arc::new(ArcSwap::from_pointee(Vec::new())),
            next_send_id: 1,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Completed turns, oldest first.
    pub fn history(&self) -> Arc<Vec<ProviderMessage>> {
        self.history.load_full()
    }

    /// Submits `user_text` and returns the handle for its response stream.
    ///
    /// The returned worker relays provider events unchanged and appends the
    /// user/model pair to the history right before forwarding `Done`.
    pub fn send_streaming(&mut self, user_text: &str) -> GatewayResult<ProviderStreamHandle> {
        ensure!(
            !user_text.trim().is_empty(),
            EmptyPromptSnafu {
                stage: "send-streaming",
            }
        );

        let send_id = self.alloc_send_id();
        let user_turn = ProviderMessage::new(Role::User, user_text);

        let mut messages = Vec::clone(&self.history.load());
        messages.push(user_turn.clone());

        let request = StreamRequest::new(send_id, self.model_id.clone(), messages)
            .with_preamble(self.system_instruction.clone());

        tracing::debug!(
            send_id = ?send_id,
            provider = %self.provider.id(),
            model_id = %self.model_id,
            history_len = self.history.load().len(),
            "opening response stream"
        );

        let upstream = self.provider.stream_chat(request)?;
        let (event_tx, stream, cancel_rx) = make_event_stream(send_id);
        let worker: ProviderWorker = Box::pin(relay_and_record(
            upstream,
            self.history.clone(),
            user_turn,
            event_tx,
            cancel_rx,
        ));

        Ok(ProviderStreamHandle { stream, worker })
    }

    fn alloc_send_id(&mut self) -> SendId {
        let id = SendId::new(self.next_send_id);
        self.next_send_id = self.next_send_id.saturating_add(1);
        id
    }
}

async fn relay_and_record(
    upstream: ProviderStreamHandle,
    history: Arc<ArcSwap<Vec<ProviderMessage>>>,
    user_turn: ProviderMessage,
    event_tx: mpsc::UnboundedSender<StreamEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let ProviderStreamHandle {
        stream: mut upstream_events,
        worker,
    } = upstream;

    let relay = async move {
        let mut response = String::new();

        loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    upstream_events.cancel();
                    return;
                }
                next_event = upstream_events.recv() => {
                    let Some(event) = next_event else {
                        return;
                    };

                    match &event.payload {
                        StreamEventPayload::Fragment(text) => response.push_str(text),
                        // Gemini rejects empty text parts, so a blank reply is never replayed.
                        StreamEventPayload::Done if response.trim().is_empty() => {
                            tracing::debug!(
                                send_id = ?event.send_id,
                                "empty reply left out of the history"
                            );
                        }
                        StreamEventPayload::Done => {
                            let model_turn =
                                ProviderMessage::new(Role::Assistant, response.clone());
                            history.rcu(|turns| {
                                let mut next = Vec::clone(turns);
                                next.push(user_turn.clone());
                                next.push(model_turn.clone());
                                next
                            });
                        }
                        StreamEventPayload::Failed(_) => {}
                    }

                    let terminal = event.payload.is_terminal();
                    if event_tx.send(event).is_err() || terminal {
                        return;
                    }
                }
            }
        }
    };

    futures::join!(worker, relay);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::StreamFailure;

    /// Replays a fixed script and records every request it receives.
    struct ScriptedProvider {
        script: Vec<StreamEventPayload>,
        requests: Mutex<Vec<StreamRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<StreamEventPayload>) -> Arc<Self> {
            Arc::new(Self {
                script,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<StreamRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted"
        }

        fn stream_chat(&self, request: StreamRequest) -> GatewayResult<ProviderStreamHandle> {
            let send_id = request.send_id;
            self.requests.lock().expect("requests lock").push(request);

            let (event_tx, stream, _cancel_rx) = make_event_stream(send_id);
            let script = self.script.clone();
            let worker: ProviderWorker = Box::pin(async move {
                for payload in script {
                    let _ = event_tx.send(StreamEvent { send_id, payload });
                }
            });

            Ok(ProviderStreamHandle { stream, worker })
        }
    }

    fn fragments(parts: &[&str]) -> Vec<StreamEventPayload> {
        parts
            .iter()
            .map(|part| StreamEventPayload::Fragment(part.to_string()))
            .collect()
    }

    async fn drain(handle: ProviderStreamHandle) -> Vec<StreamEventPayload> {
        let ProviderStreamHandle { mut stream, worker } = handle;
        let worker = tokio::spawn(worker);

        let mut received = Vec::new();
        while let Some(event) = stream.recv().await {
            received.push(event.payload);
        }

        worker.await.expect("worker completes");
        received
    }

    fn session_with(provider: Arc<ScriptedProvider>) -> ChatSession {
        let config = GatewayConfig {
            api_key: "test-key".to_string(),
            ..GatewayConfig::default()
        };
        ChatSession::new(provider, &config)
    }

    #[tokio::test]
    async fn successful_turn_is_recorded_and_replayed() {
        let mut script = fragments(&["Hel", "lo"]);
        script.push(StreamEventPayload::Done);
        let provider = ScriptedProvider::new(script);
        let mut session = session_with(provider.clone());

        let events = drain(session.send_streaming("hi").expect("send opens")).await;
        assert_eq!(events.last(), Some(&StreamEventPayload::Done));
        assert_eq!(
            session.history().as_slice(),
            &[
                ProviderMessage::new(Role::User, "hi"),
                ProviderMessage::new(Role::Assistant, "Hello"),
            ]
        );

        drain(session.send_streaming("again").expect("send opens")).await;
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[2], ProviderMessage::new(Role::User, "again"));
        assert_ne!(requests[0].send_id, requests[1].send_id);
        assert!(
            requests[0]
                .preamble
                .as_deref()
                .is_some_and(|preamble| preamble.contains("e-ink"))
        );
    }

    #[tokio::test]
    async fn failed_turn_is_not_recorded() {
        let mut script = fragments(&["partial"]);
        script.push(StreamEventPayload::Failed(StreamFailure::new(
            ErrorKind::Transport,
            "connection reset",
        )));
        let mut session = session_with(ScriptedProvider::new(script));

        let events = drain(session.send_streaming("hi").expect("send opens")).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], StreamEventPayload::Failed(_)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn events_after_a_terminal_event_are_dropped() {
        let mut script = fragments(&["a"]);
        script.push(StreamEventPayload::Done);
        script.extend(fragments(&["late"]));
        let mut session = session_with(ScriptedProvider::new(script));

        let events = drain(session.send_streaming("hi").expect("send opens")).await;

        assert_eq!(
            events,
            vec![
                StreamEventPayload::Fragment("a".to_string()),
                StreamEventPayload::Done,
            ]
        );
    }

    #[tokio::test]
    async fn empty_reply_is_not_replayed() {
        let provider = ScriptedProvider::new(vec![StreamEventPayload::Done]);
        let mut session = session_with(provider.clone());

        drain(session.send_streaming("first").expect("send opens")).await;
        drain(session.send_streaming("second").expect("send opens")).await;

        let requests = provider.requests();
        assert!(session.history().is_empty());
        assert_eq!(
            requests[1].messages,
            vec![ProviderMessage::new(Role::User, "second")]
        );
    }

    #[test]
    fn blank_text_never_reaches_the_provider() {
        let provider = ScriptedProvider::new(vec![StreamEventPayload::Done]);
        let mut session = session_with(provider.clone());

        let error = match session.send_streaming(" \n\t ") {
            Ok(_) => panic!("blank prompt must be rejected"),
            Err(error) => error,
        };

        assert_eq!(error.kind(), ErrorKind::Contract);
        assert!(provider.requests().is_empty());
    }
}
