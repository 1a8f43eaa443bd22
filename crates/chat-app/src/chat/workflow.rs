use inkchat_llm::{GatewayError, SendId, StreamEvent, StreamEventPayload};

use crate::chat::message::{Conversation, Message, MessageId};

pub const UNKNOWN_ERROR_TEXT: &str = "An unknown error occurred.";
pub const NOT_INITIALIZED_TEXT: &str = "Chat is not initialized.";
pub const STARTUP_FAILURE_TEXT: &str = "Failed to initialize chat service.";

/// Why a submit did not start a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    Empty,
    Busy,
}

/// Bookkeeping for the send currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSend {
    pub placeholder_id: MessageId,
    send_id: Option<SendId>,
    accumulated: String,
    fragment_count: usize,
}

impl ActiveSend {
    fn new(placeholder_id: MessageId) -> Self {
        Self {
            placeholder_id,
            send_id: None,
            accumulated: String::new(),
            fragment_count: 0,
        }
    }

    fn accepts(&self, send_id: SendId) -> bool {
        self.send_id == Some(send_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendPhase {
    #[default]
    Idle,
    /// User message and placeholder appended, no fragment yet.
    Sending(ActiveSend),
    /// At least one fragment applied.
    Streaming(ActiveSend),
}

/// What the caller must hand to the gateway after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub placeholder_id: MessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Ignored,
    Done,
    Failed,
}

impl StepOutcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Drives one send at a time from submit to completion or failure.
///
/// The model message is always rewritten from a running accumulator, never by
/// appending a delta to whatever text the store currently holds.
#[derive(Debug, Default)]
pub struct SendWorkflow {
    phase: SendPhase,
    error: Option<String>,
}

impl SendWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SendPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, SendPhase::Idle)
    }

    /// The banner text, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Shows `message` verbatim in the banner, replacing any previous one.
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Banner for a session that could not be created at startup.
    pub fn report_startup_failure(&mut self, description: &str) {
        let description = description.trim();
        if description.is_empty() {
            self.report_error(STARTUP_FAILURE_TEXT);
        } else {
            self.report_error(description);
        }
    }

    pub fn begin(
        &mut self,
        conversation: &mut Conversation,
        input: &str,
    ) -> Result<OutgoingMessage, SubmitRejection> {
        if self.is_busy() {
            return Err(SubmitRejection::Busy);
        }

        let text = input.trim();
        if text.is_empty() {
            return Err(SubmitRejection::Empty);
        }

        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        conversation.append(Message::user(text));
        conversation.append(placeholder);

        self.error = None;
        self.phase = SendPhase::Sending(ActiveSend::new(placeholder_id));

        Ok(OutgoingMessage {
            text: text.to_string(),
            placeholder_id,
        })
    }

    /// Binds the active send to the gateway's id; events for other ids are ignored.
    pub fn attach(&mut self, send_id: SendId) {
        match &mut self.phase {
            SendPhase::Sending(active) | SendPhase::Streaming(active) => {
                active.send_id = Some(send_id);
            }
            SendPhase::Idle => {
                tracing::warn!(send_id = ?send_id, "attach called without an active send");
            }
        }
    }

    pub fn apply_event(
        &mut self,
        conversation: &mut Conversation,
        event: StreamEvent,
    ) -> StepOutcome {
        let accepted = match &self.phase {
            SendPhase::Sending(active) | SendPhase::Streaming(active) => {
                active.accepts(event.send_id)
            }
            SendPhase::Idle => false,
        };

        if !accepted {
            tracing::debug!(send_id = ?event.send_id, "dropping event for an inactive send");
            return StepOutcome::Ignored;
        }

        match event.payload {
            StreamEventPayload::Fragment(text) => self.apply_fragment(conversation, &text),
            StreamEventPayload::Done => self.finish(),
            StreamEventPayload::Failed(failure) => self.fail(conversation, &failure.message),
        }
    }

    /// Aborts the active send: the placeholder (or partial answer) is removed and
    /// the banner shows `description`.
    pub fn fail(&mut self, conversation: &mut Conversation, description: &str) -> StepOutcome {
        let active = match std::mem::take(&mut self.phase) {
            SendPhase::Sending(active) | SendPhase::Streaming(active) => active,
            SendPhase::Idle => return StepOutcome::Ignored,
        };

        if let Err(error) = conversation.remove(active.placeholder_id) {
            tracing::error!(error = %error, "failed send lost its placeholder");
        }

        let description = description.trim();
        let description = if description.is_empty() {
            UNKNOWN_ERROR_TEXT
        } else {
            description
        };
        tracing::warn!(
            send_id = ?active.send_id,
            fragment_count = active.fragment_count,
            error = %description,
            "send failed"
        );
        self.error = Some(format!("Error: {description}"));

        StepOutcome::Failed
    }

    /// Called when the event channel closes. A send still active at that point
    /// never got its terminal event and is failed.
    pub fn stream_closed(
        &mut self,
        conversation: &mut Conversation,
        send_id: SendId,
    ) -> StepOutcome {
        let still_active = match &self.phase {
            SendPhase::Sending(active) | SendPhase::Streaming(active) => active.accepts(send_id),
            SendPhase::Idle => false,
        };

        if !still_active {
            return StepOutcome::Ignored;
        }

        let error = GatewayError::StreamInterrupted {
            stage: "stream-reader-closed",
        };
        self.fail(conversation, &error.to_string())
    }

    fn apply_fragment(&mut self, conversation: &mut Conversation, text: &str) -> StepOutcome {
        let mut active = match std::mem::take(&mut self.phase) {
            SendPhase::Sending(active) | SendPhase::Streaming(active) => active,
            SendPhase::Idle => return StepOutcome::Ignored,
        };

        active.accumulated.push_str(text);
        active.fragment_count += 1;

        // On the first fragment the accumulator equals the fragment, which also
        // discards the placeholder sentinel.
        let text = active.accumulated.clone();
        if let Err(error) = conversation.replace_text(active.placeholder_id, text) {
            tracing::error!(error = %error, "streaming target vanished from the conversation");
        }

        self.phase = SendPhase::Streaming(active);
        StepOutcome::Applied
    }

    fn finish(&mut self) -> StepOutcome {
        if let SendPhase::Sending(active) | SendPhase::Streaming(active) = &self.phase {
            tracing::debug!(
                send_id = ?active.send_id,
                fragment_count = active.fragment_count,
                response_len = active.accumulated.len(),
                "send completed"
            );
        }

        self.phase = SendPhase::Idle;
        StepOutcome::Done
    }
}
