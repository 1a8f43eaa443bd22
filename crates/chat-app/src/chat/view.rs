use gpui::prelude::FluentBuilder;
use gpui::*;
use gpui_component::{label::Label, v_flex};
use gpui_tokio_bridge::Tokio;
use inkchat_llm::{
    ChatSession, GatewayError, ProviderEventStream, ProviderStreamHandle, ProviderWorker, SendId,
    StreamEvent,
};

use crate::chat::events::Submit;
use crate::chat::message::Conversation;
use crate::chat::workflow::{NOT_INITIALIZED_TEXT, SendWorkflow, StepOutcome};
use crate::chat::{MessageInput, MessageList};
use crate::palette;

/// Coordinates the message list, the input box and the chat session.
pub struct ChatView {
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    session: Option<ChatSession>,
    conversation: Conversation,
    workflow: SendWorkflow,
    stream_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    stream_reader_task: Option<Task<()>>,
}

impl ChatView {
    /// `session` is the outcome of startup; a failure is shown as the banner and
    /// every later submit is refused.
    pub fn new(
        session: Result<ChatSession, GatewayError>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        let mut workflow = SendWorkflow::new();
        let session = match session {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::error!(
                    kind = ?error.kind(),
                    stage = error.stage(),
                    error = %error,
                    "chat session unavailable"
                );
                workflow.report_startup_failure(&error.to_string());
                None
            }
        };

        cx.subscribe(&message_input, |this, _, event: &Submit, cx| {
            this.handle_submit(event, cx);
        })
        .detach();

        let this = Self {
            message_list,
            message_input,
            session,
            conversation: Conversation::with_greeting(),
            workflow,
            stream_worker_task: None,
            stream_reader_task: None,
        };
        this.sync_messages(cx);
        this
    }

    fn handle_submit(&mut self, event: &Submit, cx: &mut Context<Self>) {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("submit received without a chat session");
            self.workflow.report_error(NOT_INITIALIZED_TEXT);
            cx.notify();
            return;
        };

        let outgoing = match self.workflow.begin(&mut self.conversation, &event.content) {
            Ok(outgoing) => outgoing,
            Err(rejection) => {
                tracing::debug!(rejection = ?rejection, "submit ignored");
                return;
            }
        };

        let send_result = session.send_streaming(&outgoing.text);

        self.set_busy(true, cx);
        self.sync_messages(cx);

        match send_result {
            Ok(handle) => {
                self.workflow.attach(handle.stream.send_id());
                self.spawn_stream_pipeline(handle, cx);
            }
            Err(error) => {
                tracing::error!(
                    kind = ?error.kind(),
                    stage = error.stage(),
                    error = %error,
                    "failed to open response stream"
                );
                let outcome = self.workflow.fail(&mut self.conversation, &error.to_string());
                self.after_step(outcome, cx);
            }
        }

        cx.notify();
    }

    fn spawn_stream_pipeline(&mut self, handle: ProviderStreamHandle, cx: &mut Context<Self>) {
        self.spawn_stream_worker(handle.worker, cx);
        self.spawn_stream_reader(handle.stream, cx);
    }

    fn spawn_stream_worker(&mut self, worker: ProviderWorker, cx: &mut Context<Self>) {
        self.stream_worker_task = Some(Tokio::spawn(cx, worker));
    }

    fn spawn_stream_reader(&mut self, mut stream: ProviderEventStream, cx: &mut Context<Self>) {
        let send_id = stream.send_id();

        self.stream_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = stream.recv().await {
                let _ = this.update(cx, |this, cx| {
                    this.handle_stream_event(event, cx);
                });
            }

            let _ = this.update(cx, |this, cx| {
                this.handle_stream_reader_closed(send_id, cx);
            });
        }));
    }

    fn handle_stream_event(&mut self, event: StreamEvent, cx: &mut Context<Self>) {
        let outcome = self.workflow.apply_event(&mut self.conversation, event);
        self.after_step(outcome, cx);
    }

    fn handle_stream_reader_closed(&mut self, send_id: SendId, cx: &mut Context<Self>) {
        let outcome = self.workflow.stream_closed(&mut self.conversation, send_id);
        self.after_step(outcome, cx);

        // A newer send owns the task slots once one has started.
        if !self.workflow.is_busy() {
            self.stream_worker_task = None;
            self.stream_reader_task = None;
        }
    }

    fn after_step(&mut self, outcome: StepOutcome, cx: &mut Context<Self>) {
        if outcome == StepOutcome::Ignored {
            return;
        }

        self.sync_messages(cx);
        if outcome.is_terminal() {
            self.set_busy(false, cx);
        }
        cx.notify();
    }

    fn set_busy(&self, busy: bool, cx: &mut Context<Self>) {
        self.message_input.update(cx, |input, cx| {
            input.set_busy(busy, cx);
        });
    }

    fn sync_messages(&self, cx: &mut Context<Self>) {
        let snapshot = self.conversation.snapshot();
        self.message_list.update(cx, |list, cx| {
            list.set_messages(snapshot, cx);
        });
    }

    fn render_error_banner(&self, error: &str) -> impl IntoElement {
        v_flex()
            .id("chat-view-error")
            .flex_shrink_0()
            .mx_4()
            .mb_2()
            .p_4()
            .gap_1()
            .border_l_4()
            .border_color(palette::error_accent())
            .bg(palette::error_background())
            .text_color(palette::error_text())
            .child(Label::new("Error").font_weight(FontWeight::BOLD))
            .child(Label::new(error.to_string()))
    }
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        let error = self.workflow.error().map(str::to_string);

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(palette::paper())
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .when_some(error, |view, error| {
                view.child(self.render_error_banner(&error))
            })
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(palette::rule())
                    .child(self.message_input.clone()),
            )
    }
}
