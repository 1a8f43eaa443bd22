use std::sync::Arc;

use gpui::*;
use gpui_component::{h_flex, label::Label, text::TextView, v_flex};

use crate::chat::markdown::hard_line_breaks;
use crate::chat::message::{Message, Role};
use crate::chat::scroll_manager::ScrollManager;
use crate::palette;

const BUBBLE_MAX_WIDTH: f32 = 0.9;

/// Scrolling column of chat bubbles, always showing the newest one.
pub struct MessageList {
    messages: Arc<Vec<Message>>,
    scroll_manager: ScrollManager,
}

impl MessageList {
    pub fn new(_cx: &mut Context<Self>) -> Self {
        Self {
            messages: Arc::new(Vec::new()),
            scroll_manager: ScrollManager::new(),
        }
    }

    pub fn set_messages(&mut self, messages: Arc<Vec<Message>>, cx: &mut Context<Self>) {
        if !snapshot_changed(&self.messages, &messages) {
            return;
        }

        self.messages = messages;
        self.scroll_manager.follow_tail(self.messages.len());
        cx.notify();
    }
}

impl Render for MessageList {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        v_flex()
            .id("message-list")
            .size_full()
            .overflow_y_scroll()
            .track_scroll(self.scroll_manager.handle())
            .px_4()
            .py_3()
            .gap_4()
            .children(self.messages.iter().map(bubble_row))
            // Tail anchor; must stay the last child.
            .child(div().id("message-list-tail").w_full().h(px(0.)))
    }
}

/// Every store mutation publishes a new vector, so pointer identity is enough.
fn snapshot_changed(current: &Arc<Vec<Message>>, next: &Arc<Vec<Message>>) -> bool {
    !Arc::ptr_eq(current, next)
}

fn bubble_row(message: &Message) -> AnyElement {
    let bubble = div()
        .max_w(relative(BUBBLE_MAX_WIDTH))
        .p_3()
        .rounded_lg()
        .border_1()
        .border_color(palette::bubble_border())
        .bg(palette::bubble())
        .text_color(palette::ink())
        .text_lg();

    match message.role {
        // Literal text, no markup.
        Role::User => h_flex()
            .w_full()
            .justify_end()
            .child(bubble.child(Label::new(message.text.clone())))
            .into_any_element(),
        Role::Model => {
            let id = ElementId::Name(format!("model-markdown-{}", message.id).into());
            let body = TextView::markdown(id, hard_line_breaks(&message.text)).selectable(true);

            h_flex()
                .w_full()
                .justify_start()
                .child(bubble.child(body))
                .into_any_element()
        }
    }
}
