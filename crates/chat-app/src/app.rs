use gpui::*;
use gpui_component::{h_flex, label::Label, v_flex};
use inkchat_llm::{ChatSession, GatewayError};

use crate::chat::ChatView;
use crate::palette;

pub const APP_TITLE: &str = "Gemini for Kindle";

/// Root layout: a title header above the chat view.
pub struct ChatAppShell {
    chat_view: Entity<ChatView>,
}

impl ChatAppShell {
    pub fn new(
        session: Result<ChatSession, GatewayError>,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Self {
        let chat_view = cx.new(|cx| ChatView::new(session, window, cx));

        Self { chat_view }
    }
}

impl Render for ChatAppShell {
    fn render(&mut self, _window: &mut Window, _cx: &mut Context<Self>) -> impl IntoElement {
        v_flex()
            .size_full()
            .bg(palette::paper())
            .text_color(palette::ink())
            .child(
                h_flex()
                    .id("app-header")
                    .flex_shrink_0()
                    .w_full()
                    .justify_center()
                    .p_3()
                    .border_b_1()
                    .border_color(palette::rule())
                    .child(
                        Label::new(APP_TITLE)
                            .text_xl()
                            .font_weight(FontWeight::BOLD),
                    ),
            )
            .child(
                v_flex()
                    .id("main-content")
                    .flex_1()
                    .w_full()
                    .min_h_0()
                    .overflow_hidden()
                    .child(self.chat_view.clone()),
            )
    }
}
