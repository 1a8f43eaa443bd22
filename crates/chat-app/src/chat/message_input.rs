use gpui::*;
use gpui_component::{
    ActiveTheme, Disableable, IconName,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
};

use crate::chat::events::Submit;

pub const INPUT_PLACEHOLDER: &str = "Type your message...";
/// `auto_grow` needs a ceiling; this one is never reached by a chat prompt.
const MAX_INPUT_ROWS: usize = 10_000;

/// What a `PressEnter` from the text box should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnterAction {
    Submit,
    KeepEditing,
}

/// Tells a plain Enter apart from the one the input reports after Shift+Enter.
///
/// Shift+Enter inserts its newline from the key-down handler, and the input
/// still raises `PressEnter` for the same key press afterwards.
#[derive(Debug, Default)]
struct EnterTracker {
    newline_inserted: bool,
}

impl EnterTracker {
    fn shift_enter(&mut self) {
        self.newline_inserted = true;
    }

    fn press_enter(&mut self, secondary: bool) -> EnterAction {
        let newline_inserted = std::mem::take(&mut self.newline_inserted);
        if secondary || newline_inserted {
            EnterAction::KeepEditing
        } else {
            EnterAction::Submit
        }
    }

    fn reset(&mut self) {
        self.newline_inserted = false;
    }
}

/// Text to send for the current draft, or `None` when it is blank.
///
/// A plain Enter has already put a newline at the end of the draft by the time
/// it is reported; that newline is not part of the message.
fn outgoing_text(draft: &str) -> Option<String> {
    let text = draft.strip_suffix('\n').unwrap_or(draft).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Prompt box plus Send button. Both go inert while a reply is streaming.
pub struct MessageInput {
    editor: Entity<InputState>,
    enter: EnterTracker,
    is_busy: bool,
}

impl EventEmitter<Submit> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let editor = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder(INPUT_PLACEHOLDER)
                .auto_grow(1, MAX_INPUT_ROWS)
        });

        cx.subscribe_in(&editor, window, |this, _, event: &InputEvent, window, cx| {
            if let InputEvent::PressEnter { secondary } = event
                && this.enter.press_enter(*secondary) == EnterAction::Submit
            {
                this.submit(window, cx);
            }
        })
        .detach();

        Self {
            editor,
            enter: EnterTracker::default(),
            is_busy: false,
        }
    }

    pub fn set_busy(&mut self, busy: bool, cx: &mut Context<Self>) {
        self.is_busy = busy;
        self.enter.reset();
        cx.notify();
    }

    fn insert_newline(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_busy {
            return;
        }

        self.enter.shift_enter();
        self.editor.update(cx, |editor, cx| editor.insert("\n", window, cx));
    }

    fn submit(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        if self.is_busy {
            return;
        }

        let draft = self.editor.read(cx).value().to_string();
        let outgoing = outgoing_text(&draft);
        let remaining = match &outgoing {
            Some(_) => String::new(),
            None => draft.strip_suffix('\n').unwrap_or(&draft).to_string(),
        };

        self.editor
            .update(cx, |editor, cx| editor.set_value(remaining, window, cx));
        self.enter.reset();

        if let Some(text) = outgoing {
            cx.emit(Submit::new(text));
        }
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        let editor = div()
            .flex_1()
            .min_w_0()
            .px_3()
            .py_2()
            .rounded_xl()
            .border_1()
            .border_color(theme.border)
            .bg(theme.muted)
            .on_key_down(cx.listener(|this, event: &KeyDownEvent, window, cx| {
                let keystroke = &event.keystroke;
                if keystroke.key == "enter" && keystroke.modifiers.shift {
                    this.insert_newline(window, cx);
                }
            }))
            .child(Input::new(&self.editor).w_full().disabled(self.is_busy));

        let send = Button::new("send")
            .primary()
            .icon(IconName::ArrowUp)
            .child("Send")
            .disabled(self.is_busy)
            .on_click(cx.listener(|this, _, window, cx| this.submit(window, cx)));

        h_flex()
            .w_full()
            .items_end()
            .gap_2()
            .p_2()
            .bg(theme.background)
            .child(editor)
            .child(send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_enter_submits() {
        let mut enter = EnterTracker::default();

        assert_eq!(enter.press_enter(false), EnterAction::Submit);
    }

    #[test]
    fn shift_enter_only_swallows_its_own_press() {
        let mut enter = EnterTracker::default();

        enter.shift_enter();
        assert_eq!(enter.press_enter(false), EnterAction::KeepEditing);
        assert_eq!(enter.press_enter(false), EnterAction::Submit);
    }

    #[test]
    fn secondary_enter_never_submits() {
        let mut enter = EnterTracker::default();

        assert_eq!(enter.press_enter(true), EnterAction::KeepEditing);
    }

    #[test]
    fn reset_forgets_a_pending_shift_enter() {
        let mut enter = EnterTracker::default();
        enter.shift_enter();

        enter.reset();

        assert_eq!(enter.press_enter(false), EnterAction::Submit);
    }

    #[test]
    fn outgoing_text_drops_the_enter_newline_and_outer_whitespace() {
        assert_eq!(outgoing_text("  hello\n"), Some("hello".to_string()));
        assert_eq!(
            outgoing_text("line one\nline two\n"),
            Some("line one\nline two".to_string())
        );
    }

    #[test]
    fn blank_drafts_send_nothing() {
        assert_eq!(outgoing_text(""), None);
        assert_eq!(outgoing_text("\n"), None);
        assert_eq!(outgoing_text(" \n\t\n"), None);
    }
}
