use std::fmt;
use std::sync::Arc;

use snafu::{OptionExt, Snafu};
use uuid::Uuid;

/// Text shown in a model message until its first fragment arrives.
pub const PLACEHOLDER_TEXT: &str = "...";
pub const GREETING_TEXT: &str = "Hello! How can I help you today?";

/// Stable identifier for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new_v7(),
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    /// Model message standing in for a response that has not produced text yet.
    pub fn placeholder() -> Self {
        Self::model(PLACEHOLDER_TEXT)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConversationError {
    #[snafu(display("message '{id}' is not in the conversation"))]
    MessageNotFound { stage: &'static str, id: MessageId },
}

pub type ConversationResult<T> = Result<T, ConversationError>;

/// Ordered message list.
///
/// Every mutation publishes a fresh `Arc<Vec<Message>>`; snapshots handed out
/// earlier keep their contents, so a render pass never sees a half-applied update.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Arc<Vec<Message>>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: Arc::new(messages),
        }
    }

    /// Starts with the model's greeting, as every session does.
    pub fn with_greeting() -> Self {
        Self::new(vec![Message::model(GREETING_TEXT)])
    }

    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        self.messages.clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn append(&mut self, message: Message) {
        let mut next = Vec::with_capacity(self.messages.len() + 1);
        next.extend(self.messages.iter().cloned());
        next.push(message);
        self.messages = Arc::new(next);
    }

    pub fn replace_text(
        &mut self,
        id: MessageId,
        text: impl Into<String>,
    ) -> ConversationResult<()> {
        let index = self.position(id, "replace-text")?;
        let mut next = Vec::clone(&self.messages);
        next[index].text = text.into();
        self.messages = Arc::new(next);
        Ok(())
    }

    pub fn remove(&mut self, id: MessageId) -> ConversationResult<Message> {
        let index = self.position(id, "remove-message")?;
        let mut next = Vec::clone(&self.messages);
        let removed = next.remove(index);
        self.messages = Arc::new(next);
        Ok(removed)
    }

    fn position(&self, id: MessageId, stage: &'static str) -> ConversationResult<usize> {
        self.messages
            .iter()
            .position(|message| message.id == id)
            .context(MessageNotFoundSnafu { stage, id })
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_greeting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_a_single_greeting() {
        let conversation = Conversation::with_greeting();

        assert_eq!(conversation.len(), 1);
        let greeting = conversation.last().expect("greeting present");
        assert_eq!(greeting.role, Role::Model);
        assert_eq!(greeting.text, GREETING_TEXT);
    }

    #[test]
    fn repeated_replacement_keeps_length_and_touches_only_the_target() {
        let mut conversation = Conversation::with_greeting();
        let user = Message::user("What is 2+2?");
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        conversation.append(user.clone());
        conversation.append(placeholder);
        let before = conversation.snapshot();

        for text in ["4", "4.", "4. Easy."] {
            conversation
                .replace_text(placeholder_id, text)
                .expect("placeholder exists");
            assert_eq!(conversation.len(), 3);
        }

        let after = conversation.snapshot();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], user);
        assert_eq!(after[2].id, placeholder_id);
        assert_eq!(after[2].role, Role::Model);
        assert_eq!(after[2].text, "4. Easy.");
    }

    #[test]
    fn earlier_snapshots_are_not_affected_by_mutation() {
        let mut conversation = Conversation::with_greeting();
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        conversation.append(placeholder);

        let held = conversation.snapshot();
        conversation
            .replace_text(placeholder_id, "streamed")
            .expect("placeholder exists");
        conversation.append(Message::user("next"));

        assert_eq!(held.len(), 2);
        assert_eq!(held[1].text, PLACEHOLDER_TEXT);
        assert!(!Arc::ptr_eq(&held, &conversation.snapshot()));
    }

    #[test]
    fn remove_drops_only_the_matching_message() {
        let mut conversation = Conversation::with_greeting();
        let user = Message::user("hi");
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        conversation.append(user.clone());
        conversation.append(placeholder);

        let removed = conversation.remove(placeholder_id).expect("placeholder exists");

        assert_eq!(removed.id, placeholder_id);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last(), Some(&user));
        assert!(conversation.get(placeholder_id).is_none());
    }

    #[test]
    fn unknown_ids_are_reported_not_ignored() {
        let mut conversation = Conversation::with_greeting();
        let stray = MessageId::new_v7();

        assert!(matches!(
            conversation.replace_text(stray, "x"),
            Err(ConversationError::MessageNotFound { id, .. }) if id == stray
        ));
        assert!(conversation.remove(stray).is_err());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn message_ids_are_unique() {
        let first = Message::user("a");
        let second = Message::user("a");

        assert_ne!(first.id, second.id);
        assert_ne!(first.id.to_string(), second.id.to_string());
    }
}
