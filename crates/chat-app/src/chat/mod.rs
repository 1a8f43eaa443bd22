/// Event contracts for chat module wiring.
pub mod events;
pub mod markdown;
/// Messages and the conversation store.
pub mod message;
pub mod message_input;
pub mod message_list;
pub mod scroll_manager;
pub mod view;
/// Submit-to-completion state machine for a single send.
pub mod workflow;

pub use events::Submit;
pub use markdown::hard_line_breaks;
pub use message::{Conversation, ConversationError, Message, MessageId, Role};
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use scroll_manager::ScrollManager;
pub use view::ChatView;
pub use workflow::{SendPhase, SendWorkflow, StepOutcome, SubmitRejection};
