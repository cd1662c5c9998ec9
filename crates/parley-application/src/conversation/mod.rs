//! Conversation lifecycle services.
//!
//! The [`ConversationCoordinator`] is the single writer of the conversation
//! list, the active conversation pointer, the message cache and the
//! transient prompt/panel flags.

mod coordinator;

pub use coordinator::{ConversationCoordinator, DeleteOutcome};
