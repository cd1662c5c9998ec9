//! Conversation domain module.
//!
//! - `model`: the conversation record kept in the conversation list
//! - `message`: cached messages keyed by conversation id

mod message;
mod model;

use std::collections::HashMap;

pub use message::{ChatMessage, MessageRole};
pub use model::Conversation;

/// Per-conversation message cache, keyed by conversation id.
pub type MessageMap = HashMap<String, Vec<ChatMessage>>;
