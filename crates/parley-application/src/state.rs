//! Application-state container.
//!
//! `AppStores` owns every observable store of the application. It is built
//! explicitly (no process-wide globals) so each test can construct a fresh
//! one. Writable handles stay inside this crate and are only touched by the
//! coordinator that owns them:
//!
//! | stores | writer |
//! |---|---|
//! | conversations, active conversation, messages, prompt, panel flags | `ConversationCoordinator` |
//! | import stage, import error | `ImportWorkflowController` |
//! | main view, side panels, theme | `LayoutController` |
//!
//! Everything else (the rendering layer) gets [`StoreReader`]s.

use parley_core::config::AppConfig;
use parley_core::conversation::{Conversation, MessageMap};
use parley_core::import::ImportStage;
use parley_core::layout::{MainView, Theme};
use parley_core::store::{NotificationGate, Store, StoreReader};

use crate::failure_log::FailureLog;

pub struct AppStores {
    pub(crate) gate: NotificationGate,

    pub(crate) conversations: Store<Vec<Conversation>>,
    pub(crate) active_conversation_id: Store<Option<String>>,
    pub(crate) messages: Store<MessageMap>,

    // Presentation state tied to the active conversation
    pub(crate) current_prompt: Store<String>,
    pub(crate) showing_product_detail: Store<bool>,
    pub(crate) showing_advanced_prompt: Store<bool>,

    pub(crate) import_stage: Store<ImportStage>,
    pub(crate) import_error: Store<Option<String>>,

    pub(crate) main_view: Store<MainView>,
    pub(crate) show_left_panel: Store<bool>,
    pub(crate) show_right_panel: Store<bool>,
    pub(crate) theme: Store<Theme>,

    pub(crate) failures: FailureLog,
}

impl AppStores {
    /// Creates the container in its initial state: no conversations, no
    /// active conversation, import stage `none`, layout from `config.ui`.
    pub fn new(config: &AppConfig) -> Self {
        let gate = NotificationGate::new();
        Self {
            conversations: Store::new("user_conversations", Vec::new(), &gate),
            active_conversation_id: Store::new("active_conversation_id", None, &gate),
            messages: Store::new("conversation_messages", MessageMap::new(), &gate),
            current_prompt: Store::new("current_prompt", String::new(), &gate),
            showing_product_detail: Store::new("showing_product_detail", false, &gate),
            showing_advanced_prompt: Store::new("showing_advanced_prompt", false, &gate),
            import_stage: Store::new("import_model_stage", ImportStage::None, &gate),
            import_error: Store::new("import_model_error", None, &gate),
            main_view: Store::new("main_view", MainView::default(), &gate),
            show_left_panel: Store::new("show_left_panel", config.ui.show_left_panel, &gate),
            show_right_panel: Store::new("show_right_panel", config.ui.show_right_panel, &gate),
            theme: Store::new("theme", config.ui.theme, &gate),
            failures: FailureLog::new(config.failure_log.capacity, &gate),
            gate,
        }
    }

    /// Resets the presentation flags coupled to the active conversation.
    ///
    /// Callers run this inside a batch together with the pointer change.
    pub(crate) fn reset_transient_flags(&self) {
        self.current_prompt.set(String::new());
        self.showing_product_detail.set(false);
        self.showing_advanced_prompt.set(false);
    }

    // ============================================================================
    // Read-only views
    // ============================================================================

    pub fn conversations(&self) -> StoreReader<Vec<Conversation>> {
        self.conversations.reader()
    }

    pub fn active_conversation_id(&self) -> StoreReader<Option<String>> {
        self.active_conversation_id.reader()
    }

    pub fn messages(&self) -> StoreReader<MessageMap> {
        self.messages.reader()
    }

    pub fn current_prompt(&self) -> StoreReader<String> {
        self.current_prompt.reader()
    }

    pub fn showing_product_detail(&self) -> StoreReader<bool> {
        self.showing_product_detail.reader()
    }

    pub fn showing_advanced_prompt(&self) -> StoreReader<bool> {
        self.showing_advanced_prompt.reader()
    }

    pub fn import_stage(&self) -> StoreReader<ImportStage> {
        self.import_stage.reader()
    }

    pub fn import_error(&self) -> StoreReader<Option<String>> {
        self.import_error.reader()
    }

    pub fn main_view(&self) -> StoreReader<MainView> {
        self.main_view.reader()
    }

    pub fn show_left_panel(&self) -> StoreReader<bool> {
        self.show_left_panel.reader()
    }

    pub fn show_right_panel(&self) -> StoreReader<bool> {
        self.show_right_panel.reader()
    }

    pub fn theme(&self) -> StoreReader<Theme> {
        self.theme.reader()
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    /// Captures the conversation-related stores for comparison and display.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            conversations: self.conversations.get(),
            active_conversation_id: self.active_conversation_id.get(),
            messages: self.messages.get(),
            current_prompt: self.current_prompt.get(),
            showing_product_detail: self.showing_product_detail.get(),
            showing_advanced_prompt: self.showing_advanced_prompt.get(),
        }
    }
}

/// Point-in-time copy of the conversation-related stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub conversations: Vec<Conversation>,
    pub active_conversation_id: Option<String>,
    pub messages: MessageMap,
    pub current_prompt: String,
    pub showing_product_detail: bool,
    pub showing_advanced_prompt: bool,
}

impl ConversationSnapshot {
    /// `None` or an id present in the list.
    pub fn pointer_is_valid(&self) -> bool {
        match &self.active_conversation_id {
            None => true,
            Some(id) => self.conversations.iter().any(|c| &c.id == id),
        }
    }

    /// Every message entry belongs to a listed conversation.
    pub fn has_no_orphaned_messages(&self) -> bool {
        self.messages
            .keys()
            .all(|id| self.conversations.iter().any(|c| &c.id == id))
    }
}
