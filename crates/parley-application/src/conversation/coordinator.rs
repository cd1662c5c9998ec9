use parley_core::conversation::{ChatMessage, Conversation};
use parley_core::error::{ParleyError, Result};
use parley_core::gateway::{Operation, OperationGateway};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::state::AppStores;

const LOG_TARGET: &str = "parley::conversation";

/// Result of a delete request.
///
/// Gateway failures are reported here instead of as an `Err`: a failed
/// delete is an expected, recoverable outcome and the stores are untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// There was no active conversation; nothing happened.
    NoActiveConversation,
    /// The id is not in the conversation list; the gateway was not called.
    NotListed { conversation_id: String },
    /// A delete for the same conversation is still awaiting the gateway.
    AlreadyInFlight { conversation_id: String },
    /// The gateway confirmed the delete and the stores were updated.
    Deleted { conversation_id: String },
    /// The gateway rejected the delete; the stores are unchanged.
    Failed {
        conversation_id: String,
        error: ParleyError,
    },
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted { .. })
    }
}

/// Keeps the conversation list, the active conversation pointer, the message
/// cache and the transient prompt/panel flags mutually consistent.
///
/// The coordinator is the only writer of those stores. Multi-store changes
/// are applied inside one notification batch, so subscribers never observe a
/// half-applied change such as a pointer to a conversation that is no longer
/// listed.
pub struct ConversationCoordinator {
    stores: Arc<AppStores>,
    gateway: Arc<dyn OperationGateway>,
    /// Conversation ids with a delete awaiting the gateway.
    in_flight: Mutex<HashSet<String>>,
}

impl ConversationCoordinator {
    pub fn new(stores: Arc<AppStores>, gateway: Arc<dyn OperationGateway>) -> Self {
        Self {
            stores,
            gateway,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Replaces the conversation list (e.g. after loading from the backend).
    ///
    /// Message entries of conversations that are no longer listed are
    /// pruned, and the active pointer is cleared if its target disappeared.
    pub fn load_conversations(&self, conversations: Vec<Conversation>) {
        let stores = &self.stores;
        let ids: HashSet<String> = conversations.iter().map(|c| c.id.clone()).collect();

        stores.gate.batch(|| {
            stores.conversations.set(conversations);

            let has_orphans = stores
                .messages
                .with(|messages| messages.keys().any(|id| !ids.contains(id)));
            if has_orphans {
                stores
                    .messages
                    .update(|messages| messages.retain(|id, _| ids.contains(id)));
            }

            let pointer_dangles = stores
                .active_conversation_id
                .with(|active| active.as_ref().is_some_and(|id| !ids.contains(id)));
            if pointer_dangles {
                stores.active_conversation_id.set(None);
                stores.reset_transient_flags();
            }
        });

        tracing::debug!(target: LOG_TARGET, count = ids.len(), "Loaded conversations");
    }

    /// Appends a new conversation and makes it active.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if a conversation with the same id is listed.
    pub fn create_conversation(&self, conversation: Conversation) -> Result<()> {
        let stores = &self.stores;
        if self.contains(&conversation.id) {
            return Err(ParleyError::already_exists("Conversation", conversation.id));
        }

        let id = conversation.id.clone();
        stores.gate.batch(|| {
            stores.conversations.update(|list| list.push(conversation));
            stores.active_conversation_id.set(Some(id.clone()));
            stores.reset_transient_flags();
        });

        tracing::info!(target: LOG_TARGET, conversation_id = %id, "Created conversation");
        Ok(())
    }

    /// Makes `conversation_id` the active conversation.
    ///
    /// Selecting the conversation that is already active is a no-op; any
    /// other change of identity resets the transient flags.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the conversation is not listed.
    pub fn select_conversation(&self, conversation_id: &str) -> Result<()> {
        let stores = &self.stores;
        if !self.contains(conversation_id) {
            return Err(ParleyError::not_found("Conversation", conversation_id));
        }

        let already_active = stores
            .active_conversation_id
            .with(|active| active.as_deref() == Some(conversation_id));
        if already_active {
            return Ok(());
        }

        stores.gate.batch(|| {
            stores
                .active_conversation_id
                .set(Some(conversation_id.to_string()));
            stores.reset_transient_flags();
        });

        tracing::debug!(target: LOG_TARGET, conversation_id, "Selected conversation");
        Ok(())
    }

    /// Appends a message to a conversation's cache.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the owning conversation is not listed.
    pub fn append_message(&self, message: ChatMessage) -> Result<()> {
        if !self.contains(&message.conversation_id) {
            return Err(ParleyError::not_found(
                "Conversation",
                message.conversation_id,
            ));
        }

        self.stores.messages.update(|messages| {
            messages
                .entry(message.conversation_id.clone())
                .or_default()
                .push(message);
        });
        Ok(())
    }

    pub fn set_prompt(&self, text: impl Into<String>) {
        self.stores.current_prompt.set(text.into());
    }

    pub fn set_showing_product_detail(&self, visible: bool) {
        self.stores.showing_product_detail.set(visible);
    }

    pub fn set_showing_advanced_prompt(&self, visible: bool) {
        self.stores.showing_advanced_prompt.set(visible);
    }

    /// Deletes the active conversation.
    ///
    /// Without an active conversation this is a no-op and the gateway is not
    /// called. Otherwise the gateway delete is awaited first; only when it
    /// succeeds are the list entry, the message cache entry, the pointer and
    /// the transient flags updated, in one batch. On failure nothing changes
    /// and the failure is logged and recorded in the failure log.
    pub async fn delete_active_conversation(&self) -> DeleteOutcome {
        let Some(conversation_id) = self.stores.active_conversation_id.get() else {
            tracing::debug!(target: LOG_TARGET, "Delete requested without an active conversation");
            return DeleteOutcome::NoActiveConversation;
        };

        self.delete_conversation(&conversation_id).await
    }

    /// Deletes a listed conversation that may or may not be active.
    ///
    /// An id missing from the conversation list is reported as
    /// [`DeleteOutcome::NotListed`] without calling the gateway.
    ///
    /// Follows the same protocol as [`Self::delete_active_conversation`];
    /// the pointer and the transient flags are only reset when the deleted
    /// conversation is the active one at the time the gateway succeeds.
    pub async fn delete_conversation(&self, conversation_id: &str) -> DeleteOutcome {
        if !self.contains(conversation_id) {
            tracing::warn!(
                target: LOG_TARGET,
                conversation_id,
                "Delete requested for an unlisted conversation"
            );
            return DeleteOutcome::NotListed {
                conversation_id: conversation_id.to_string(),
            };
        }

        let Some(_in_flight) = self.begin_delete(conversation_id) else {
            tracing::warn!(
                target: LOG_TARGET,
                conversation_id,
                "Delete already in flight, rejecting duplicate request"
            );
            return DeleteOutcome::AlreadyInFlight {
                conversation_id: conversation_id.to_string(),
            };
        };

        let operation = Operation::DeleteConversation {
            conversation_id: conversation_id.to_string(),
        };
        let kind = operation.kind();

        match self.gateway.execute(operation).await {
            Ok(_) => {
                self.apply_deletion(conversation_id);
                tracing::info!(target: LOG_TARGET, conversation_id, "Deleted conversation");
                DeleteOutcome::Deleted {
                    conversation_id: conversation_id.to_string(),
                }
            }
            Err(error) => {
                tracing::error!(
                    target: LOG_TARGET,
                    conversation_id,
                    error = %error,
                    "Failed to delete conversation"
                );
                self.stores.failures.record(kind, conversation_id, &error);
                DeleteOutcome::Failed {
                    conversation_id: conversation_id.to_string(),
                    error,
                }
            }
        }
    }

    /// Checks that the active pointer references a listed conversation and
    /// that no message entry outlived its conversation.
    ///
    /// A dangling pointer means a synchronization bug: it is logged, the
    /// pointer and the transient flags are reset, and an
    /// `InconsistentState` error is returned. Orphaned message entries are
    /// pruned.
    pub fn verify_consistency(&self) -> Result<()> {
        let stores = &self.stores;
        let snapshot = stores.snapshot();

        if !snapshot.has_no_orphaned_messages() {
            tracing::warn!(target: LOG_TARGET, "Pruning orphaned message entries");
            let ids: HashSet<&str> = snapshot.conversations.iter().map(|c| c.id.as_str()).collect();
            stores
                .messages
                .update(|messages| messages.retain(|id, _| ids.contains(id.as_str())));
        }

        if snapshot.pointer_is_valid() {
            return Ok(());
        }

        let dangling = snapshot.active_conversation_id.unwrap_or_default();
        tracing::error!(
            target: LOG_TARGET,
            conversation_id = %dangling,
            "Active conversation pointer references an unlisted conversation, resetting"
        );
        stores.gate.batch(|| {
            stores.active_conversation_id.set(None);
            stores.reset_transient_flags();
        });

        Err(ParleyError::InconsistentState(format!(
            "active conversation '{dangling}' is not in the conversation list"
        )))
    }

    /// Returns `true` while a delete for `conversation_id` awaits the gateway.
    pub fn is_delete_in_flight(&self, conversation_id: &str) -> bool {
        self.lock_in_flight().contains(conversation_id)
    }

    fn apply_deletion(&self, conversation_id: &str) {
        let stores = &self.stores;
        stores.gate.batch(|| {
            stores
                .conversations
                .update(|list| list.retain(|c| c.id != conversation_id));
            stores.messages.update(|messages| {
                messages.remove(conversation_id);
            });

            let was_active = stores
                .active_conversation_id
                .with(|active| active.as_deref() == Some(conversation_id));
            if was_active {
                stores.active_conversation_id.set(None);
                stores.reset_transient_flags();
            }
        });
    }

    fn contains(&self, conversation_id: &str) -> bool {
        self.stores
            .conversations
            .with(|list| list.iter().any(|c| c.id == conversation_id))
    }

    fn begin_delete(&self, conversation_id: &str) -> Option<InFlightDelete<'_>> {
        let inserted = self.lock_in_flight().insert(conversation_id.to_string());
        inserted.then(|| InFlightDelete {
            in_flight: &self.in_flight,
            conversation_id: conversation_id.to_string(),
        })
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a delete as in flight until dropped.
struct InFlightDelete<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    conversation_id: String,
}

impl Drop for InFlightDelete<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.conversation_id);
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
