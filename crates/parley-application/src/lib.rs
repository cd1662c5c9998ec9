//! Application layer for Parley.
//!
//! Owns the observable store container and the coordinators that are the
//! single writers of each store group. Side effects go through the
//! `OperationGateway` and `ModelCatalog` traits defined in `parley-core`.

pub mod app;
pub mod conversation;
pub mod failure_log;
pub mod import;
pub mod layout;
pub mod state;

pub use app::ParleyApp;
pub use conversation::{ConversationCoordinator, DeleteOutcome};
pub use failure_log::{FailureLog, OperationFailure};
pub use import::{ImportOutcome, ImportWorkflowController, Transition};
pub use layout::{LayoutController, StartupHints};
pub use state::{AppStores, ConversationSnapshot};
