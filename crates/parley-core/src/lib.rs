//! Domain layer for Parley.
//!
//! Conversations, the model import workflow, layout state, the observable
//! store primitive they are held in, and the traits for the external
//! collaborators (operation gateway, model catalog, native theme bridge).

pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod import;
pub mod layout;
pub mod store;

pub use error::{ParleyError, Result};
