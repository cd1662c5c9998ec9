//! Model import workflow.

mod controller;

pub use controller::{ImportOutcome, ImportWorkflowController, Transition};
