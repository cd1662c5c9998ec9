//! Observable stores.
//!
//! A [`Store`] holds one piece of application state and notifies subscribers
//! whenever it changes. Stores know nothing about each other; invariants that
//! span several stores are maintained by the coordinators that own them,
//! using a shared [`NotificationGate`] to make multi-store updates atomic from
//! the subscribers' point of view.
//!
//! # Usage
//!
//! ```
//! use parley_core::store::{NotificationGate, Store};
//!
//! let gate = NotificationGate::new();
//! let list = Store::new("list", vec![1, 2], &gate);
//! let pointer = Store::new("pointer", Some(1), &gate);
//!
//! gate.batch(|| {
//!     list.update(|items| items.retain(|i| *i != 1));
//!     pointer.set(None);
//! });
//!
//! assert_eq!(list.get(), vec![2]);
//! assert_eq!(pointer.get(), None);
//! ```

mod gate;
mod observable;

pub use gate::NotificationGate;
pub use observable::{Store, StoreReader, Subscription};
