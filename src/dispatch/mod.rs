//! Sync dispatcher
//!
//! [`Action`] is the single vocabulary of state change. A [`Command`] pairs
//! an action with the capability tags it was authored with, and
//! [`SyncEngine`] runs it through the interceptor chain.

mod action;
mod effects;
mod engine;

pub use action::{Action, Capabilities, Command, EntityType};
pub use engine::{command_channel, CommandReceiver, CommandSender, StoreObserver, SyncEngine};
