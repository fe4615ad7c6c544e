//! Offline interceptor and operation queue
//!
//! While offline, offlineable commands are deferred into an ordered queue.
//! Optimistic ones are still applied to the local store right away; the
//! rest wait for replay. On the next transition to online the engine replays
//! the queue one remote call at a time, in enqueue order.

mod queue;

pub use queue::{Operation, OperationQueue, OperationStatus};

use serde::{Deserialize, Serialize};

use crate::dispatch::Command;

/// Network reachability as last reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online)
    }
}

/// Outcome of the offline interceptor for one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interception {
    /// An operation was enqueued
    pub queued: bool,
    /// The command continues to the store
    pub forwarded: bool,
}

impl Interception {
    pub const PASS: Interception = Interception {
        queued: false,
        forwarded: true,
    };
}

/// Decide defer-vs-pass for a command.
///
/// Queues when offline and the command is offlineable; forwards unless it
/// was queued without being optimistic. Everything else passes unmodified.
pub fn intercept(command: &Command, connectivity: Connectivity) -> Interception {
    let queued = !connectivity.is_online() && command.capabilities.offlineable;
    if !queued {
        return Interception::PASS;
    }
    Interception {
        queued: true,
        forwarded: command.capabilities.optimistic,
    }
}
