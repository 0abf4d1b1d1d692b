//! Board state messages
//!
//! Commands and events for the actor that owns the forest.

use thiserror::Error;
use tokio::sync::oneshot;

use super::delta::ForestDelta;
use super::outcome::Notice;
use crate::tree::Forest;

/// Errors from board state operations
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Channel error")]
    ChannelError,
}

/// Response from board state operations
pub type BoardResponse<T> = Result<T, BoardError>;

/// Commands sent to the BoardState actor
#[derive(Debug)]
pub enum BoardCommand {
    /// Read the forest in effect right now
    Snapshot { reply: oneshot::Sender<Forest> },

    /// Apply a delta to the current forest, replying with the new version
    Apply {
        delta: ForestDelta,
        reply: oneshot::Sender<u64>,
    },

    /// Swap in a freshly loaded forest
    Replace {
        forest: Forest,
        reply: oneshot::Sender<u64>,
    },

    Version { reply: oneshot::Sender<u64> },

    Shutdown,
}

/// Event broadcast to board subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// The forest changed; `version` increases by one per change
    Changed { version: u64 },
    /// A user action was refused or failed
    ActionFailed(Notice),
}
