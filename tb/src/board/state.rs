//! BoardState - actor that owns the forest
//!
//! Every change goes through a [`ForestDelta`] or a full replacement, so the
//! forest is only ever swapped for a next-state value, never edited in place.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use super::delta::ForestDelta;
use super::messages::{BoardCommand, BoardError, BoardEvent, BoardResponse};
use crate::tree::Forest;

/// Handle to send commands to the BoardState actor
#[derive(Clone)]
pub struct BoardState {
    tx: mpsc::Sender<BoardCommand>,
    /// Broadcast sender for board change notifications
    event_tx: broadcast::Sender<BoardEvent>,
}

impl BoardState {
    /// Spawn a new BoardState actor owning `forest`
    pub fn spawn(forest: Forest) -> Self {
        debug!(lists = forest.lists().len(), "spawn: called");
        let (tx, rx) = mpsc::channel(256);

        // Broadcast channel for change notifications (renderers subscribe)
        let (event_tx, _) = broadcast::channel(64);

        tokio::spawn(actor_loop(forest, rx, event_tx.clone()));

        info!("BoardState spawned");

        Self { tx, event_tx }
    }

    /// Subscribe to board events
    pub fn subscribe_events(&self) -> broadcast::Receiver<BoardEvent> {
        self.event_tx.subscribe()
    }

    /// Publish an event to subscribers
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: BoardEvent) {
        debug!(?event, "publish: called");
        let _ = self.event_tx.send(event);
    }

    /// The forest in effect right now
    pub async fn snapshot(&self) -> BoardResponse<Forest> {
        debug!("snapshot: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BoardCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| BoardError::ChannelError)?;
        reply_rx.await.map_err(|_| BoardError::ChannelError)
    }

    /// Apply `delta` to whatever forest is current when the actor gets to it
    pub async fn apply(&self, delta: ForestDelta) -> BoardResponse<u64> {
        debug!("apply: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BoardCommand::Apply { delta, reply: reply_tx })
            .await
            .map_err(|_| BoardError::ChannelError)?;
        reply_rx.await.map_err(|_| BoardError::ChannelError)
    }

    /// Replace the whole forest
    pub async fn replace(&self, forest: Forest) -> BoardResponse<u64> {
        debug!("replace: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BoardCommand::Replace { forest, reply: reply_tx })
            .await
            .map_err(|_| BoardError::ChannelError)?;
        reply_rx.await.map_err(|_| BoardError::ChannelError)
    }

    pub async fn version(&self) -> BoardResponse<u64> {
        debug!("version: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BoardCommand::Version { reply: reply_tx })
            .await
            .map_err(|_| BoardError::ChannelError)?;
        reply_rx.await.map_err(|_| BoardError::ChannelError)
    }

    /// Shutdown the BoardState
    pub async fn shutdown(&self) -> BoardResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(BoardCommand::Shutdown)
            .await
            .map_err(|_| BoardError::ChannelError)
    }
}

async fn actor_loop(mut forest: Forest, mut rx: mpsc::Receiver<BoardCommand>, event_tx: broadcast::Sender<BoardEvent>) {
    debug!("BoardState actor started");
    let mut version: u64 = 0;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            BoardCommand::Snapshot { reply } => {
                debug!("actor_loop: Snapshot command");
                let _ = reply.send(forest.clone());
            }

            BoardCommand::Apply { delta, reply } => {
                debug!("actor_loop: Apply command");
                let next = delta.apply(&forest);
                if next != forest {
                    forest = next;
                    version += 1;
                    let _ = event_tx.send(BoardEvent::Changed { version });
                } else {
                    debug!(version, "actor_loop: delta changed nothing");
                }
                let _ = reply.send(version);
            }

            BoardCommand::Replace { forest: next, reply } => {
                debug!(lists = next.lists().len(), "actor_loop: Replace command");
                forest = next;
                version += 1;
                let _ = event_tx.send(BoardEvent::Changed { version });
                let _ = reply.send(version);
            }

            BoardCommand::Version { reply } => {
                let _ = reply.send(version);
            }

            BoardCommand::Shutdown => {
                info!("BoardState shutting down");
                break;
            }
        }
    }

    debug!("BoardState actor stopped");
}
