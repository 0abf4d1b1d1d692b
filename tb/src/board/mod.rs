//! Board state, reconciliation and moves
//!
//! [`BoardState`] owns the forest and is the only thing that swaps it. The
//! [`Reconciler`] turns user actions into store calls and authoritative
//! responses into [`ForestDelta`]s; moves and drag gestures live alongside it.

mod controller;
mod delta;
mod messages;
mod mover;
mod outcome;
mod render;
mod state;

pub use controller::{Phase, Reconciler};
pub use delta::{ForestDelta, StructuralEdit};
pub use messages::{BoardCommand, BoardError, BoardEvent, BoardResponse};
pub use mover::{Direction, DragDrop, DropTarget};
pub use outcome::{Action, ActionOutcome, Notice};
pub use render::Renderer;
pub use state::BoardState;
