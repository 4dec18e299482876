//! Muster Core
//!
//! This crate provides the shared vocabulary of the Muster planning engine:
//! - The [`Board`] collaborator trait the planners read positions through
//! - The arena-backed [`GatherTree`] that plans are built into
//! - Value accounting shared between search accumulation and tree
//!   recalculation
//! - Cooperative [`Deadline`] polling for soft wall-clock cutoffs
//! - The strict tree-verification error surface ([`TreeError`])

pub mod accounting;
pub mod board;
pub mod deadline;
pub mod error;
pub mod tree;

pub use accounting::Accounting;
pub use board::{Board, PlayerId, TileId};
pub use deadline::Deadline;
pub use error::TreeError;
pub use tree::{GatherNode, GatherTree, Move, NodeId};
