//! Error types for Muster.
//!
//! Planning never fails: searches and builders report "nothing found" through
//! empty results, not errors. The only hard error surface in this crate is
//! the strict tree-verification API used by debug configurations.

use thiserror::Error;

use crate::board::TileId;

/// Structural invariant violations reported by [`GatherTree::verify`].
///
/// In normal operation these conditions are recovered defensively (logged,
/// the offending edge severed); `verify` surfaces them as hard errors for
/// verification and debug configurations.
///
/// [`GatherTree::verify`]: crate::tree::GatherTree::verify
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("cycle detected through tile {0}")]
    Cycle(TileId),

    #[error("node for tile {child} points at parent tile {parent} which is not in the tree")]
    MissingParent { child: TileId, parent: TileId },

    #[error("tile {tile} turn count {actual} does not equal 1 + children ({expected})")]
    TurnMismatch {
        tile: TileId,
        actual: u32,
        expected: u32,
    },
}
