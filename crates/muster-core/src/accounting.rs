//! Value accounting shared by search accumulation and tree recalculation.
//!
//! Both the path search accumulators and [`GatherTree::recalculate`] must
//! agree on what a tile is worth, or the builder's bottom-up sums drift from
//! the search's estimates. This module is the single owner of that rule.
//!
//! [`GatherTree::recalculate`]: crate::tree::GatherTree::recalculate

use std::collections::HashSet;

use crate::board::{Board, PlayerId, TileId};

/// How tile traversal converts into gathered value.
///
/// Every move costs one unit of force left behind. Friendly tiles contribute
/// their army; hostile tiles cost their army when `count_captured_cost` is
/// set and are otherwise ignored in the gathered total (they still block in
/// the army-sum accumulator the search maintains). Tiles in `zero_value`
/// contribute nothing either way, and `priority_bonus` adds an external
/// per-tile scalar on top.
#[derive(Debug, Clone, Copy)]
pub struct Accounting<'a> {
    pub player: PlayerId,
    pub count_captured_cost: bool,
    pub zero_value: Option<&'a HashSet<TileId>>,
    pub priority_bonus: Option<&'a [f64]>,
}

impl<'a> Accounting<'a> {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            count_captured_cost: false,
            zero_value: None,
            priority_bonus: None,
        }
    }

    #[inline]
    fn counts(&self, tile: TileId) -> bool {
        !self.zero_value.is_some_and(|set| set.contains(&tile))
    }

    /// Army contribution of `tile`, before the per-move cost.
    #[inline]
    pub fn contribution(&self, board: &(impl Board + ?Sized), tile: TileId) -> f64 {
        if !self.counts(tile) {
            return 0.0;
        }
        if board.is_friendly(tile, self.player) {
            board.army(tile) as f64
        } else if self.count_captured_cost {
            -(board.army(tile) as f64)
        } else {
            0.0
        }
    }

    /// Raw army delta of traversing `tile`: friendly armies add, hostile
    /// armies always subtract. This is the "would the moving force survive"
    /// sum, independent of the gathered-value accounting mode.
    #[inline]
    pub fn army_contribution(&self, board: &(impl Board + ?Sized), tile: TileId) -> f64 {
        if !self.counts(tile) {
            return 0.0;
        }
        if board.is_friendly(tile, self.player) {
            board.army(tile) as f64
        } else {
            -(board.army(tile) as f64)
        }
    }

    /// Net gathered value of moving off `tile`: contribution, minus the one
    /// unit left behind, plus any external priority bonus.
    #[inline]
    pub fn tile_gain(&self, board: &(impl Board + ?Sized), tile: TileId) -> f64 {
        self.contribution(board, tile) - 1.0 + self.bonus(tile)
    }

    /// Trunk accounting ignores the priority bonus; trunk values rank
    /// branches by raw force delivered along them.
    #[inline]
    pub fn trunk_gain(&self, board: &(impl Board + ?Sized), tile: TileId) -> f64 {
        self.contribution(board, tile) - 1.0
    }

    #[inline]
    pub fn bonus(&self, tile: TileId) -> f64 {
        self.priority_bonus
            .map_or(0.0, |bonus| bonus[tile.index()])
    }
}
