//! Tree pruning.
//!
//! Removes lowest-marginal-value whole subtrees until a caller-supplied
//! condition is met, re-deriving ancestor sums on every removal. Whole
//! subtrees only - cutting a node without its descendants would disconnect
//! them - and roots are never prunable.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use muster_core::{Board, GatherNode, GatherTree, NodeId, PlayerId};

/// Totals of the tree after a pruning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneOutcome {
    pub turns: u32,
    pub value: f64,
}

/// Prune ordering key; the minimum is pruned first. Ties in marginal value
/// fall through to raw value and then to trunk distance, which keeps the
/// structurally larger subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneKey {
    pub value_per_turn: f64,
    pub value: f64,
    pub neg_trunk_distance: i64,
}

impl PruneKey {
    /// Default ordering for a node: marginal value per turn, then value,
    /// then keep-the-deeper-trunk.
    pub fn of(node: &GatherNode) -> Self {
        let value_per_turn = if node.turns > 0 {
            node.value / node.turns as f64
        } else {
            -100.0
        };
        Self {
            value_per_turn,
            value: node.value,
            neg_trunk_distance: -(node.trunk_distance as i64),
        }
    }
}

impl Eq for PruneKey {}

impl PartialOrd for PruneKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PruneKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value_per_turn
            .total_cmp(&other.value_per_turn)
            .then_with(|| self.value.total_cmp(&other.value))
            .then_with(|| self.neg_trunk_distance.cmp(&other.neg_trunk_distance))
    }
}

/// Prunes the tree down to `target` turns.
///
/// `overprune_cutoff` permits intentionally removing slightly more than
/// required (down to the cutoff), leaving the next growth round room to find
/// a better branch instead of immediately re-adding the one just cut. With
/// `allow_negative = false`, prunes that would leave a root's remaining
/// value negative are refused.
pub fn prune_to_turns(
    tree: &mut GatherTree,
    board: &(impl Board + ?Sized),
    player: PlayerId,
    target: u32,
    overprune_cutoff: u32,
    allow_negative: bool,
) -> PruneOutcome {
    prune_until(
        tree,
        |turns_left, _value_left, _node| turns_left <= target,
        PruneKey::of,
        |node| {
            board.army(node.tile) <= 1
                || (!board.is_friendly(node.tile, player) && node.children.is_empty())
        },
        |turns_left, _value_left, node| turns_left.saturating_sub(node.turns) < overprune_cutoff,
        allow_negative,
    )
}

/// Generic pruning engine.
///
/// * `until(turns_left, value_left, node)` - true once enough has been
///   pruned; invalid leaves are still drained regardless.
/// * `order_key(node)` - min-first prune ordering.
/// * `invalid(node)` - a node that can never produce a useful move; always
///   prunable.
/// * `keep(turns_left, value_left, node)` - veto hook; a true return keeps
///   the node even though `until` hasn't been reached.
///
/// Keys are re-derived on pop: an entry whose priority improved since it was
/// queued is pushed back instead of pruned.
pub fn prune_until<U, K, I, G>(
    tree: &mut GatherTree,
    mut until: U,
    mut order_key: K,
    mut invalid: I,
    mut keep: G,
    allow_negative: bool,
) -> PruneOutcome
where
    U: FnMut(u32, f64, &GatherNode) -> bool,
    K: FnMut(&GatherNode) -> PruneKey,
    I: FnMut(&GatherNode) -> bool,
    G: FnMut(u32, f64, &GatherNode) -> bool,
{
    let (mut turns_left, mut value_left) = tree.totals();

    // Min-heap over (validity, key): invalid nodes drain first.
    let mut heap: BinaryHeap<Reverse<(bool, PruneKey, NodeId)>> = BinaryHeap::new();
    for id in tree.topological() {
        let node = tree.node(id);
        if node.parent.is_some() {
            heap.push(Reverse((!invalid(node), order_key(node), id)));
        }
    }

    let budget = tree.len() * 3 + 16;
    let mut iterations = 0usize;

    while let Some(Reverse((_, key, id))) = heap.pop() {
        iterations += 1;
        if iterations > budget {
            tracing::warn!("prune loop exceeded its iteration budget, stopping");
            break;
        }
        if !tree.is_live(id) {
            continue;
        }
        let node = tree.node(id);
        let Some(parent_id) = node.parent else {
            continue;
        };

        let valid = !invalid(node);
        if (valid || !node.children.is_empty()) && until(turns_left, value_left, node) {
            continue;
        }
        if keep(turns_left, value_left, node) {
            continue;
        }
        if !allow_negative && would_leave_negative_root(tree, id) {
            continue;
        }
        if valid {
            // prune value may have shifted since queueing; requeue instead
            // of pruning on a stale low key
            let fresh = order_key(node);
            if fresh > key {
                heap.push(Reverse((valid, fresh, id)));
                continue;
            }
        }

        let (removed_value, removed_turns) = tree.prune_subtree(id);
        turns_left -= removed_turns;
        value_left -= removed_value;
        tracing::trace!(
            tile = %tree.node(id).tile,
            removed_value,
            removed_turns,
            turns_left,
            "pruned subtree"
        );

        let parent = tree.node(parent_id);
        if parent.children.is_empty() && parent.parent.is_some() {
            heap.push(Reverse((!invalid(parent), order_key(parent), parent_id)));
        }
    }

    PruneOutcome {
        turns: turns_left,
        value: value_left,
    }
}

fn would_leave_negative_root(tree: &GatherTree, id: NodeId) -> bool {
    let removed = tree.node(id).value;
    let mut cursor = id;
    while let Some(parent) = tree.node(cursor).parent {
        cursor = parent;
    }
    tree.node(cursor).value - removed < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::{Accounting, TileId};
    use muster_test::GridBoard;

    fn friendly_line(armies: &[i64]) -> GridBoard {
        let mut board = GridBoard::open(armies.len() as u32, 1);
        for (x, &army) in armies.iter().enumerate() {
            board.claim(board.tile(x as u32, 0), PlayerId(0), army);
        }
        board
    }

    /// root(10) with two branches: strong 2-tile branch (army 9 each) and a
    /// weak 2-tile branch (army 2 each), on one row.
    ///
    /// layout: 9 - 9 - 10 - 2 - 2
    fn forked_tree() -> (GridBoard, GatherTree, Accounting<'static>) {
        let board = friendly_line(&[9, 9, 10, 2, 2]);
        let acct = Accounting::new(PlayerId(0));
        let mut tree = GatherTree::new();
        tree.add_root(TileId(2));
        // strong branch: 2 <- 1 <- 0, gathered (9-1)*2 = 16
        assert!(tree.graft_path(&board, &acct, &[TileId(2), TileId(1), TileId(0)], 16.0));
        // weak branch: 2 <- 3 <- 4, gathered (2-1)*2 = 2
        assert!(tree.graft_path(&board, &acct, &[TileId(2), TileId(3), TileId(4)], 2.0));
        (board, tree, acct)
    }

    #[test]
    fn prunes_lowest_marginal_value_subtree_first() {
        let (board, mut tree, acct) = forked_tree();
        let outcome = prune_to_turns(&mut tree, &board, PlayerId(0), 2, 2, true);
        assert_eq!(outcome.turns, 2);
        assert_eq!(outcome.value, 16.0);
        assert!(tree.lookup(TileId(3)).is_none(), "weak branch pruned");
        assert!(tree.lookup(TileId(0)).is_some(), "strong branch kept");
        tree.verify().unwrap();
    }

    #[test]
    fn outcome_matches_from_scratch_recalculation() {
        let (board, mut tree, acct) = forked_tree();
        let outcome = prune_to_turns(&mut tree, &board, PlayerId(0), 3, 3, true);
        let (turns, value) = tree.recalculate(&board, &acct);
        assert_eq!(outcome.turns, turns);
        assert!((outcome.value - value).abs() < 1e-9);
    }

    #[test]
    fn roots_are_never_pruned() {
        let (board, mut tree, acct) = forked_tree();
        let outcome = prune_to_turns(&mut tree, &board, PlayerId(0), 0, 0, true);
        assert_eq!(outcome.turns, 0);
        assert!(tree.lookup(TileId(2)).is_some());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn under_budget_tree_is_untouched() {
        let (board, mut tree, acct) = forked_tree();
        let before = tree.totals();
        let outcome = prune_to_turns(&mut tree, &board, PlayerId(0), 10, 10, true);
        assert_eq!((outcome.turns, outcome.value), before);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn overprune_cutoff_bounds_the_overshoot() {
        // the weak branch holds its value at the far leaf, so the branch
        // node pops before its leaf and takes both turns with it
        let board = friendly_line(&[9, 9, 10, 2, 9]);
        let acct = Accounting::new(PlayerId(0));
        let mut tree = GatherTree::new();
        tree.add_root(TileId(2));
        assert!(tree.graft_path(&board, &acct, &[TileId(2), TileId(1), TileId(0)], 16.0));
        assert!(tree.graft_path(&board, &acct, &[TileId(2), TileId(3), TileId(4)], 9.0));

        // cutoff 2 lets the whole 2-turn branch go: 4 turns land on 2
        let mut overshot = tree.clone();
        let outcome = prune_to_turns(&mut overshot, &board, PlayerId(0), 3, 2, true);
        assert_eq!(outcome.turns, 2);

        // cutoff 3 vetoes that prune; a single leaf goes instead: 4 -> 3
        let outcome = prune_to_turns(&mut tree, &board, PlayerId(0), 3, 3, true);
        assert_eq!(outcome.turns, 3);
    }

    #[test]
    fn invalid_leaf_goes_before_valuable_leaves() {
        // leaf army 1 can never move; it drains ahead of valid leaves
        let board = friendly_line(&[10, 5, 1]);
        let acct = Accounting::new(PlayerId(0));
        let mut tree = GatherTree::new();
        tree.add_root(TileId(0));
        assert!(tree.graft_path(&board, &acct, &[TileId(0), TileId(1), TileId(2)], 4.0));
        let outcome = prune_to_turns(&mut tree, &board, PlayerId(0), 1, 1, true);
        assert_eq!(outcome.turns, 1);
        assert_eq!(outcome.value, 4.0);
        assert!(tree.lookup(TileId(2)).is_none());
        assert!(tree.lookup(TileId(1)).is_some());
    }

    #[test]
    fn negative_guard_refuses_value_destroying_prunes() {
        // root(10) <- friendly 9,9 branch (value 16) and a hostile capture
        // branch costing 7: total value 9
        let mut board = friendly_line(&[9, 9, 10, 6]);
        board.set_owner(board.tile(3, 0), Some(PlayerId(1)));
        let mut acct = Accounting::new(PlayerId(0));
        acct.count_captured_cost = true;
        let mut tree = GatherTree::new();
        tree.add_root(TileId(2));
        assert!(tree.graft_path(&board, &acct, &[TileId(2), TileId(1), TileId(0)], 16.0));
        assert!(tree.graft_path(&board, &acct, &[TileId(2), TileId(3)], -7.0));
        assert_eq!(tree.totals(), (3, 9.0));

        let outcome = prune_until(
            &mut tree,
            |_turns, _value, _node| false,
            PruneKey::of,
            |_node| false,
            // the hostile capture is required, so only friendly prunes are
            // on offer
            |_turns, _value, node| !board.is_friendly(node.tile, PlayerId(0)),
            false,
        );
        // the far leaf prune leaves the root at 1; pruning the remaining
        // friendly node would send it to -7 and is refused
        assert_eq!(outcome.turns, 2);
        assert!((outcome.value - 1.0).abs() < 1e-9);
        assert!(tree.lookup(TileId(1)).is_some());
        assert!(tree.lookup(TileId(0)).is_none());
    }
}
