//! Arena-backed gather tree.
//!
//! Plans are trees of force movements rooted at the gather target(s). Nodes
//! live in a flat arena addressed by [`NodeId`] indices; parent/child links
//! are indices, never owning pointers, so "cycle" is a checkable shape
//! invariant rather than a runtime aliasing hazard. Detached subtrees stay in
//! the arena as tombstones and are remembered on their former parent for
//! regrowth in later rounds.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::accounting::Accounting;
use crate::board::{Board, TileId};
use crate::error::TreeError;

/// Index of a node in a [`GatherTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One literal move: shift the force on `from` onto `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: TileId,
    pub to: TileId,
}

/// A single position in the gather tree.
#[derive(Debug, Clone)]
pub struct GatherNode {
    pub tile: TileId,
    /// `None` for roots.
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
    /// Former children detached by pruning, kept for regrowth bookkeeping.
    pub pruned: SmallVec<[NodeId; 2]>,
    /// Value gathered by this node's whole subtree.
    pub value: f64,
    /// Moves consumed by this node's subtree: 1 + sum of children for
    /// non-roots, plain child sum for roots.
    pub turns: u32,
    /// Value of the branch from the root up to and including this node.
    pub trunk_value: f64,
    /// Distance from the root along the branch.
    pub trunk_distance: u32,
}

/// Root-anchored tree of gather moves under construction.
#[derive(Debug, Clone, Default)]
pub struct GatherTree {
    nodes: Vec<GatherNode>,
    roots: SmallVec<[NodeId; 2]>,
    by_tile: HashMap<TileId, NodeId>,
}

impl GatherTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root node for `tile`. Roots are never prunable.
    pub fn add_root(&mut self, tile: TileId) -> NodeId {
        debug_assert!(
            !self.by_tile.contains_key(&tile),
            "tile {tile} already in tree"
        );
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GatherNode {
            tile,
            parent: None,
            children: SmallVec::new(),
            pruned: SmallVec::new(),
            value: 0.0,
            turns: 0,
            trunk_value: 0.0,
            trunk_distance: 0,
        });
        self.roots.push(id);
        self.by_tile.insert(tile, id);
        id
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &GatherNode {
        &self.nodes[id.index()]
    }

    /// Live node for `tile`, if the tile is currently part of the tree.
    pub fn lookup(&self, tile: TileId) -> Option<NodeId> {
        self.by_tile.get(&tile).copied()
    }

    /// True when `id` is attached to the tree (not a pruned tombstone).
    pub fn is_live(&self, id: NodeId) -> bool {
        self.by_tile.get(&self.nodes[id.index()].tile) == Some(&id)
    }

    /// Number of live nodes, roots included.
    pub fn len(&self) -> usize {
        self.by_tile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tile.is_empty()
    }

    pub fn live_tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.by_tile.keys().copied()
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.by_tile.values().copied()
    }

    /// Total (turns, value) across all roots.
    pub fn totals(&self) -> (u32, f64) {
        let mut turns = 0;
        let mut value = 0.0;
        for &root in &self.roots {
            let node = &self.nodes[root.index()];
            turns += node.turns;
            value += node.value;
        }
        (turns, value)
    }

    /// Live nodes in breadth-first order, parents before children.
    pub fn topological(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.by_tile.len());
        let mut head = 0;
        order.extend(self.roots.iter().copied());
        while head < order.len() {
            let id = order[head];
            head += 1;
            order.extend(self.nodes[id.index()].children.iter().copied());
            if order.len() > self.nodes.len() {
                tracing::warn!("gather tree walk exceeded arena size; walk aborted");
                break;
            }
        }
        order
    }

    /// Grafts a discovered path onto the tree.
    ///
    /// `tiles[0]` must already be a live node (the frontier tile the search
    /// started from); the remaining tiles are appended below it in order.
    /// `path_value` is the path's total gathered value; each appended node
    /// receives the value still outstanding at its depth, and the path total
    /// bubbles up through the attach node's ancestors.
    ///
    /// Returns false (and grafts nothing) when the attach tile is not in the
    /// tree.
    pub fn graft_path(
        &mut self,
        board: &(impl Board + ?Sized),
        acct: &Accounting<'_>,
        tiles: &[TileId],
        path_value: f64,
    ) -> bool {
        let Some(attach_id) = tiles.first().and_then(|t| self.lookup(*t)) else {
            tracing::warn!("graft dropped: path does not start on a tree tile");
            return false;
        };
        let path_len = (tiles.len() - 1) as u32;
        if path_len == 0 {
            return false;
        }

        let mut current = attach_id;
        let mut running_value = path_value;
        let attach = &self.nodes[attach_id.index()];
        let mut trunk_value = attach.trunk_value;
        let mut trunk_distance = attach.trunk_distance;

        for (i, &tile) in tiles.iter().enumerate().skip(1) {
            if self.by_tile.contains_key(&tile) {
                debug_assert!(false, "tile {tile} grafted twice");
                tracing::warn!(%tile, "graft truncated: tile already in tree");
                break;
            }
            trunk_distance += 1;
            trunk_value += acct.trunk_gain(board, tile);

            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(GatherNode {
                tile,
                parent: Some(current),
                children: SmallVec::new(),
                pruned: SmallVec::new(),
                value: running_value,
                turns: path_len - i as u32 + 1,
                trunk_value,
                trunk_distance,
            });
            running_value -= acct.tile_gain(board, tile);

            // A regrown tile replaces its pruned tombstone on the parent.
            let stale = self.nodes[current.index()]
                .pruned
                .iter()
                .position(|&p| self.nodes[p.index()].tile == tile);
            if let Some(pos) = stale {
                self.nodes[current.index()].pruned.remove(pos);
            }
            self.nodes[current.index()].children.push(id);
            self.by_tile.insert(tile, id);
            current = id;
        }

        // Bubble the path's totals up from the attach node to its root.
        let mut cursor = Some(attach_id);
        let mut hops = 0usize;
        while let Some(id) = cursor {
            if hops > self.nodes.len() {
                let tile = self.nodes[id.index()].tile;
                tracing::warn!(%tile, "cycle while bubbling path value; severing edge");
                self.nodes[id.index()].parent = None;
                break;
            }
            let node = &mut self.nodes[id.index()];
            node.value += path_value;
            node.turns += path_len;
            cursor = node.parent;
            hops += 1;
        }
        true
    }

    /// Detaches the whole subtree under `id`, bubbling the removed value and
    /// turns out of every ancestor. The detached node is remembered in its
    /// parent's `pruned` list. Returns the removed (value, turns).
    ///
    /// No-op for roots.
    pub fn prune_subtree(&mut self, id: NodeId) -> (f64, u32) {
        let (value, turns, parent_id) = {
            let node = &self.nodes[id.index()];
            (node.value, node.turns, node.parent)
        };
        let Some(parent_id) = parent_id else {
            return (0.0, 0);
        };

        let parent = &mut self.nodes[parent_id.index()];
        if let Some(pos) = parent.children.iter().position(|&c| c == id) {
            parent.children.remove(pos);
            parent.pruned.push(id);
        } else {
            tracing::warn!("pruned child was already detached from its parent");
        }

        let mut cursor = Some(parent_id);
        let mut hops = 0usize;
        while let Some(pid) = cursor {
            if hops > self.nodes.len() {
                tracing::warn!("cycle while bubbling prune; walk aborted");
                break;
            }
            let node = &mut self.nodes[pid.index()];
            node.value -= value;
            node.turns -= turns;
            cursor = node.parent;
            hops += 1;
        }

        // Remove the subtree from the live lookup; arena slots remain as
        // tombstones so the parent's pruned list stays addressable.
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let node = &self.nodes[cur.index()];
            if self.by_tile.get(&node.tile) == Some(&cur) {
                self.by_tile.remove(&node.tile);
            }
            stack.extend(node.children.iter().copied());
        }

        (value, turns)
    }

    /// Recomputes every live node's value/turns bottom-up and trunk sums
    /// top-down from the board state, replacing the incrementally maintained
    /// numbers. Returns the (turns, value) totals.
    pub fn recalculate(
        &mut self,
        board: &(impl Board + ?Sized),
        acct: &Accounting<'_>,
    ) -> (u32, f64) {
        let order = self.topological();

        for &id in order.iter().rev() {
            let node = &self.nodes[id.index()];
            let is_root = node.parent.is_none();
            let mut value = if is_root {
                0.0
            } else {
                acct.tile_gain(board, node.tile)
            };
            let mut turns = if is_root { 0 } else { 1 };
            let children = node.children.clone();
            for &child in &children {
                let child_node = &self.nodes[child.index()];
                value += child_node.value;
                turns += child_node.turns;
            }
            let node = &mut self.nodes[id.index()];
            node.value = value;
            node.turns = turns;
        }

        for &id in &order {
            let (parent_trunk_value, parent_trunk_distance) = match self.nodes[id.index()].parent {
                None => {
                    let node = &mut self.nodes[id.index()];
                    node.trunk_value = 0.0;
                    node.trunk_distance = 0;
                    continue;
                }
                Some(parent) => {
                    let parent = &self.nodes[parent.index()];
                    (parent.trunk_value, parent.trunk_distance)
                }
            };
            let tile = self.nodes[id.index()].tile;
            let gain = acct.trunk_gain(board, tile);
            let node = &mut self.nodes[id.index()];
            node.trunk_value = parent_trunk_value + gain;
            node.trunk_distance = parent_trunk_distance + 1;
        }

        self.totals()
    }

    /// Checks the structural invariants: every live node reachable from a
    /// root exactly once, parents live, turn counts consistent.
    pub fn verify(&self) -> Result<(), TreeError> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = self.roots.to_vec();
        while let Some(id) = stack.pop() {
            if seen[id.index()] {
                return Err(TreeError::Cycle(self.nodes[id.index()].tile));
            }
            seen[id.index()] = true;
            let node = &self.nodes[id.index()];
            let expected: u32 = node
                .children
                .iter()
                .map(|c| self.nodes[c.index()].turns)
                .sum();
            let expected = if node.parent.is_some() {
                expected + 1
            } else {
                expected
            };
            if node.turns != expected {
                return Err(TreeError::TurnMismatch {
                    tile: node.tile,
                    actual: node.turns,
                    expected,
                });
            }
            stack.extend(node.children.iter().copied());
        }
        for (&tile, &id) in &self.by_tile {
            if let Some(parent) = self.nodes[id.index()].parent {
                if !self.is_live(parent) {
                    return Err(TreeError::MissingParent {
                        child: tile,
                        parent: self.nodes[parent.index()].tile,
                    });
                }
            }
        }
        Ok(())
    }

    /// Flattens the tree into one executable move per turn: every node moves
    /// before its parent, furthest branches first.
    pub fn to_moves(&self) -> Vec<Move> {
        let mut pending: HashMap<NodeId, usize> = HashMap::new();
        let mut heap = std::collections::BinaryHeap::new();
        for id in self.topological() {
            let node = &self.nodes[id.index()];
            pending.insert(id, node.children.len());
            if node.children.is_empty() && node.parent.is_some() {
                heap.push((node.trunk_distance, F64Key(node.value), id));
            }
        }

        let mut moves = Vec::new();
        while let Some((_, _, id)) = heap.pop() {
            let node = &self.nodes[id.index()];
            let Some(parent_id) = node.parent else {
                continue;
            };
            moves.push(Move {
                from: node.tile,
                to: self.nodes[parent_id.index()].tile,
            });
            if let Some(left) = pending.get_mut(&parent_id) {
                *left -= 1;
                if *left == 0 {
                    let parent = &self.nodes[parent_id.index()];
                    if parent.parent.is_some() {
                        heap.push((parent.trunk_distance, F64Key(parent.value), parent_id));
                    }
                }
            }
        }
        moves
    }
}

/// Total order over f64 for heap keys.
#[derive(Debug, Clone, Copy, PartialEq)]
struct F64Key(f64);

impl Eq for F64Key {}

impl PartialOrd for F64Key {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for F64Key {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::PlayerId;

    /// Straight line of friendly tiles with the given armies.
    struct LineBoard {
        army: Vec<i64>,
        adj: Vec<Vec<TileId>>,
    }

    impl LineBoard {
        fn new(army: &[i64]) -> Self {
            let n = army.len();
            let adj = (0..n)
                .map(|i| {
                    let mut out = Vec::new();
                    if i > 0 {
                        out.push(TileId(i as u32 - 1));
                    }
                    if i + 1 < n {
                        out.push(TileId(i as u32 + 1));
                    }
                    out
                })
                .collect();
            Self {
                army: army.to_vec(),
                adj,
            }
        }
    }

    impl Board for LineBoard {
        fn tile_count(&self) -> usize {
            self.army.len()
        }
        fn neighbors(&self, tile: TileId) -> &[TileId] {
            &self.adj[tile.index()]
        }
        fn owner(&self, _tile: TileId) -> Option<PlayerId> {
            Some(PlayerId(0))
        }
        fn army(&self, tile: TileId) -> i64 {
            self.army[tile.index()]
        }
        fn is_obstacle(&self, _tile: TileId) -> bool {
            false
        }
        fn is_fortified(&self, _tile: TileId) -> bool {
            false
        }
    }

    fn line_tree() -> (LineBoard, GatherTree) {
        // root(10) <- 5 <- 5 <- 5, path value 3 * (5 - 1) = 12
        let board = LineBoard::new(&[10, 5, 5, 5]);
        let acct = Accounting::new(PlayerId(0));
        let mut tree = GatherTree::new();
        tree.add_root(TileId(0));
        let grafted = tree.graft_path(
            &board,
            &acct,
            &[TileId(0), TileId(1), TileId(2), TileId(3)],
            12.0,
        );
        assert!(grafted);
        (board, tree)
    }

    #[test]
    fn graft_sets_subtree_values_and_turns() {
        let (_, tree) = line_tree();
        let (turns, value) = tree.totals();
        assert_eq!(turns, 3);
        assert_eq!(value, 12.0);

        let leaf = tree.lookup(TileId(3)).unwrap();
        assert_eq!(tree.node(leaf).turns, 1);
        assert_eq!(tree.node(leaf).value, 4.0);
        assert_eq!(tree.node(leaf).trunk_distance, 3);
        tree.verify().unwrap();
    }

    #[test]
    fn recalculate_reproduces_incremental_totals() {
        let (board, mut tree) = line_tree();
        let acct = Accounting::new(PlayerId(0));
        let before = tree.totals();
        let after = tree.recalculate(&board, &acct);
        assert_eq!(before.0, after.0);
        assert!((before.1 - after.1).abs() < 1e-9);
    }

    #[test]
    fn prune_subtree_bubbles_removal() {
        let (_, mut tree) = line_tree();
        let mid = tree.lookup(TileId(2)).unwrap();
        let (value, turns) = tree.prune_subtree(mid);
        assert_eq!(turns, 2);
        assert_eq!(value, 8.0);

        let (total_turns, total_value) = tree.totals();
        assert_eq!(total_turns, 1);
        assert_eq!(total_value, 4.0);
        assert!(tree.lookup(TileId(2)).is_none());
        assert!(tree.lookup(TileId(3)).is_none());
        tree.verify().unwrap();

        // the parent remembers the pruned branch for regrowth
        let parent = tree.lookup(TileId(1)).unwrap();
        assert_eq!(tree.node(parent).pruned.len(), 1);
    }

    #[test]
    fn regraft_clears_pruned_record() {
        let (board, mut tree) = line_tree();
        let acct = Accounting::new(PlayerId(0));
        let mid = tree.lookup(TileId(2)).unwrap();
        tree.prune_subtree(mid);

        assert!(tree.graft_path(&board, &acct, &[TileId(1), TileId(2), TileId(3)], 8.0));
        let parent = tree.lookup(TileId(1)).unwrap();
        assert!(tree.node(parent).pruned.is_empty());
        assert_eq!(tree.totals(), (3, 12.0));
        tree.verify().unwrap();
    }

    #[test]
    fn moves_emit_children_before_parents() {
        let (_, tree) = line_tree();
        let moves = tree.to_moves();
        assert_eq!(moves.len(), 3);
        assert_eq!(
            moves,
            vec![
                Move {
                    from: TileId(3),
                    to: TileId(2)
                },
                Move {
                    from: TileId(2),
                    to: TileId(1)
                },
                Move {
                    from: TileId(1),
                    to: TileId(0)
                },
            ]
        );
    }

    #[test]
    fn graft_requires_attach_tile() {
        let board = LineBoard::new(&[1, 1]);
        let acct = Accounting::new(PlayerId(0));
        let mut tree = GatherTree::new();
        tree.add_root(TileId(0));
        assert!(!tree.graft_path(&board, &acct, &[TileId(1), TileId(0)], 0.0));
        assert_eq!(tree.totals(), (0, 0.0));
    }
}
