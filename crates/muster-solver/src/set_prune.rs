//! Greedy prune / reconnect over connected tile sets.
//!
//! The rootless variant of the gather problem: given an over-included
//! connected superset (e.g. a Steiner-tree overshoot covering required
//! terminals), alternately drop the lowest-value tiles and re-bridge
//! whatever that disconnects, until the set matches the target size and
//! every required terminal is connected.
//!
//! Tiles that keep getting disconnected re-enter the prune queue with a
//! raised value, so the prune/reconnect alternation converges instead of
//! thrashing. When no bridge exists the result is the largest connected
//! remainder plus the explicit set of unreachable terminals - partial
//! coverage is a valid, recoverable outcome, never a failure.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use muster_core::{Board, Deadline, TileId};
use muster_search::{no_skip, DisjointTileSet, OrdF64, PathSearch, SearchConfig};

/// Outer prune/reconnect round ceiling; a convergence backstop.
const MAX_ROUNDS: usize = 64;

/// Result of [`prune_reconnect`].
#[derive(Debug, Clone)]
pub struct ConnectedSet {
    /// Members of the surviving connected component, sorted.
    pub tiles: Vec<TileId>,
    /// Aggregate value of the surviving component.
    pub value: f64,
    /// Required terminals that could not be connected, sorted; empty on
    /// full coverage.
    pub unreachable: Vec<TileId>,
}

impl ConnectedSet {
    pub fn is_complete(&self) -> bool {
        self.unreachable.is_empty()
    }
}

/// Prunes `superset` down to `target_size` tiles while keeping `required`
/// terminals connected, re-bridging through the cheapest paths whenever a
/// prune splits the set.
///
/// `values` is a per-tile scalar indexed by tile id; lower-valued tiles are
/// pruned first and bridges prefer higher-valued routes.
pub fn prune_reconnect(
    board: &(impl Board + ?Sized),
    required: &HashSet<TileId>,
    superset: &HashSet<TileId>,
    target_size: usize,
    values: &[f64],
    forbidden: Option<&HashSet<TileId>>,
    deadline: Deadline,
) -> ConnectedSet {
    let Some(root) = required.iter().min().copied() else {
        return ConnectedSet {
            tiles: Vec::new(),
            value: 0.0,
            unreachable: Vec::new(),
        };
    };

    let mut current: HashSet<TileId> = superset.union(required).copied().collect();
    if let Some(forbidden) = forbidden {
        current.retain(|t| !forbidden.contains(t) || required.contains(t));
    }

    let mut queue: BinaryHeap<Reverse<(OrdF64, TileId)>> = current
        .iter()
        .filter(|t| !required.contains(t))
        .map(|&t| Reverse((OrdF64(values[t.index()]), t)))
        .collect();
    let mut disconnects = vec![0u32; board.tile_count()];

    let excess = current.len().saturating_sub(target_size);
    let prune_per_round = if excess * 2 > target_size {
        (excess / 10).max(1)
    } else {
        5
    };

    let mut forest;
    let mut rounds = 0usize;
    loop {
        rounds += 1;

        let goal = target_size.saturating_sub(prune_per_round);
        let mut pruned = 0usize;
        while current.len() > goal {
            let Some(Reverse((_, tile))) = queue.pop() else {
                break;
            };
            if !current.remove(&tile) {
                // stale queue entry for a tile already dropped
                continue;
            }
            disconnects[tile.index()] += 1;
            pruned += 1;
        }
        tracing::debug!(rounds, pruned, remaining = current.len(), "prune phase done");

        forest = build_forest(board, &current, values);
        let added = reconnect(
            board,
            &mut forest,
            &mut current,
            root,
            values,
            &disconnects,
            required,
            forbidden,
            deadline,
            &mut queue,
        );
        tracing::debug!(
            rounds,
            added,
            size = forest.component_size(root),
            "reconnect phase done"
        );

        let all_connected = required.iter().all(|&t| forest.connected(t, root));
        if all_connected && forest.component_size(root) == target_size {
            break;
        }
        if pruned == 0 && added == 0 {
            tracing::debug!(rounds, "no forward progress, keeping best effort");
            break;
        }
        if rounds >= MAX_ROUNDS || deadline.expired() {
            tracing::debug!(rounds, "round ceiling reached");
            break;
        }
    }

    let mut tiles = forest.component_members(root);
    tiles.sort();
    let value = forest.component_value(root);
    let mut unreachable: Vec<TileId> = required
        .iter()
        .copied()
        .filter(|&t| !forest.connected(t, root))
        .collect();
    unreachable.sort();
    ConnectedSet {
        tiles,
        value,
        unreachable,
    }
}

/// Singleton-per-tile forest with every in-set adjacency merged.
fn build_forest(
    board: &(impl Board + ?Sized),
    current: &HashSet<TileId>,
    values: &[f64],
) -> DisjointTileSet {
    let mut forest = DisjointTileSet::from_tiles(current.iter().copied(), |t| values[t.index()]);
    for &tile in current {
        for &neighbor in board.neighbors(tile) {
            if current.contains(&neighbor) {
                forest.merge(tile, neighbor);
            }
        }
    }
    forest
}

/// Bridges every component disconnected from `root`, one cheapest path at a
/// time, seeding each search from the whole root component simultaneously.
/// Returns the number of tiles newly added to the set.
#[allow(clippy::too_many_arguments)]
fn reconnect(
    board: &(impl Board + ?Sized),
    forest: &mut DisjointTileSet,
    current: &mut HashSet<TileId>,
    root: TileId,
    values: &[f64],
    disconnects: &[u32],
    required: &HashSet<TileId>,
    forbidden: Option<&HashSet<TileId>>,
    deadline: Deadline,
    queue: &mut BinaryHeap<Reverse<(OrdF64, TileId)>>,
) -> usize {
    let mut added = 0usize;
    loop {
        let members: Vec<TileId> = forest.tiles().collect();
        let any_disconnected = members.iter().any(|&t| !forest.connected(t, root));
        if !any_disconnected {
            break;
        }

        let mut bridge = find_bridge(board, forest, root, values, forbidden, deadline, false);
        if bridge.is_none() {
            // retry with fortified tiles traversable before giving up
            bridge = find_bridge(board, forest, root, values, forbidden, deadline, true);
        }
        let Some(bridge) = bridge else {
            tracing::debug!("no bridging path exists, leaving remainder disconnected");
            break;
        };

        let mut prev = bridge[0];
        for &tile in &bridge {
            if current.insert(tile) {
                added += 1;
                // re-admitted tiles come back pricier each time they were
                // disconnected, so thrash dampens out
                let bumped = values[tile.index()] + 0.2 * disconnects[tile.index()] as f64;
                if !required.contains(&tile) {
                    queue.push(Reverse((OrdF64(bumped), tile)));
                }
            }
            forest.ensure(tile, values[tile.index()]);
            forest.merge(prev, tile);
            for &neighbor in board.neighbors(tile) {
                if current.contains(&neighbor) {
                    forest.merge(tile, neighbor);
                }
            }
            prev = tile;
        }

        if deadline.expired() {
            break;
        }
    }
    added
}

/// Search accumulator for bridging; lower is better. Gathered value divided
/// by distance while positive, multiplied while negative, so rich short
/// bridges win.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReconnectPriority {
    score: f64,
    dist: u32,
    neg_gathered: f64,
}

impl Eq for ReconnectPriority {}

impl PartialOrd for ReconnectPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReconnectPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.dist.cmp(&other.dist))
            .then_with(|| self.neg_gathered.total_cmp(&other.neg_gathered))
    }
}

fn find_bridge(
    board: &(impl Board + ?Sized),
    forest: &mut DisjointTileSet,
    root: TileId,
    values: &[f64],
    forbidden: Option<&HashSet<TileId>>,
    deadline: Deadline,
    allow_fortified: bool,
) -> Option<Vec<TileId>> {
    let config = SearchConfig {
        forbidden,
        block_unclaimed_fortified: !allow_fortified,
        deadline,
        ..SearchConfig::default()
    };
    let mut search = PathSearch::new(config);
    for member in forest.component_members(root) {
        search.seed(
            member,
            ReconnectPriority {
                score: -values[member.index()],
                dist: 0,
                neg_gathered: 0.0,
            },
            0,
        );
    }

    let priority_fn = |tile: TileId, p: &ReconnectPriority| {
        let neg_gathered = p.neg_gathered - values[tile.index()];
        let dist = p.dist + 1;
        let score = if neg_gathered < 0.0 {
            neg_gathered / dist as f64
        } else {
            neg_gathered * dist as f64
        };
        Some(ReconnectPriority {
            score,
            dist,
            neg_gathered,
        })
    };
    // every disconnected member is an equally valid terminal; the first one
    // popped rode the best accumulator there, so it wins
    let value_fn =
        |tile: TileId, _p: &ReconnectPriority| {
            (forest.contains(tile) && !forest.connected(tile, root)).then_some(())
        };

    search
        .best_path(board, priority_fn, no_skip, value_fn)
        .map(|path| path.tiles)
}
