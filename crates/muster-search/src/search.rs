//! Generalized best-first path search from a weighted multi-source frontier.
//!
//! This is a generalized Dijkstra: edge cost is implicit in the
//! caller-supplied `priority` step function, so the accumulator ordering
//! must be monotonic along any explored path for the global visited set to
//! be sound. Value, expansion priority, and pruning are all caller-defined
//! pure functions over an opaque accumulator type.
//!
//! Every invocation owns its frontier and visited set; nothing is shared
//! between calls.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap, HashMap, HashSet};

use muster_core::{Board, Deadline, TileId};

/// Deadline poll mask: the clock is read once per this many pops.
const DEADLINE_CHECK_MASK: u64 = 0x3F;

/// Total order over f64, usable as a search value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrdF64(pub f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One seeded start position.
#[derive(Debug, Clone)]
pub struct FrontierEntry<P> {
    pub tile: TileId,
    pub priority: P,
    /// Distance the start already sits at (e.g. trunk distance in a tree).
    pub distance: u32,
}

/// Search limits and board-level filters.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig<'a> {
    /// Maximum absolute distance (including frontier start offsets).
    pub max_depth: u32,
    /// Maximum path length in moves from a start tile.
    pub max_length: u32,
    /// Tiles the search must never stand on.
    pub forbidden: Option<&'a HashSet<TileId>>,
    /// Obstacle tiles that may be traversed anyway.
    pub passable: Option<&'a HashSet<TileId>>,
    /// Refuse to path through fortified tiles nobody owns.
    pub block_unclaimed_fortified: bool,
    pub deadline: Deadline,
    pub max_iterations: u64,
}

impl Default for SearchConfig<'_> {
    fn default() -> Self {
        Self {
            max_depth: u32::MAX,
            max_length: u32::MAX,
            forbidden: None,
            passable: None,
            block_unclaimed_fortified: true,
            deadline: Deadline::unbounded(),
            max_iterations: u64::MAX,
        }
    }
}

/// A path discovered by the search, source first, terminal last, carrying
/// the terminal's accumulator and the value the caller assigned it.
#[derive(Debug, Clone)]
pub struct FoundPath<P, V> {
    pub source: TileId,
    pub tiles: Vec<TileId>,
    /// Absolute distance of the terminal (start offset included).
    pub distance: u32,
    pub priority: P,
    pub value: V,
}

impl<P, V> FoundPath<P, V> {
    /// Path length in moves.
    pub fn len(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tail(&self) -> TileId {
        *self.tiles.last().expect("paths are never tile-less")
    }
}

/// Skip callback that skips nothing.
pub fn no_skip<P>(_tile: TileId, _priority: &P) -> bool {
    false
}

/// A single search invocation: seed the frontier, then consume it with one
/// of the run methods.
///
/// Type parameter `P` is the caller's accumulator; lower compares as better
/// and drives the expansion order.
#[derive(Debug, Clone)]
pub struct PathSearch<'a, P> {
    frontier: Vec<FrontierEntry<P>>,
    config: SearchConfig<'a>,
}

impl<'a, P: Ord + Clone> PathSearch<'a, P> {
    pub fn new(config: SearchConfig<'a>) -> Self {
        Self {
            frontier: Vec::new(),
            config,
        }
    }

    /// Adds a start position.
    pub fn seed(&mut self, tile: TileId, priority: P, distance: u32) {
        self.frontier.push(FrontierEntry {
            tile,
            priority,
            distance,
        });
    }

    pub fn seed_count(&self) -> usize {
        self.frontier.len()
    }

    /// Runs to exhaustion (or the ceiling) and returns the single best path
    /// overall, or `None` when nothing satisfied the value function.
    pub fn best_path<B, V, FP, FS, FV>(
        self,
        board: &B,
        priority_fn: FP,
        skip_fn: FS,
        value_fn: FV,
    ) -> Option<FoundPath<P, V>>
    where
        B: Board + ?Sized,
        V: PartialOrd,
        FP: FnMut(TileId, &P) -> Option<P>,
        FS: FnMut(TileId, &P) -> bool,
        FV: FnMut(TileId, &P) -> Option<V>,
    {
        let mut best: Option<Hit<P, V>> = None;
        let traces = self.drive(
            board,
            priority_fn,
            skip_fn,
            value_fn,
            |hit, best: &mut Option<Hit<P, V>>| {
                let improves = best
                    .as_ref()
                    .is_none_or(|current| hit.value > current.value);
                if improves {
                    *best = Some(hit);
                }
            },
            &mut best,
        );
        best.map(|hit| hit.into_path(&traces))
    }

    /// Best terminal path per frontier source. Paths never overlap: the
    /// visited set is shared across all sources.
    pub fn best_path_per_source<B, V, FP, FS, FV>(
        self,
        board: &B,
        priority_fn: FP,
        skip_fn: FS,
        value_fn: FV,
    ) -> HashMap<TileId, FoundPath<P, V>>
    where
        B: Board + ?Sized,
        V: PartialOrd,
        FP: FnMut(TileId, &P) -> Option<P>,
        FS: FnMut(TileId, &P) -> bool,
        FV: FnMut(TileId, &P) -> Option<V>,
    {
        let mut best: HashMap<TileId, Hit<P, V>> = HashMap::new();
        let traces = self.drive(
            board,
            priority_fn,
            skip_fn,
            value_fn,
            |hit, best: &mut HashMap<TileId, Hit<P, V>>| {
                let improves = best
                    .get(&hit.source)
                    .is_none_or(|current| hit.value > current.value);
                if improves {
                    best.insert(hit.source, hit);
                }
            },
            &mut best,
        );
        best.into_values()
            .map(|hit| (hit.source, hit.into_path(&traces)))
            .collect()
    }

    /// Best path per (source, distance) pair: at most one candidate per turn
    /// count per source, ready to feed the knapsack selector. A longer path
    /// is only kept when strictly better than the source's next-shorter one.
    pub fn best_path_per_source_per_distance<B, V, FP, FS, FV>(
        self,
        board: &B,
        priority_fn: FP,
        skip_fn: FS,
        value_fn: FV,
    ) -> HashMap<TileId, Vec<FoundPath<P, V>>>
    where
        B: Board + ?Sized,
        V: PartialOrd,
        FP: FnMut(TileId, &P) -> Option<P>,
        FS: FnMut(TileId, &P) -> bool,
        FV: FnMut(TileId, &P) -> Option<V>,
    {
        let mut best: HashMap<TileId, BTreeMap<u32, Hit<P, V>>> = HashMap::new();
        let traces = self.drive(
            board,
            priority_fn,
            skip_fn,
            value_fn,
            |hit, best: &mut HashMap<TileId, BTreeMap<u32, Hit<P, V>>>| {
                let by_distance = best.entry(hit.source).or_default();
                let beats_shorter = hit.distance == 0
                    || by_distance
                        .get(&(hit.distance - 1))
                        .is_none_or(|shorter| shorter.value < hit.value);
                if !beats_shorter {
                    return;
                }
                let improves = by_distance
                    .get(&hit.distance)
                    .is_none_or(|current| hit.value > current.value);
                if improves {
                    by_distance.insert(hit.distance, hit);
                }
            },
            &mut best,
        );
        best.into_iter()
            .map(|(source, by_distance)| {
                let paths = by_distance
                    .into_values()
                    .map(|hit| hit.into_path(&traces))
                    .collect();
                (source, paths)
            })
            .collect()
    }

    fn drive<B, V, FP, FS, FV, A>(
        mut self,
        board: &B,
        mut priority_fn: FP,
        mut skip_fn: FS,
        mut value_fn: FV,
        mut offer: impl FnMut(Hit<P, V>, &mut A),
        acc: &mut A,
    ) -> Vec<Trace>
    where
        B: Board + ?Sized,
        V: PartialOrd,
        FP: FnMut(TileId, &P) -> Option<P>,
        FS: FnMut(TileId, &P) -> bool,
        FV: FnMut(TileId, &P) -> Option<V>,
    {
        let mut traces: Vec<Trace> = Vec::with_capacity(self.frontier.len());
        let mut heap = BinaryHeap::with_capacity(self.frontier.len());
        for entry in self.frontier.drain(..) {
            let trace = traces.len() as u32;
            traces.push(Trace {
                tile: entry.tile,
                prev: None,
            });
            heap.push(Reverse(Entry {
                priority: entry.priority,
                distance: entry.distance,
                moves: 0,
                trace,
                source: entry.tile,
            }));
        }

        let mut visited = vec![false; board.tile_count()];
        let mut iterations: u64 = 0;

        while let Some(Reverse(entry)) = heap.pop() {
            iterations += 1;
            if ((iterations & DEADLINE_CHECK_MASK) == 0 && self.config.deadline.expired())
                || iterations > self.config.max_iterations
            {
                tracing::debug!(iterations, "path search hit its ceiling, keeping best so far");
                break;
            }

            let tile = traces[entry.trace as usize].tile;
            if visited[tile.index()] {
                continue;
            }
            visited[tile.index()] = true;
            if self.config.forbidden.is_some_and(|f| f.contains(&tile)) {
                continue;
            }

            if let Some(value) = value_fn(tile, &entry.priority) {
                offer(
                    Hit {
                        source: entry.source,
                        distance: entry.distance,
                        trace: entry.trace,
                        priority: entry.priority.clone(),
                        value,
                    },
                    acc,
                );
            }

            if entry.distance >= self.config.max_depth || entry.moves >= self.config.max_length {
                continue;
            }

            let prev_tile = traces[entry.trace as usize]
                .prev
                .map(|p| traces[p as usize].tile);
            for &next in board.neighbors(tile) {
                if Some(next) == prev_tile || visited[next.index()] {
                    continue;
                }
                if board.is_obstacle(next)
                    && !self.config.passable.is_some_and(|p| p.contains(&next))
                {
                    continue;
                }
                if self.config.block_unclaimed_fortified
                    && board.is_fortified(next)
                    && board.owner(next).is_none()
                {
                    continue;
                }
                let Some(next_priority) = priority_fn(next, &entry.priority) else {
                    continue;
                };
                if skip_fn(next, &next_priority) {
                    continue;
                }
                let trace = traces.len() as u32;
                traces.push(Trace {
                    tile: next,
                    prev: Some(entry.trace),
                });
                heap.push(Reverse(Entry {
                    priority: next_priority,
                    distance: entry.distance + 1,
                    moves: entry.moves + 1,
                    trace,
                    source: entry.source,
                }));
            }
        }

        traces
    }
}

#[derive(Debug, Clone, Copy)]
struct Trace {
    tile: TileId,
    prev: Option<u32>,
}

/// A candidate terminal accepted by the value function.
struct Hit<P, V> {
    source: TileId,
    distance: u32,
    trace: u32,
    priority: P,
    value: V,
}

impl<P, V> Hit<P, V> {
    fn into_path(self, traces: &[Trace]) -> FoundPath<P, V> {
        let mut tiles = Vec::new();
        let mut cursor = self.trace;
        loop {
            let trace = &traces[cursor as usize];
            tiles.push(trace.tile);
            match trace.prev {
                Some(prev) => cursor = prev,
                None => break,
            }
        }
        tiles.reverse();
        FoundPath {
            source: self.source,
            tiles,
            distance: self.distance,
            priority: self.priority,
            value: self.value,
        }
    }
}

struct Entry<P> {
    priority: P,
    distance: u32,
    moves: u32,
    trace: u32,
    source: TileId,
}

impl<P: Ord> PartialEq for Entry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl<P: Ord> Eq for Entry<P> {}

impl<P: Ord> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Ord> Ord for Entry<P> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.distance.cmp(&other.distance))
            .then_with(|| self.trace.cmp(&other.trace))
    }
}
