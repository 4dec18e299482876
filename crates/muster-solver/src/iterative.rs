//! Iterative knapsack-driven gather-tree construction.
//!
//! Each round searches the current frontier for maximum value-per-turn
//! candidate paths (one per source per reachable distance), selects a
//! combination with the multiple-choice knapsack, grafts the winners, and
//! prunes back to a per-round turn checkpoint. The checkpoint starts coarse
//! and shrinks geometrically: cheap early decisions, fine late refinements,
//! guaranteed termination.

use muster_config::PlannerConfig;
use muster_core::{Board, GatherTree, Move, PlayerId, TileId};
use muster_search::{
    no_skip, solve_multiple_choice_knapsack, KnapsackItem, PathSearch, SearchConfig,
};

use crate::options::{GatherOptions, GatherPriority, GatherValue};
use crate::prune;

/// Search expansion ceiling per round; a backstop, not a tuning knob.
const MAX_SEARCH_ITERATIONS: u64 = 10_000_000;

/// A finished gather plan: the tree plus its reported totals.
#[derive(Debug, Clone)]
pub struct GatherPlan {
    pub tree: GatherTree,
    /// Total gathered value delivered to the roots.
    pub value: f64,
    /// Moves the plan consumes.
    pub turns: u32,
}

impl GatherPlan {
    /// One executable move per turn, children before parents.
    pub fn moves(&self) -> Vec<Move> {
        self.tree.to_moves()
    }

    pub fn is_empty(&self) -> bool {
        self.turns == 0
    }
}

/// The iterative gather-tree builder.
///
/// # Example
///
/// ```
/// use muster_core::{PlayerId, TileId};
/// use muster_solver::{GatherOptions, GatherPlanner};
/// use muster_test::GridBoard;
///
/// let mut board = GridBoard::open(4, 1);
/// for x in 0..4 {
///     board.claim(board.tile(x, 0), PlayerId(0), 5);
/// }
///
/// let planner = GatherPlanner::new(GatherOptions::new(3));
/// let plan = planner.plan(&board, PlayerId(0), &[board.tile(0, 0)]);
/// assert_eq!(plan.turns, 3);
/// for mv in plan.moves() {
///     // hand to the turn orchestrator
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GatherPlanner {
    options: GatherOptions,
}

impl GatherPlanner {
    pub fn new(options: GatherOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(GatherOptions::from_config(config))
    }

    pub fn options(&self) -> &GatherOptions {
        &self.options
    }

    /// Plans a gather to `roots` from scratch. Never fails: when nothing
    /// positive is reachable within the budget the plan is empty.
    pub fn plan(&self, board: &(impl Board + ?Sized), player: PlayerId, roots: &[TileId]) -> GatherPlan {
        let mut tree = GatherTree::new();
        for &root in roots {
            tree.add_root(root);
        }
        self.run(board, player, tree)
    }

    /// Continues planning from a previously built tree, e.g. after raising
    /// the turn budget. The tree's roots and grafted branches are kept;
    /// value never decreases.
    pub fn plan_from(
        &self,
        board: &(impl Board + ?Sized),
        player: PlayerId,
        prior: GatherPlan,
    ) -> GatherPlan {
        self.run(board, player, prior.tree)
    }

    fn run(&self, board: &(impl Board + ?Sized), player: PlayerId, mut tree: GatherTree) -> GatherPlan {
        let full_turns = self.options.turns;
        if full_turns == 0 || tree.is_empty() {
            let (turns, value) = tree.totals();
            return GatherPlan { tree, value, turns };
        }

        let acct = self.options.accounting(player);
        let fast = self.options.fast_mode;
        let mut per_round = if fast {
            (3 * full_turns / 4).min(7).max(full_turns / 2)
        } else {
            (full_turns / 2).min(4).max(full_turns / 4)
        }
        .max(1);

        let (start_turns, mut prev_value) = tree.totals();
        let mut turns_so_far = start_turns;
        let mut last_pruned_to = start_turns;
        let mut round = 0u32;

        while last_pruned_to < full_turns {
            round += 1;
            let Some(turns_to_gather) = full_turns.checked_sub(turns_so_far).filter(|&t| t > 0)
            else {
                break;
            };
            tracing::debug!(round, turns_to_gather, turns_so_far, "gather round");

            let candidates = self.search_round(board, player, &tree, turns_to_gather);
            if candidates.is_empty() {
                tracing::debug!(round, "no new paths found, stopping");
                break;
            }

            let mut grafted = 0u32;
            for candidate in &candidates {
                let Some(&tail) = candidate.tiles.last() else {
                    continue;
                };
                if board.army(tail) <= 1 || !board.is_friendly(tail, player) {
                    tracing::warn!(%tail, "dropping candidate path whose tail cannot move");
                    continue;
                }
                if tree.graft_path(board, &acct, &candidate.tiles, candidate.gathered) {
                    grafted += (candidate.tiles.len() - 1) as u32;
                }
            }
            if grafted == 0 {
                tracing::debug!(round, "round grafted nothing, stopping");
                break;
            }

            let (total_turns, _) = tree.totals();
            if self.options.deadline.expired() {
                if total_turns >= full_turns || round > 4 {
                    tracing::debug!(round, total_turns, "deadline reached, stopping");
                    break;
                }
                per_round += 1;
                tracing::debug!(round, per_round, "deadline reached, widening checkpoint");
            }

            // Shrink the checkpoint step; gather one level at a time near
            // the end so no cheap branch is missed.
            if round > 1 && per_round > 1 {
                per_round = if fast {
                    3 * per_round / 4 + 1
                } else {
                    3 * per_round / 5 + 1
                };
            }
            let would_be_left = full_turns as i64 - (last_pruned_to + per_round) as i64;
            if per_round > 1 {
                if fast {
                    if would_be_left <= (per_round / 2) as i64 {
                        per_round = per_round / 2 + 1;
                    }
                } else if would_be_left < per_round as i64 {
                    per_round = (per_round / 2).max(1);
                }
            }
            per_round = per_round.max(1);

            let prune_target = last_pruned_to + per_round;
            let overprune_cutoff = (prune_target / 2).max(last_pruned_to.saturating_sub(per_round));
            let outcome = prune::prune_to_turns(
                &mut tree,
                board,
                player,
                prune_target,
                overprune_cutoff,
                self.options.allow_negative,
            );
            tracing::debug!(
                round,
                turns = outcome.turns,
                value = outcome.value,
                prune_target,
                overprune_cutoff,
                "round pruned"
            );
            if outcome.value + 1e-6 < prev_value {
                tracing::warn!(
                    round,
                    value = outcome.value,
                    prev_value,
                    "round decreased total value; keeping result regardless"
                );
            }

            prev_value = outcome.value;
            turns_so_far = outcome.turns;
            last_pruned_to = prune_target;
        }

        let (turns, value) = tree.recalculate(board, &acct);
        tracing::debug!(rounds = round, turns, value, "gather planning finished");
        GatherPlan { tree, value, turns }
    }

    /// One round of candidate discovery: per-source-per-distance search plus
    /// knapsack selection, or a single full-budget search when the frontier
    /// is too small to be worth selecting over.
    fn search_round(
        &self,
        board: &(impl Board + ?Sized),
        player: PlayerId,
        tree: &GatherTree,
        turns_to_gather: u32,
    ) -> Vec<Candidate> {
        let acct = self.options.accounting(player);
        let allow_negative = self.options.allow_negative;

        let priority_fn = |tile: TileId, p: &GatherPriority| -> Option<GatherPriority> {
            let real_dist = p.real_dist + 1;
            let neg_gathered = p.neg_gathered + 1.0 - acct.contribution(board, tile) - acct.bonus(tile);
            let neg_army = p.neg_army + 1.0 - acct.army_contribution(board, tile);
            let dist = real_dist as f64;
            let score = 10_000.0 + neg_gathered / dist + 0.05 * dist * dist;
            Some(GatherPriority {
                score,
                real_dist,
                neg_gathered,
                neg_army,
            })
        };
        let value_fn = |tile: TileId, p: &GatherPriority| -> Option<GatherValue> {
            if p.neg_army >= 0.0 && !allow_negative {
                return None;
            }
            if p.neg_gathered >= 0.0 || p.real_dist == 0 {
                return None;
            }
            if board.army(tile) < 2 || !board.is_friendly(tile, player) {
                return None;
            }
            Some(GatherValue {
                gathered: -p.neg_gathered,
                army: -p.neg_army,
                real_dist: p.real_dist,
            })
        };

        let config = SearchConfig {
            max_length: turns_to_gather,
            forbidden: (!self.options.forbidden.is_empty()).then_some(&self.options.forbidden),
            passable: (!self.options.passable_overrides.is_empty())
                .then_some(&self.options.passable_overrides),
            block_unclaimed_fortified: true,
            deadline: self.options.deadline,
            max_iterations: MAX_SEARCH_ITERATIONS,
            ..SearchConfig::default()
        };
        let mut search = PathSearch::new(config);
        for id in tree.live_nodes() {
            let node = tree.node(id);
            search.seed(node.tile, GatherPriority::seed(), node.trunk_distance);
        }

        // Degenerate fallback: with this few live frontier entries there is
        // nothing worth selecting between; one full-budget path is cheaper
        // and exact.
        if search.seed_count() < (turns_to_gather / 10) as usize {
            tracing::debug!(
                seeds = search.seed_count(),
                turns_to_gather,
                "small frontier, searching one full-budget path"
            );
            return search
                .best_path(board, priority_fn, no_skip, value_fn)
                .into_iter()
                .filter(|path| path.len() > 0)
                .map(|path| Candidate {
                    gathered: path.value.gathered,
                    tiles: path.tiles,
                })
                .collect();
        }

        let per_source =
            search.best_path_per_source_per_distance(board, priority_fn, no_skip, value_fn);

        let mut sources: Vec<TileId> = per_source.keys().copied().collect();
        sources.sort();

        let mut items = Vec::new();
        let mut flat = Vec::new();
        let mut group = 0usize;
        for source in sources {
            let mut grouped = false;
            for path in &per_source[&source] {
                if path.len() == 0 {
                    continue;
                }
                items.push(KnapsackItem {
                    group,
                    weight: path.len() as u32,
                    // fixed 1000x scale: back-substitution needs integers
                    value: (path.value.gathered * 1000.0).round() as i64,
                });
                flat.push(path);
                grouped = true;
            }
            if grouped {
                group += 1;
            }
        }
        if items.is_empty() {
            return Vec::new();
        }

        match solve_multiple_choice_knapsack(&items, turns_to_gather) {
            Ok((_, chosen)) => chosen
                .into_iter()
                .map(|idx| Candidate {
                    tiles: flat[idx].tiles.clone(),
                    gathered: flat[idx].value.gathered,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(%err, "knapsack rejected candidate grouping");
                Vec::new()
            }
        }
    }
}

struct Candidate {
    tiles: Vec<TileId>,
    gathered: f64,
}
