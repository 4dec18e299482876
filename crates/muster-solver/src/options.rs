//! Planner options and the ordered accumulator records the searches run on.

use std::collections::HashSet;

use muster_config::PlannerConfig;
use muster_core::{Accounting, Deadline, PlayerId, TileId};

/// Recognized configuration of a gather planning pass.
#[derive(Debug, Clone, Default)]
pub struct GatherOptions {
    /// Maximum moves the plan may consume.
    pub turns: u32,
    /// Count the true cost of captured hostile tiles in the gathered value
    /// instead of friendly force only.
    pub count_captured_cost: bool,
    /// Permit paths whose running army sum is negative (defense scenarios
    /// may tolerate not fully capturing a hostile position).
    pub allow_negative: bool,
    /// Tiles the planner must never stand on.
    pub forbidden: HashSet<TileId>,
    /// Tiles whose force contributes nothing when traversed.
    pub zero_value: HashSet<TileId>,
    /// Obstacles that may be traversed anyway.
    pub passable_overrides: HashSet<TileId>,
    /// External per-tile priority scalar added to gathered value, indexed by
    /// tile id. Must cover the whole board when present.
    pub priority_bonus: Option<Vec<f64>>,
    /// Soft wall-clock cutoff for the whole pass.
    pub deadline: Deadline,
    /// Coarser checkpoints, fewer rounds, less optimal trees.
    pub fast_mode: bool,
}

impl GatherOptions {
    pub fn new(turns: u32) -> Self {
        Self {
            turns,
            ..Self::default()
        }
    }

    /// Builds options from a [`PlannerConfig`].
    pub fn from_config(config: &PlannerConfig) -> Self {
        let mut options = Self::new(config.budget.turns);
        options.count_captured_cost = config.accounting.count_captured_cost;
        options.allow_negative = config.accounting.allow_negative;
        options.fast_mode = config.limits.fast_mode;
        if let Some(limit) = config.time_limit() {
            options.deadline = Deadline::after(limit);
        }
        options
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_count_captured_cost(mut self, enabled: bool) -> Self {
        self.count_captured_cost = enabled;
        self
    }

    pub fn with_allow_negative(mut self, enabled: bool) -> Self {
        self.allow_negative = enabled;
        self
    }

    pub fn with_forbidden(mut self, tiles: impl IntoIterator<Item = TileId>) -> Self {
        self.forbidden.extend(tiles);
        self
    }

    pub fn with_zero_value(mut self, tiles: impl IntoIterator<Item = TileId>) -> Self {
        self.zero_value.extend(tiles);
        self
    }

    pub fn with_passable_overrides(mut self, tiles: impl IntoIterator<Item = TileId>) -> Self {
        self.passable_overrides.extend(tiles);
        self
    }

    pub fn with_priority_bonus(mut self, bonus: Vec<f64>) -> Self {
        self.priority_bonus = Some(bonus);
        self
    }

    pub fn with_fast_mode(mut self, enabled: bool) -> Self {
        self.fast_mode = enabled;
        self
    }

    /// The value-accounting view of these options for `player`.
    pub fn accounting(&self, player: PlayerId) -> Accounting<'_> {
        Accounting {
            player,
            count_captured_cost: self.count_captured_cost,
            zero_value: if self.zero_value.is_empty() {
                None
            } else {
                Some(&self.zero_value)
            },
            priority_bonus: self.priority_bonus.as_deref(),
        }
    }
}

/// Search accumulator of the gather searches. Lower compares as better;
/// `score` leads so the queue expands high-density short branches first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GatherPriority {
    pub score: f64,
    pub real_dist: u32,
    /// Negated gathered sum: one per move, minus friendly force picked up.
    pub neg_gathered: f64,
    /// Negated raw army sum including hostile force crossed.
    pub neg_army: f64,
}

impl GatherPriority {
    /// Frontier seeds carry maximum priority so they are expanded (and
    /// claimed by the visited set) before any path could route through them.
    pub fn seed() -> Self {
        Self {
            score: -1e11,
            real_dist: 0,
            neg_gathered: 0.0,
            neg_army: 0.0,
        }
    }
}

impl Eq for GatherPriority {}

impl PartialOrd for GatherPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GatherPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.real_dist.cmp(&other.real_dist))
            .then_with(|| self.neg_gathered.total_cmp(&other.neg_gathered))
            .then_with(|| self.neg_army.total_cmp(&other.neg_army))
    }
}

/// Candidate-terminal value; higher compares as better.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub(crate) struct GatherValue {
    pub gathered: f64,
    pub army: f64,
    pub real_dist: u32,
}
