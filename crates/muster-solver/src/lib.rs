//! Muster Gather Planners
//!
//! This crate provides the two planning algorithms built on the
//! `muster-search` primitives:
//! - [`GatherPlanner`] - the iterative, knapsack-driven gather-tree builder
//!   with its per-round [`prune`] pass
//! - [`prune_reconnect`] - the rootless connected-set variant: over-include,
//!   then alternately prune and reconnect
//!
//! Both run single planning passes against a read-only board snapshot and
//! honor cooperative wall-clock deadlines; neither ever fails - "nothing
//! gatherable" is an empty plan, not an error.

pub mod iterative;
pub mod options;
pub mod prune;
pub mod set_prune;

pub use iterative::{GatherPlan, GatherPlanner};
pub use options::GatherOptions;
pub use prune::{prune_to_turns, prune_until, PruneKey, PruneOutcome};
pub use set_prune::{prune_reconnect, ConnectedSet};
