//! Exact knapsack selection.
//!
//! The planner's per-round candidate counts and turn capacities are small,
//! so an exact DP is affordable and removes the "wrong combination of
//! single-turn paths" failure mode a greedy selector would reintroduce.
//!
//! Values must be integers: back-substitution recovers the chosen items by
//! exact value equality, which floating point would break. Callers with
//! fractional values scale by a fixed factor first.

use thiserror::Error;

/// An item offered to [`solve_multiple_choice_knapsack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnapsackItem {
    /// Group index. Groups must be contiguous from 0 with no gaps, and
    /// items of one group must be adjacent in the input slice.
    pub group: usize,
    /// Weight in turns.
    pub weight: u32,
    /// Scaled integer value.
    pub value: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnapsackError {
    #[error("item groups must start at 0 and increment by one; group {found} followed {last}")]
    NonContiguousGroups { found: usize, last: usize },
}

/// Selects at most one item per group maximizing total value within
/// `capacity`. Returns the best value and the indices of the chosen items.
///
/// Deterministic for deterministic input order. O(groups x capacity x
/// items-per-group).
///
/// # Example
///
/// ```
/// use muster_search::{solve_multiple_choice_knapsack, KnapsackItem};
///
/// let items = [
///     KnapsackItem { group: 0, weight: 10, value: 60 },
///     KnapsackItem { group: 1, weight: 20, value: 100 },
///     KnapsackItem { group: 1, weight: 30, value: 120 },
/// ];
/// let (best, chosen) = solve_multiple_choice_knapsack(&items, 50).unwrap();
/// assert_eq!(best, 180);
/// assert_eq!(chosen, vec![0, 2]);
/// ```
pub fn solve_multiple_choice_knapsack(
    items: &[KnapsackItem],
    capacity: u32,
) -> Result<(i64, Vec<usize>), KnapsackError> {
    if items.is_empty() {
        return Ok((0, Vec::new()));
    }

    // Group boundary scan; validates contiguity.
    let mut group_bounds: Vec<(usize, usize)> = Vec::new();
    let mut last_group = usize::MAX;
    let mut group_start = 0;
    for (i, item) in items.iter().enumerate() {
        if last_group == usize::MAX {
            if item.group != 0 {
                return Err(KnapsackError::NonContiguousGroups {
                    found: item.group,
                    last: 0,
                });
            }
        } else if item.group != last_group {
            if item.group != last_group + 1 {
                return Err(KnapsackError::NonContiguousGroups {
                    found: item.group,
                    last: last_group,
                });
            }
            group_bounds.push((group_start, i));
            group_start = i;
        }
        last_group = item.group;
    }
    group_bounds.push((group_start, items.len()));

    let n = items.len();
    let capacity = capacity as usize;
    // table[i][w]: best value using items[..i] with weight budget w, at most
    // one item taken from the group items[i-1] belongs to.
    let mut table = vec![vec![0i64; capacity + 1]; n + 1];

    for cap in 1..=capacity {
        for i in 1..=n {
            let item = &items[i - 1];
            let weight = item.weight as usize;
            if weight <= cap {
                let sub_row = cap - weight;
                // The best predecessor must come from the previous group so
                // this item is the only take from its own group.
                let mut sub_max = 0;
                if item.group > 0 {
                    let (prev_start, prev_end) = group_bounds[item.group - 1];
                    for j in (prev_start + 1)..=prev_end {
                        sub_max = sub_max.max(table[j][sub_row]);
                    }
                }
                table[i][cap] = (sub_max + item.value).max(table[i - 1][cap]);
            } else {
                table[i][cap] = table[i - 1][cap];
            }
        }
    }

    let best = table[n][capacity];

    // Back-substitute: walk rows in reverse, taking an item whenever the
    // optimum could not have come from the row above. Exact equality is what
    // makes integer values mandatory.
    let mut chosen = Vec::new();
    let mut remaining = best;
    let mut cap = capacity as i64;
    let mut last_taken_group = usize::MAX;
    for i in (1..=n).rev() {
        if remaining <= 0 {
            break;
        }
        debug_assert!(cap >= 0, "negative capacity during back-substitution");
        if remaining == table[i - 1][cap.max(0) as usize] {
            continue;
        }
        let item = &items[i - 1];
        if item.group == last_taken_group {
            continue;
        }
        last_taken_group = item.group;
        chosen.push(i - 1);
        remaining -= item.value;
        cap -= item.weight as i64;
    }
    chosen.reverse();

    Ok((best, chosen))
}

/// Plain 0/1 knapsack over parallel weight/value slices. Returns the best
/// value and chosen indices.
pub fn solve_knapsack(weights: &[u32], values: &[i64], capacity: u32) -> (i64, Vec<usize>) {
    debug_assert_eq!(weights.len(), values.len());
    let n = weights.len();
    let capacity = capacity as usize;
    let mut table = vec![vec![0i64; capacity + 1]; n + 1];
    for i in 1..=n {
        for cap in 0..=capacity {
            let weight = weights[i - 1] as usize;
            table[i][cap] = if weight <= cap {
                (values[i - 1] + table[i - 1][cap - weight]).max(table[i - 1][cap])
            } else {
                table[i - 1][cap]
            };
        }
    }

    let mut chosen = Vec::new();
    let mut remaining = table[n][capacity];
    let mut cap = capacity;
    for i in (1..=n).rev() {
        if remaining <= 0 {
            break;
        }
        if remaining == table[i - 1][cap] {
            continue;
        }
        chosen.push(i - 1);
        remaining -= values[i - 1];
        cap -= weights[i - 1] as usize;
    }
    chosen.reverse();
    (table[n][capacity], chosen)
}
