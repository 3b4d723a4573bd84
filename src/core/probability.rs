/// Probability tables of conditional, weighted random effects.

use rand::Rng;

use crate::core::condition;
use crate::core::delta::apply_delta;
use crate::schema::catalog::ProbabilityEntry;
use crate::schema::stat::BoundsTable;
use crate::schema::state::GameState;

/// Entries whose condition is absent or currently holds, in authored order.
pub fn eligible_entries<'a>(
    entries: &'a [ProbabilityEntry],
    state: &GameState,
) -> Vec<&'a ProbabilityEntry> {
    entries
        .iter()
        .filter(|e| {
            e.condition
                .as_deref()
                .map_or(true, |c| condition::evaluate(c, state))
        })
        .collect()
}

/// Pick an index into `eligible` for a draw in `[0, 1)`.
///
/// Walks the list accumulating `chance`; the first entry whose running sum
/// reaches the draw wins. If rounding leaves the draw above the total, the
/// last entry wins. Returns `None` only for an empty list.
pub fn select_entry(eligible: &[&ProbabilityEntry], draw: f64) -> Option<usize> {
    if eligible.is_empty() {
        return None;
    }
    let mut cumulative = 0.0;
    for (i, entry) in eligible.iter().enumerate() {
        cumulative += entry.chance;
        if draw <= cumulative {
            return Some(i);
        }
    }
    Some(eligible.len() - 1)
}

/// Resolve a probability table against the state and apply the chosen
/// effect. Returns the index of the chosen entry within the original table.
pub fn apply_probability<R: Rng>(
    state: &mut GameState,
    entries: &[ProbabilityEntry],
    bounds: &BoundsTable,
    rng: &mut R,
) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }
    let eligible = eligible_entries(entries, state);
    if eligible.is_empty() {
        log::debug!("probability table has no eligible entries");
        return None;
    }

    let draw: f64 = rng.gen();
    let picked = select_entry(&eligible, draw)?;
    let entry = eligible[picked];
    log::debug!(
        "probability draw {:.4} picked entry {} of {} eligible",
        draw,
        picked,
        eligible.len()
    );
    apply_delta(state, &entry.effect, bounds);

    entries.iter().position(|e| std::ptr::eq(e, entry))
}
