/// Signed stat adjustments, clamped to authored bounds.

use crate::schema::catalog::Delta;
use crate::schema::stat::{BoundsTable, Stat};
use crate::schema::state::GameState;

/// Add each stat amount named in `delta` to the state, clamping to bounds.
///
/// Stats the delta does not name are left untouched, so an empty delta is
/// a no-op. The result stays inside bounds even if the stored value was not.
pub fn apply_delta(state: &mut GameState, delta: &Delta, bounds: &BoundsTable) {
    if delta.is_empty() {
        return;
    }
    for stat in Stat::ALL {
        if let Some(amount) = delta.get(stat) {
            let raw = state.stats.get(stat).saturating_add(amount);
            state.stats.set(stat, bounds.get(stat).clamp(raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::stat::{StatBounds, Stats};

    fn make_state() -> (GameState, BoundsTable) {
        let mut bounds = BoundsTable::uniform(StatBounds::new(0, 10));
        bounds.set(Stat::SC, StatBounds::new(-5, 5));
        let mut stats = Stats::default();
        stats.set(Stat::S, 3);
        stats.set(Stat::R, 8);
        (GameState::new("N", "Student", "River", stats), bounds)
    }

    #[test]
    fn negative_delta_clamps_at_min() {
        let (mut state, bounds) = make_state();
        apply_delta(&mut state, &Delta::from([(Stat::S, -5)]), &bounds);
        assert_eq!(state.value(Stat::S), 0);
    }

    #[test]
    fn positive_delta_clamps_at_max() {
        let (mut state, bounds) = make_state();
        apply_delta(&mut state, &Delta::from([(Stat::R, 4)]), &bounds);
        assert_eq!(state.value(Stat::R), 10);
    }

    #[test]
    fn absent_keys_untouched() {
        let (mut state, bounds) = make_state();
        apply_delta(&mut state, &Delta::from([(Stat::SC, -2)]), &bounds);
        assert_eq!(state.value(Stat::SC), -2);
        assert_eq!(state.value(Stat::S), 3);
        assert_eq!(state.value(Stat::R), 8);
    }

    #[test]
    fn empty_delta_is_noop() {
        let (mut state, bounds) = make_state();
        let before = state.clone();
        apply_delta(&mut state, &Delta::default(), &bounds);
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_keys_ignored() {
        let (mut state, bounds) = make_state();
        let delta: Delta = serde_json::from_str(r#"{"XP": 5, "S": 1}"#).unwrap();
        apply_delta(&mut state, &delta, &bounds);
        assert_eq!(state.value(Stat::S), 4);
    }

    #[test]
    fn values_stay_in_bounds_over_many_deltas() {
        let (mut state, bounds) = make_state();
        let amounts = [7, -13, 2, 100, -100, 4, -1, 9];
        for (i, amount) in amounts.iter().enumerate() {
            let stat = Stat::ALL[i % Stat::ALL.len()];
            apply_delta(&mut state, &Delta::from([(stat, *amount), (Stat::SC, *amount)]), &bounds);
            for (stat, value) in state.stats.iter() {
                assert!(bounds.get(stat).contains(value), "{} = {} out of bounds", stat, value);
            }
        }
    }
}
