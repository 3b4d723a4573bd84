use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::stat::{Stat, Stats};

/// One narrative advance or decision taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
}

/// A rubric entry that matched at outcome time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteracyDetail {
    pub id: String,
    pub dimension: Option<String>,
    pub explanation: Option<String>,
}

/// Rubric result, filled once when an outcome node is reached.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiteracyScore {
    pub score: i32,
    pub max_score: i32,
    pub details: Vec<LiteracyDetail>,
}

/// A snapshot of one playthrough.
///
/// Every engine call takes a state by reference and returns a new one, so
/// earlier snapshots stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub node: String,
    pub persona: String,
    pub location: String,
    #[serde(flatten)]
    pub stats: Stats,
    pub flags: FxHashSet<String>,
    /// Multi-routers already fired. Kept apart from player flags.
    #[serde(default)]
    pub router_marks: FxHashSet<String>,
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub feedback_queue: VecDeque<String>,
    #[serde(default)]
    pub router_return_node: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub outcome_description: Option<String>,
    #[serde(default)]
    pub literacy: Option<LiteracyScore>,
}

impl GameState {
    pub fn new(node: &str, persona: &str, location: &str, stats: Stats) -> Self {
        Self {
            node: node.to_string(),
            persona: persona.to_string(),
            location: location.to_string(),
            stats,
            flags: FxHashSet::default(),
            router_marks: FxHashSet::default(),
            history: Vec::new(),
            feedback_queue: VecDeque::new(),
            router_return_node: None,
            outcome: None,
            outcome_description: None,
            literacy: None,
        }
    }

    pub fn value(&self, stat: Stat) -> i32 {
        self.stats.get(stat)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Add a flag. Returns false if it was already present.
    pub fn add_flag(&mut self, flag: &str) -> bool {
        if self.flags.contains(flag) {
            return false;
        }
        self.flags.insert(flag.to_string())
    }

    /// Whether an outcome has been scored on this state.
    pub fn is_finished(&self) -> bool {
        self.literacy.is_some()
    }

    /// Whether a multi-router excursion is still pending.
    pub fn in_feedback(&self) -> bool {
        !self.feedback_queue.is_empty() || self.router_return_node.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state() -> GameState {
        GameState::new("START", "Student", "River", Stats::default())
    }

    #[test]
    fn add_flag_deduplicates() {
        let mut state = make_state();
        assert!(state.add_flag("KIT"));
        assert!(!state.add_flag("KIT"));
        assert_eq!(state.flags.len(), 1);
        assert!(state.has_flag("KIT"));
        assert!(!state.has_flag("kit"));
    }

    #[test]
    fn new_state_is_not_finished() {
        let state = make_state();
        assert!(!state.is_finished());
        assert!(!state.in_feedback());
        assert!(state.history.is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let mut original = make_state();
        original.add_flag("A");
        let mut copy = original.clone();
        copy.add_flag("B");
        copy.feedback_queue.push_back("X".to_string());
        assert!(!original.has_flag("B"));
        assert!(original.feedback_queue.is_empty());
    }

    #[test]
    fn serializes_stats_inline() {
        let mut state = make_state();
        state.stats.set(Stat::S, 4);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["S"], 4);
        assert_eq!(json["node"], "START");
        let back: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
