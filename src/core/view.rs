/// Read-only projection of a state for display.

use serde::Serialize;

use crate::schema::catalog::{Catalog, Node};
use crate::schema::stat::{Stat, Stats};
use crate::schema::state::{GameState, LiteracyScore};

/// An option as the player sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: String,
    pub label: String,
    /// Gated out by `requires_flag` or `requires_value`.
    pub locked: bool,
}

/// A stat reading with its bounds, for bars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatReading {
    pub stat: Stat,
    pub label: &'static str,
    pub value: i32,
    pub min: i32,
    pub max: i32,
}

/// What the presentation layer should show for a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeView {
    Narrative {
        node: String,
        text: String,
    },
    Decision {
        node: String,
        text: String,
        options: Vec<OptionView>,
    },
    Outcome {
        node: String,
        text: String,
        outcome: Option<String>,
        description: Option<String>,
        literacy: Option<LiteracyScore>,
        skill: Option<StatReading>,
    },
    /// Resting on a router that could not route.
    Stalled { node: String },
    /// The state points at a node the catalog does not have.
    Missing { node: String },
}

/// Replace `{S}`, `{R}`, ... placeholders with current stat values.
pub fn render_text(text: &str, stats: &Stats) -> String {
    let mut out = text.to_string();
    for (stat, value) in stats.iter() {
        let placeholder = format!("{{{}}}", stat.key());
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &value.to_string());
        }
    }
    out
}

/// Every stat with its bounds, in canonical order.
pub fn stat_readings(state: &GameState, catalog: &Catalog) -> Vec<StatReading> {
    Stat::ALL
        .iter()
        .map(|stat| reading(*stat, state, catalog))
        .collect()
}

fn reading(stat: Stat, state: &GameState, catalog: &Catalog) -> StatReading {
    let bounds = catalog.bounds().get(stat);
    StatReading {
        stat,
        label: stat.label(),
        value: state.value(stat),
        min: bounds.min,
        max: bounds.max,
    }
}

/// Build the view for a state.
pub fn view(state: &GameState, catalog: &Catalog) -> NodeView {
    let Some(node) = catalog.node(&state.node) else {
        return NodeView::Missing {
            node: state.node.clone(),
        };
    };

    let text = node
        .text()
        .map(|t| render_text(t.resolve(&state.persona, &state.location), &state.stats))
        .unwrap_or_default();

    match node {
        Node::Narrative(_) => NodeView::Narrative {
            node: state.node.clone(),
            text,
        },
        Node::Decision(decision) => NodeView::Decision {
            node: state.node.clone(),
            text,
            options: decision
                .options
                .iter()
                .map(|o| OptionView {
                    id: o.id.clone(),
                    label: o.label.clone(),
                    locked: !o.is_available(state),
                })
                .collect(),
        },
        Node::Outcome(_) => NodeView::Outcome {
            node: state.node.clone(),
            text,
            outcome: state.outcome.clone(),
            description: state.outcome_description.clone(),
            literacy: state.literacy.clone(),
            skill: Stat::skill_for_location(&state.location)
                .map(|stat| reading(stat, state, catalog)),
        },
        Node::Router(_) | Node::RouterMulti(_) => NodeView::Stalled {
            node: state.node.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{
            "system": {
                "variables": {
                    "S": {"min": 0, "max": 10}, "R": {"min": 0, "max": 10},
                    "M": {"min": 0, "max": 10}, "SC": {"min": -3, "max": 3},
                    "HR": {"min": 0, "max": 4}
                },
                "skills": {
                    "SA": {"min": 0, "max": 5}, "FM": {"min": 0, "max": 5},
                    "LA": {"min": 0, "max": 5}
                },
                "initial_values": {"S": 4, "SC": 2, "SA": 1}
            },
            "personas": {"Student": {}},
            "locations": {"Coastal": {}},
            "nodes": {
                "N": {"type": "narrative", "text": "Safety {S}, social {SC}.",
                      "text_by_persona": {"Elder": "Elder text"}},
                "D": {"type": "decision", "text": "Choose", "options": [
                    {"id": "a", "label": "Open", "next": "N"},
                    {"id": "b", "label": "Gated", "requires_flag": "KEY", "next": "N"}
                ]},
                "END": {"type": "outcome", "text_by_location": {"Coastal": "Coast ending"}},
                "R": {"type": "router", "conditions": []}
            }
        }"#,
        )
        .unwrap()
    }

    fn state_at(c: &Catalog, node: &str) -> GameState {
        GameState::new(node, "Student", "Coastal", c.initial_stats())
    }

    #[test]
    fn render_replaces_placeholders_exactly() {
        let c = catalog();
        let state = state_at(&c, "N");
        assert_eq!(
            render_text("{S}/{SC}/{SA}/{XP}", &state.stats),
            "4/2/1/{XP}"
        );
    }

    #[test]
    fn narrative_view_interpolates() {
        let c = catalog();
        assert_eq!(
            view(&state_at(&c, "N"), &c),
            NodeView::Narrative {
                node: "N".to_string(),
                text: "Safety 4, social 2.".to_string(),
            }
        );
    }

    #[test]
    fn decision_view_marks_locked_options() {
        let c = catalog();
        let NodeView::Decision { options, .. } = view(&state_at(&c, "D"), &c) else {
            panic!("expected decision view");
        };
        assert!(!options[0].locked);
        assert!(options[1].locked);

        let mut state = state_at(&c, "D");
        state.add_flag("KEY");
        let NodeView::Decision { options, .. } = view(&state, &c) else {
            panic!("expected decision view");
        };
        assert!(!options[1].locked);
    }

    #[test]
    fn outcome_view_uses_location_text_and_skill() {
        let c = catalog();
        let NodeView::Outcome { text, skill, .. } = view(&state_at(&c, "END"), &c) else {
            panic!("expected outcome view");
        };
        assert_eq!(text, "Coast ending");
        let skill = skill.unwrap();
        assert_eq!(skill.stat, Stat::SA);
        assert_eq!((skill.value, skill.min, skill.max), (1, 0, 5));
    }

    #[test]
    fn missing_and_stalled_views() {
        let c = catalog();
        assert_eq!(
            view(&state_at(&c, "GONE"), &c),
            NodeView::Missing {
                node: "GONE".to_string()
            }
        );
        assert!(matches!(view(&state_at(&c, "R"), &c), NodeView::Stalled { .. }));
    }

    #[test]
    fn readings_cover_every_stat() {
        let c = catalog();
        let readings = stat_readings(&state_at(&c, "N"), &c);
        assert_eq!(readings.len(), 8);
        assert_eq!(readings[3].stat, Stat::SC);
        assert_eq!((readings[3].min, readings[3].max), (-3, 3));
    }
}
